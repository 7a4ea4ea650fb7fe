use std::str;

use byteorder::{ByteOrder, LittleEndian};
use zerocopy::{FromBytes, LayoutVerified};

use crate::{Error, RecordType, Result};

pub fn null_terminated_prefix(bytes: &[u8]) -> Option<&[u8]> {
    if bytes.is_empty() {
        return None;
    }
    bytes.splitn(2, |&b| b == 0).next()
}

pub fn parse<T: FromBytes>(bytes: &[u8], offset: usize) -> Option<&T> {
    bytes
        .get(offset..)
        .and_then(LayoutVerified::<_, T>::new_from_prefix)
        .map(|(res, _)| res.into_ref())
}

/// Reads the NUL-terminated string starting at `offset`.
pub fn read_string(bytes: &[u8], offset: usize) -> Result<String> {
    let prefix = bytes
        .get(offset..)
        .and_then(null_terminated_prefix)
        .ok_or(Error::OutOfBounds {
            ty: RecordType::String,
            offset,
        })?;

    str::from_utf8(prefix)
        .map(ToOwned::to_owned)
        .map_err(|_| Error::Corrupted {
            ty: RecordType::String,
            error: "string is not valid utf-8",
        })
}

/// Interprets a stored offset field: 0 means absent, negative values are corrupt.
pub fn optional_offset(value: i32, ty: RecordType) -> Result<Option<usize>> {
    match value {
        0 => Ok(None),
        v if v < 0 => Err(Error::Corrupted {
            ty,
            error: "negative offset",
        }),
        // non-negative, checked above
        v => Ok(Some(v as usize)),
    }
}

pub fn count(value: i32, ty: RecordType) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Corrupted {
        ty,
        error: "negative count",
    })
}

pub fn index_u16(value: u16) -> Option<u16> {
    if value == u16::MAX {
        None
    } else {
        Some(value)
    }
}

/// Forward-only reader over a byte buffer. Its only state is the position.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    ty: RecordType,
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8], pos: usize, ty: RecordType) -> Self {
        Self { bytes, pos, ty }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self
            .pos
            .checked_add(n)
            .and_then(|end| self.bytes.get(self.pos..end))
            .ok_or(Error::OutOfBounds {
                ty: self.ty,
                offset: self.pos,
            })?;
        self.pos += n;
        Ok(slice)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.take(4).map(LittleEndian::read_i32)
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.take(8).map(LittleEndian::read_u64)
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.take(4).map(LittleEndian::read_f32)
    }

    pub fn f32s<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut values = [0.0; N];
        LittleEndian::read_f32_into(self.take(4 * N)?, &mut values);
        Ok(values)
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn offset(&mut self) -> Result<Option<usize>> {
        let value = self.i32()?;
        optional_offset(value, self.ty)
    }

    pub fn count(&mut self) -> Result<usize> {
        let value = self.i32()?;
        count(value, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_little_endian() {
        let bytes = [
            0x01, 0x00, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0x3f, 0x07, 0x00,
        ];
        let mut cursor = ByteCursor::new(&bytes, 0, RecordType::Header);

        assert_eq!(cursor.u16().unwrap(), 1);
        assert_eq!(cursor.i32().unwrap(), -1);
        assert_eq!(cursor.f32().unwrap(), 1.0);
        assert_eq!(cursor.position(), 10);
        assert_eq!(cursor.u16().unwrap(), 7);
        assert_eq!(
            cursor.u16(),
            Err(Error::OutOfBounds {
                ty: RecordType::Header,
                offset: 12
            })
        );
    }

    #[test]
    fn strings_stop_at_nul() {
        let bytes = b"\0first\0second";
        assert_eq!(read_string(bytes, 1).unwrap(), "first");
        assert_eq!(read_string(bytes, 7).unwrap(), "second");
        assert!(read_string(bytes, 64).is_err());
    }

    #[test]
    fn offsets_and_indices() {
        assert_eq!(optional_offset(0, RecordType::Object), Ok(None));
        assert_eq!(optional_offset(12, RecordType::Object), Ok(Some(12)));
        assert!(optional_offset(-4, RecordType::Object).is_err());
        assert_eq!(index_u16(0xFFFF), None);
        assert_eq!(index_u16(3), Some(3));
    }
}
