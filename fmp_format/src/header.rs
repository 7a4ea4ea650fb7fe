use byteorder::LittleEndian;
use zerocopy::{byteorder::I32, AsBytes, FromBytes, Unaligned};

use crate::{binary_utils::parse, Error, FormatVersion, RecordType, Result};

pub const SIGNATURE: [u8; 4] = *b"#FMP";

pub const HEADER_SIZE: usize = 112;
pub const SETTINGS_A_OFFSET: usize = 112;
pub const SETTINGS_B_OFFSET: usize = 252;

pub type I32Le = I32<LittleEndian>;

#[derive(Debug, Clone, Copy, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct Table {
    pub count: I32Le,
    pub offset: I32Le,
}

impl Table {
    pub fn new(count: usize) -> Self {
        Self {
            count: I32Le::new(count as i32),
            offset: I32Le::new(0),
        }
    }

    pub fn count(&self) -> i32 {
        self.count.get()
    }

    pub fn offset(&self) -> i32 {
        self.offset.get()
    }
}

/// Sections located through the header, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Section1 = 0,
    Section2 = 1,
    FragmentGroups = 2,
    Objects = 3,
    HitboxGroups = 4,
    Depot1 = 5,
    Depot2 = 6,
    Depot3 = 7,
    Depot4 = 8,
}

impl Section {
    pub const DEPOTS: [Section; 4] = [
        Section::Depot1,
        Section::Depot2,
        Section::Depot3,
        Section::Depot4,
    ];

    /// Position of the section's offset field inside the header.
    pub fn offset_slot(self) -> usize {
        24 + 8 * self as usize + 4
    }
}

/// Position of the collision group table's offset field inside the header.
pub const COLLISION_GROUP_OFFSET_SLOT: usize = 100;

#[derive(Debug, Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
pub struct Header {
    pub signature: [u8; 4],
    pub version: I32Le,
    pub i_08: I32Le,
    pub i_12: I32Le,
    pub settings_a_offset: I32Le,
    pub settings_b_offset: I32Le,
    pub tables: [Table; 9],
    pub collision_groups: Table,
    pub header_ints: [I32Le; 2],
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<&Self> {
        let signature = bytes.get(..4).unwrap_or(bytes);
        if signature != SIGNATURE {
            return Err(Error::InvalidSignature {
                signature: String::from_utf8_lossy(signature).into_owned(),
            });
        }

        parse(bytes, 0).ok_or(Error::OutOfBounds {
            ty: RecordType::Header,
            offset: 0,
        })
    }

    pub fn version(&self) -> FormatVersion {
        FormatVersion::from_version(self.version.get())
    }

    pub fn table(&self, section: Section) -> &Table {
        &self.tables[section as usize]
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(size_of::<Header>(), HEADER_SIZE);
        assert_eq!(Section::Section1.offset_slot(), 28);
        assert_eq!(Section::Depot4.offset_slot(), 92);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = vec![0; HEADER_SIZE];
        bytes[..4].copy_from_slice(b"#EMD");

        assert_eq!(
            Header::parse(&bytes).unwrap_err(),
            Error::InvalidSignature {
                signature: "#EMD".to_owned()
            }
        );
    }

    #[test]
    fn rejects_truncated_header() {
        let mut bytes = vec![0; 40];
        bytes[..4].copy_from_slice(&SIGNATURE);

        assert!(matches!(
            Header::parse(&bytes),
            Err(Error::OutOfBounds {
                ty: RecordType::Header,
                ..
            })
        ));
    }
}
