use crate::{
    reader::Reader,
    record::Record,
    writer::{Slot, Writer},
    Error, FormatVersion, RecordType, Result,
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section1 {
    pub name: String,
    pub values: [f32; 5],
}

impl Record for Section1 {
    const TYPE: RecordType = RecordType::Section1;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        24
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            name: reader.string(cursor.offset()?)?,
            values: cursor.f32s()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name);
        writer.write_f32s(&self.values);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section2 {
    pub name: String,
    pub i_04: i32,
    pub values: [f32; 5],
}

impl Record for Section2 {
    const TYPE: RecordType = RecordType::Section2;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        28
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            name: reader.string(cursor.offset()?)?,
            i_04: cursor.i32()?,
            values: cursor.f32s()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name);
        writer.write_i32(self.i_04);
        writer.write_f32s(&self.values);
        Ok(())
    }
}

/// A named set of object indices marking destructible fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FragmentGroup {
    pub name: String,
    pub object_indices: Vec<u16>,
}

impl Record for FragmentGroup {
    const TYPE: RecordType = RecordType::FragmentGroup;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let count = cursor.count()?;
        let indices_offset = cursor.offset()?;

        Ok(Self {
            name,
            object_indices: read_u16s(reader, indices_offset, count, Self::TYPE)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_string(&self.name);
        writer.write_count(self.object_indices.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_u16s(writer, slot, &self.object_indices);
        Ok(())
    }
}

/// Reads a plain `u16` array, shared by fragment groups and hierarchy leaves.
pub(crate) fn read_u16s(
    reader: &Reader,
    offset: Option<usize>,
    count: usize,
    ty: RecordType,
) -> Result<Vec<u16>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let offset = offset.ok_or(Error::Corrupted {
        ty,
        error: "index list has elements but no offset",
    })?;
    let mut cursor = reader.cursor(offset, ty);
    (0..count).map(|_| cursor.u16()).collect()
}

/// Writes a `u16` array padded to 4 bytes, leaving `slot` 0 if it's empty.
pub(crate) fn write_u16s(writer: &mut Writer, slot: Slot, values: &[u16]) {
    if values.is_empty() {
        return;
    }

    writer.patch(slot);
    for &value in values {
        writer.write_u16(value);
    }
    writer.align(4);
}
