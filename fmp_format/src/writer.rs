use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;
use zerocopy::AsBytes;

use crate::{
    header::{
        Header, I32Le, Section, Table, COLLISION_GROUP_OFFSET_SLOT, HEADER_SIZE,
        SETTINGS_A_OFFSET, SETTINGS_B_OFFSET, SIGNATURE,
    },
    record::{write_array, write_records},
    settings::{SettingsA, SettingsB},
    DepotKind, DepotStringTable, Error, FmpDocument, FormatVersion, RecordType, Result,
    StringPatchList,
};

/// Position of a 4 byte forward offset that will be filled in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(usize);

impl Slot {
    pub(crate) fn at(position: usize) -> Self {
        Self(position)
    }
}

/// Growable byte arena with back-patching.
#[derive(Debug)]
pub(crate) struct Writer {
    buf: Vec<u8>,
    strings: StringPatchList,
    depots: DepotStringTable,
    version: FormatVersion,
    // (slot, target) of every structural offset, for layout checks
    patches: Vec<(usize, usize)>,
}

impl Writer {
    pub(crate) fn new(version: FormatVersion) -> Self {
        Self {
            buf: Vec::new(),
            strings: StringPatchList::new(),
            depots: DepotStringTable::new(),
            version,
            patches: Vec::new(),
        }
    }

    pub(crate) fn version(&self) -> FormatVersion {
        self.version
    }

    pub(crate) fn position(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn write_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub(crate) fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub(crate) fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub(crate) fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub(crate) fn write_f32s(&mut self, values: &[f32]) {
        for &value in values {
            self.write_f32(value);
        }
    }

    /// Writes a count field, which is an i32 on disk.
    pub(crate) fn write_count(&mut self, count: usize) {
        self.write_i32(count as i32);
    }

    pub(crate) fn write_index_u16(&mut self, index: Option<u16>) {
        self.write_u16(index.unwrap_or(u16::MAX));
    }

    pub(crate) fn align(&mut self, alignment: usize) {
        let padding = (alignment - self.buf.len() % alignment) % alignment;
        self.write_zeros(padding);
    }

    /// Reserves a zeroed offset field.
    pub(crate) fn placeholder(&mut self) -> Slot {
        let slot = Slot(self.position());
        self.write_i32(0);
        slot
    }

    /// Points `slot` at the current position.
    pub(crate) fn patch(&mut self, slot: Slot) {
        let position = self.position();
        self.patches.push((slot.0, position));
        self.patch_value(slot, position as i32);
    }

    pub(crate) fn patch_value(&mut self, slot: Slot, value: i32) {
        LittleEndian::write_i32(&mut self.buf[slot.0..slot.0 + 4], value);
    }

    /// Writes a string offset placeholder, resolved once the pool is appended.
    pub(crate) fn write_string(&mut self, text: &str) {
        let slot = self.placeholder();
        self.strings.push(slot.0, text);
    }

    pub(crate) fn depot_index(&mut self, kind: DepotKind, path: Option<&str>) -> i32 {
        match path {
            Some(path) => self.depots.insert(kind, path),
            None => -1,
        }
    }

    pub(crate) fn check_size(&self, start: usize, expected: usize, ty: RecordType) -> Result<()> {
        let actual = self.position() - start;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::SizeMismatch {
                ty,
                expected,
                actual,
            })
        }
    }

    fn finish(mut self) -> (Vec<u8>, Vec<(usize, usize)>) {
        debug!(
            "appending string pool at {:#x} for {} slots",
            self.buf.len(),
            self.strings.len()
        );
        self.strings.resolve(&mut self.buf);
        (self.buf, self.patches)
    }
}

impl FmpDocument {
    /// Serializes the document.
    ///
    /// Output is deterministic for a given document but not necessarily
    /// byte-identical to the file it was read from.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the document can't be represented, for example when it has
    /// more settings items than fit into settings b, or if a record is
    /// internally inconsistent.
    pub fn write(&self) -> Result<Vec<u8>> {
        self.write_traced().map(|(bytes, _)| bytes)
    }

    /// Like [`FmpDocument::write`], also returning `(slot, target)` for every
    /// structural offset written.
    pub(crate) fn write_traced(&self) -> Result<(Vec<u8>, Vec<(usize, usize)>)> {
        let mut writer = Writer::new(self.format_version());

        let mut header = Header {
            signature: SIGNATURE,
            version: I32Le::new(self.version),
            i_08: I32Le::new(self.i_08),
            i_12: I32Le::new(self.i_12),
            settings_a_offset: I32Le::new(SETTINGS_A_OFFSET as i32),
            settings_b_offset: I32Le::new(SETTINGS_B_OFFSET as i32),
            tables: [Table::new(0); 9],
            collision_groups: Table::new(self.collision_groups.len()),
            header_ints: self.header_ints.map(I32Le::new),
        };
        header.tables[Section::Section1 as usize] = Table::new(self.section1.len());
        header.tables[Section::Section2 as usize] = Table::new(self.section2.len());
        header.tables[Section::FragmentGroups as usize] = Table::new(self.fragment_groups.len());
        header.tables[Section::Objects as usize] = Table::new(self.objects.len());
        header.tables[Section::HitboxGroups as usize] = Table::new(self.hitbox_groups.len());

        writer.write_bytes(header.as_bytes());
        writer.check_size(0, HEADER_SIZE, RecordType::Header)?;

        write_records(&mut writer, std::slice::from_ref(&self.settings_a))?;
        let settings_b_slots = self.settings_b.write_fixed(&mut writer)?;
        writer.check_size(
            SETTINGS_A_OFFSET,
            SettingsA::SIZE + SettingsB::SIZE,
            RecordType::SettingsB,
        )?;
        self.settings_b.write_items(&mut writer, settings_b_slots)?;

        debug!("writing section 1 at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(Section::Section1.offset_slot()),
            &self.section1,
        )?;
        debug!("writing section 2 at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(Section::Section2.offset_slot()),
            &self.section2,
        )?;
        debug!("writing fragment groups at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(Section::FragmentGroups.offset_slot()),
            &self.fragment_groups,
        )?;

        for object in &self.objects {
            object.check_virtual_sub_parts(&self.hitbox_groups)?;
        }
        debug!("writing objects at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(Section::Objects.offset_slot()),
            &self.objects,
        )?;
        debug!("writing hitbox groups at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(Section::HitboxGroups.offset_slot()),
            &self.hitbox_groups,
        )?;

        // depots are complete now, every lod has been written
        let depots = std::mem::take(&mut writer.depots);
        for (kind, section) in DepotKind::ALL.into_iter().zip(Section::DEPOTS) {
            let paths = depots.paths(kind);
            let count_slot = Slot::at(section.offset_slot() - 4);
            writer.patch_value(count_slot, paths.len() as i32);

            if paths.is_empty() {
                continue;
            }

            debug!("writing {} depot at {:#x}", kind, writer.position());
            writer.patch(Slot::at(section.offset_slot()));
            for path in paths {
                writer.write_string(path);
            }
        }

        debug!("writing collision groups at {:#x}", writer.position());
        write_array(
            &mut writer,
            Slot::at(COLLISION_GROUP_OFFSET_SLOT),
            &self.collision_groups,
        )?;

        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_patched_forward() {
        let mut writer = Writer::new(FormatVersion::New);
        let slot = writer.placeholder();
        writer.write_u16(7);
        writer.align(4);
        assert_eq!(writer.position(), 8);

        writer.patch(slot);
        writer.write_string("name");
        let (bytes, patches) = writer.finish();

        assert_eq!(patches, [(0, 8)]);
        assert_eq!(LittleEndian::read_i32(&bytes[0..4]), 8);
        assert_eq!(LittleEndian::read_i32(&bytes[8..12]), 12);
        assert_eq!(&bytes[12..], b"name\0");
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut writer = Writer::new(FormatVersion::Old);
        writer.write_i32(1);

        assert_eq!(
            writer.check_size(0, 8, RecordType::IndexPair),
            Err(Error::SizeMismatch {
                ty: RecordType::IndexPair,
                expected: 8,
                actual: 4
            })
        );
    }
}
