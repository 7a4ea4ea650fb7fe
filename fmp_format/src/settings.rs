use tracing::debug;

use crate::{
    reader::Reader,
    record::{write_records, Record},
    writer::{Slot, Writer},
    Error, FormatVersion, RecordType, Result,
};

/// Number of item slots in [`SettingsB`].
pub const MAX_SETTINGS_ITEMS: usize = 51;

/// Camera and render distances, a fixed block right after the header.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsA {
    pub i_00: i32,
    pub i_04: i32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub camera_distance_min: f32,
    pub camera_distance_max: f32,
    pub render_distance: f32,
    pub shadow_distance: f32,
    pub lod_distances: [f32; 4],
    pub fog_start: f32,
    pub fog_end: f32,
    pub values: [f32; 21],
}

impl SettingsA {
    pub const SIZE: usize = 140;
}

impl Default for SettingsA {
    fn default() -> Self {
        Self {
            i_00: 0,
            i_04: 0,
            near_clip: 0.1,
            far_clip: 10000.0,
            camera_distance_min: 1.0,
            camera_distance_max: 100.0,
            render_distance: 1000.0,
            shadow_distance: 100.0,
            lod_distances: [50.0, 100.0, 200.0, 400.0],
            fog_start: 500.0,
            fog_end: 1000.0,
            values: [0.0; 21],
        }
    }
}

impl Record for SettingsA {
    const TYPE: RecordType = RecordType::SettingsA;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        Self::SIZE
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            i_00: cursor.i32()?,
            i_04: cursor.i32()?,
            near_clip: cursor.f32()?,
            far_clip: cursor.f32()?,
            camera_distance_min: cursor.f32()?,
            camera_distance_max: cursor.f32()?,
            render_distance: cursor.f32()?,
            shadow_distance: cursor.f32()?,
            lod_distances: cursor.f32s()?,
            fog_start: cursor.f32()?,
            fog_end: cursor.f32()?,
            values: cursor.f32s()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.i_00);
        writer.write_i32(self.i_04);
        writer.write_f32s(&[
            self.near_clip,
            self.far_clip,
            self.camera_distance_min,
            self.camera_distance_max,
            self.render_distance,
            self.shadow_distance,
        ]);
        writer.write_f32s(&self.lod_distances);
        writer.write_f32(self.fog_start);
        writer.write_f32(self.fog_end);
        writer.write_f32s(&self.values);
        Ok(())
    }
}

/// Second settings block: an opaque field plus a list of named values.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsB {
    pub u_00: u64,
    pub items: Vec<SettingsItem>,
}

impl SettingsB {
    pub const SIZE: usize = 216;

    pub(crate) fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, RecordType::SettingsB);
        let u_00 = cursor.u64()?;
        let count = cursor.count()?;
        if count > MAX_SETTINGS_ITEMS {
            return Err(Error::Corrupted {
                ty: RecordType::SettingsB,
                error: "too many settings items",
            });
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let item_offset = cursor.offset()?.ok_or(Error::Corrupted {
                ty: RecordType::SettingsB,
                error: "settings item slot is empty",
            })?;
            reader.check_range(item_offset, SettingsItem::SIZE, RecordType::SettingsItem)?;
            items.push(SettingsItem::read(reader, item_offset)?);
        }
        debug!("read {} settings items", items.len());

        Ok(Self { u_00, items })
    }

    /// Writes the fixed block, returning the slots of the used item offsets.
    pub(crate) fn write_fixed(&self, writer: &mut Writer) -> Result<Vec<Slot>> {
        if self.items.len() > MAX_SETTINGS_ITEMS {
            return Err(Error::TooManySettingsItems(self.items.len()));
        }

        let start = writer.position();
        writer.write_u64(self.u_00);
        writer.write_count(self.items.len());
        let mut slots: Vec<_> = (0..MAX_SETTINGS_ITEMS)
            .map(|_| writer.placeholder())
            .collect();
        // unused slots stay zero
        slots.truncate(self.items.len());
        writer.check_size(start, Self::SIZE, RecordType::SettingsB)?;
        Ok(slots)
    }

    pub(crate) fn write_items(&self, writer: &mut Writer, slots: Vec<Slot>) -> Result<()> {
        for (item, slot) in self.items.iter().zip(slots) {
            writer.patch(slot);
            write_records(writer, std::slice::from_ref(item))?;
        }
        Ok(())
    }
}

/// A named setting. The value is kept raw, `value_type` says how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SettingsItem {
    pub name: String,
    pub value_type: i32,
    pub value: u64,
}

impl SettingsItem {
    pub const SIZE: usize = 16;
}

impl Record for SettingsItem {
    const TYPE: RecordType = RecordType::SettingsItem;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        Self::SIZE
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            name: reader.string(cursor.offset()?)?,
            value_type: cursor.i32()?,
            value: cursor.u64()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name);
        writer.write_i32(self.value_type);
        writer.write_u64(self.value);
        Ok(())
    }
}
