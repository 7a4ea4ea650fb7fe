use std::slice;

use crate::{
    reader::Reader,
    writer::{Slot, Writer},
    Error, FormatVersion, RecordType, Result,
};

/// A fixed-size record, optionally owning variable-length data behind offsets.
///
/// Writing is split in two: [`Record::write_record`] emits the fixed part with
/// placeholder slots, [`Record::write_children`] emits the referenced data afterwards
/// and patches the slots, so every offset points forward.
pub(crate) trait Record: Sized {
    const TYPE: RecordType;

    type Slots;

    fn size(version: FormatVersion) -> usize;

    fn read(reader: &Reader, offset: usize) -> Result<Self>;

    fn write_record(&self, writer: &mut Writer) -> Result<Self::Slots>;

    fn write_children(&self, writer: &mut Writer, slots: Self::Slots) -> Result<()> {
        let _ = (writer, slots);
        Ok(())
    }
}

pub(crate) fn read_array<T: Record>(
    reader: &Reader,
    offset: Option<usize>,
    count: usize,
) -> Result<Vec<T>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let offset = offset.ok_or(Error::Corrupted {
        ty: T::TYPE,
        error: "array has elements but no offset",
    })?;
    let size = T::size(reader.version());
    let len = count.checked_mul(size).ok_or(Error::Corrupted {
        ty: T::TYPE,
        error: "array length overflows",
    })?;
    reader.check_range(offset, len, T::TYPE)?;

    (0..count).map(|i| T::read(reader, offset + i * size)).collect()
}

pub(crate) fn read_optional<T: Record>(reader: &Reader, offset: Option<usize>) -> Result<Option<T>> {
    offset
        .map(|offset| {
            reader.check_range(offset, T::size(reader.version()), T::TYPE)?;
            T::read(reader, offset)
        })
        .transpose()
}

/// Emits `items` as a contiguous array and points `slot` at it.
/// An empty array leaves the slot 0.
pub(crate) fn write_array<T: Record>(writer: &mut Writer, slot: Slot, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }

    writer.patch(slot);
    write_records(writer, items)
}

pub(crate) fn write_optional<T: Record>(
    writer: &mut Writer,
    slot: Slot,
    item: Option<&T>,
) -> Result<()> {
    match item {
        Some(item) => write_array(writer, slot, slice::from_ref(item)),
        None => Ok(()),
    }
}

/// Emits `items` at the current position without patching anything.
pub(crate) fn write_records<T: Record>(writer: &mut Writer, items: &[T]) -> Result<()> {
    let size = T::size(writer.version());

    let mut all_slots = Vec::with_capacity(items.len());
    for item in items {
        let start = writer.position();
        all_slots.push(item.write_record(writer)?);
        writer.check_size(start, size, T::TYPE)?;
    }

    for (item, slots) in items.iter().zip(all_slots) {
        item.write_children(writer, slots)?;
    }

    Ok(())
}
