use itertools::Itertools;
use tracing::debug;

use crate::{
    binary_utils::index_u16,
    reader::Reader,
    record::{read_array, read_optional, write_array, write_optional, Record},
    section::{read_u16s, write_u16s},
    writer::{Slot, Writer},
    Error, FormatVersion, RecordType, Result,
};

/// A named tree of hitboxes, encoded as a flat array with index links.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitboxGroup {
    pub name: String,
    pub hitboxes: Vec<Hitbox>,
}

impl HitboxGroup {
    fn check_links(&self) -> Result<()> {
        let len = self.hitboxes.len();
        let in_range = |index: Option<u16>| index.map_or(true, |index| usize::from(index) < len);

        if self
            .hitboxes
            .iter()
            .all(|hitbox| in_range(hitbox.child) && in_range(hitbox.sibling) && in_range(hitbox.parent))
        {
            Ok(())
        } else {
            Err(Error::Corrupted {
                ty: RecordType::HitboxGroup,
                error: "hitbox link out of range",
            })
        }
    }

    /// Indices of the direct children of the hitbox at `index`, following the sibling chain.
    #[must_use]
    pub fn children(&self, index: usize) -> Vec<usize> {
        let mut children = Vec::new();
        let mut next = self
            .hitboxes
            .get(index)
            .and_then(|hitbox| hitbox.child)
            .map(usize::from);

        while let Some(current) = next {
            // a malformed chain could loop
            if children.contains(&current) || children.len() > self.hitboxes.len() {
                break;
            }
            children.push(current);
            next = self
                .hitboxes
                .get(current)
                .and_then(|hitbox| hitbox.sibling)
                .map(usize::from);
        }

        children
    }
}

impl Record for HitboxGroup {
    const TYPE: RecordType = RecordType::HitboxGroup;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let count = cursor.count()?;
        let hitboxes_offset = cursor.offset()?;

        let group = Self {
            name,
            hitboxes: read_array(reader, hitboxes_offset, count)?,
        };
        group.check_links()?;
        Ok(group)
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        self.check_links()?;
        writer.write_string(&self.name);
        writer.write_count(self.hitboxes.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.hitboxes)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hitbox {
    pub name: String,
    pub child: Option<u16>,
    pub i_06: u16,
    pub sibling: Option<u16>,
    pub parent: Option<u16>,
    pub destructions: Vec<Destruction>,
    pub vertices: Vec<[f32; 3]>,
    pub face_indices: Vec<u16>,
    /// Embedded physics blob, only representable in the new format.
    pub havok: Option<Vec<u8>>,
}

impl Hitbox {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            child: None,
            i_06: 0,
            sibling: None,
            parent: None,
            destructions: Vec::new(),
            vertices: Vec::new(),
            face_indices: Vec::new(),
            havok: None,
        }
    }

    /// Destructions grouped by key, keys ascending, input order kept inside a group.
    fn destruction_lists(&self) -> Vec<DestructionList> {
        self.destructions
            .iter()
            .sorted_by_key(|destruction| destruction.group)
            .group_by(|destruction| destruction.group)
            .into_iter()
            .map(|(group, destructions)| DestructionList {
                group,
                sub_parts: destructions.map(|d| d.sub_part.clone()).collect(),
            })
            .collect()
    }
}

pub(crate) struct HitboxSlots {
    lists: Vec<DestructionList>,
    destructions: Slot,
    vertices: Slot,
    faces: Slot,
    havok: Option<Slot>,
}

impl Record for Hitbox {
    const TYPE: RecordType = RecordType::Hitbox;

    type Slots = HitboxSlots;

    fn size(version: FormatVersion) -> usize {
        match version {
            FormatVersion::Old => 36,
            FormatVersion::New => 40,
        }
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let child = index_u16(cursor.u16()?);
        let i_06 = cursor.u16()?;
        let sibling = index_u16(cursor.u16()?);
        let parent = index_u16(cursor.u16()?);
        let list_count = cursor.count()?;
        let lists_offset = cursor.offset()?;
        let vertex_count = cursor.count()?;
        let vertices_offset = cursor.offset()?;
        let face_count = cursor.count()?;
        let faces_offset = cursor.offset()?;
        let havok_offset = match reader.version() {
            FormatVersion::Old => None,
            FormatVersion::New => cursor.offset()?,
        };

        let lists: Vec<DestructionList> = read_array(reader, lists_offset, list_count)?;
        if lists.iter().any(|list| list.sub_parts.is_empty()) {
            debug!("hitbox `{}`: dropping empty destruction lists", name);
        }
        // same order the writer forms lists in
        let destructions = lists
            .into_iter()
            .flat_map(|list| {
                let group = list.group;
                list.sub_parts
                    .into_iter()
                    .map(move |sub_part| Destruction { group, sub_part })
            })
            .sorted_by_key(|destruction| destruction.group)
            .collect();

        let vertices = match vertices_offset {
            Some(vertices_offset) if vertex_count > 0 => {
                reader.check_range(vertices_offset, vertex_count.saturating_mul(12), Self::TYPE)?;
                let mut cursor = reader.cursor(vertices_offset, Self::TYPE);
                (0..vertex_count)
                    .map(|_| cursor.f32s())
                    .collect::<Result<_>>()?
            }
            None if vertex_count > 0 => {
                return Err(Error::Corrupted {
                    ty: Self::TYPE,
                    error: "vertices without an offset",
                })
            }
            _ => Vec::new(),
        };

        let havok: Option<HavokData> = read_optional(reader, havok_offset)?;

        Ok(Self {
            name,
            child,
            i_06,
            sibling,
            parent,
            destructions,
            vertices,
            face_indices: read_u16s(reader, faces_offset, face_count, Self::TYPE)?,
            havok: havok.map(|havok| havok.0),
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<HitboxSlots> {
        writer.write_string(&self.name);
        writer.write_index_u16(self.child);
        writer.write_u16(self.i_06);
        writer.write_index_u16(self.sibling);
        writer.write_index_u16(self.parent);

        let lists = self.destruction_lists();
        writer.write_count(lists.len());
        let destructions = writer.placeholder();
        writer.write_count(self.vertices.len());
        let vertices = writer.placeholder();
        writer.write_count(self.face_indices.len());
        let faces = writer.placeholder();

        let havok = match writer.version() {
            FormatVersion::New => Some(writer.placeholder()),
            FormatVersion::Old if self.havok.is_some() => {
                return Err(Error::Unsupported {
                    ty: Self::TYPE,
                    feature: "embedded havok data in the old format",
                })
            }
            FormatVersion::Old => None,
        };

        Ok(HitboxSlots {
            lists,
            destructions,
            vertices,
            faces,
            havok,
        })
    }

    fn write_children(&self, writer: &mut Writer, slots: HitboxSlots) -> Result<()> {
        write_array(writer, slots.destructions, &slots.lists)?;

        if !self.vertices.is_empty() {
            writer.patch(slots.vertices);
            for vertex in &self.vertices {
                writer.write_f32s(vertex);
            }
        }

        write_u16s(writer, slots.faces, &self.face_indices);

        if let Some(slot) = slots.havok {
            let havok = self.havok.clone().map(HavokData);
            write_optional(writer, slot, havok.as_ref())?;
        }
        Ok(())
    }
}

/// One destruction entry, lists on disk are formed by `group`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destruction {
    pub group: i32,
    pub sub_part: DestructionSubPart,
}

struct DestructionList {
    group: i32,
    sub_parts: Vec<DestructionSubPart>,
}

impl Record for DestructionList {
    const TYPE: RecordType = RecordType::DestructionList;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let group = cursor.i32()?;
        let count = cursor.count()?;
        let sub_parts_offset = cursor.offset()?;

        Ok(Self {
            group,
            sub_parts: read_array(reader, sub_parts_offset, count)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_i32(self.group);
        writer.write_count(self.sub_parts.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.sub_parts)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DestructionSubPart {
    pub ints: [i32; 4],
    pub values: [f32; 10],
}

impl Record for DestructionSubPart {
    const TYPE: RecordType = RecordType::DestructionSubPart;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        56
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            ints: [cursor.i32()?, cursor.i32()?, cursor.i32()?, cursor.i32()?],
            values: cursor.f32s()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        for &value in &self.ints {
            writer.write_i32(value);
        }
        writer.write_f32s(&self.values);
        Ok(())
    }
}

/// Size and offset of a raw blob.
struct HavokData(Vec<u8>);

impl Record for HavokData {
    const TYPE: RecordType = RecordType::HavokData;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        8
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let size = cursor.count()?;
        let data = match cursor.offset()? {
            Some(data_offset) => reader.cursor(data_offset, Self::TYPE).bytes(size)?.to_vec(),
            None if size == 0 => Vec::new(),
            None => {
                return Err(Error::Corrupted {
                    ty: Self::TYPE,
                    error: "data without an offset",
                })
            }
        };
        Ok(Self(data))
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_count(self.0.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        if !self.0.is_empty() {
            writer.patch(slot);
            writer.write_bytes(&self.0);
            writer.align(4);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destruction(group: i32, marker: i32) -> Destruction {
        Destruction {
            group,
            sub_part: DestructionSubPart {
                ints: [marker, 0, 0, 0],
                values: [0.0; 10],
            },
        }
    }

    #[test]
    fn destructions_are_grouped_and_sorted() {
        let mut hitbox = Hitbox::new("door");
        hitbox.destructions = vec![
            destruction(2, 0),
            destruction(1, 1),
            destruction(2, 2),
            destruction(1, 3),
        ];

        let lists = hitbox.destruction_lists();
        let layout: Vec<(i32, Vec<i32>)> = lists
            .iter()
            .map(|list| {
                (
                    list.group,
                    list.sub_parts.iter().map(|sub_part| sub_part.ints[0]).collect(),
                )
            })
            .collect();

        assert_eq!(layout, [(1, vec![1, 3]), (2, vec![0, 2])]);
    }

    #[test]
    fn children_follow_sibling_chain() {
        let mut root = Hitbox::new("root");
        root.child = Some(1);
        let mut first = Hitbox::new("first");
        first.parent = Some(0);
        first.sibling = Some(2);
        let mut second = Hitbox::new("second");
        second.parent = Some(0);

        let group = HitboxGroup {
            name: "group".to_owned(),
            hitboxes: vec![root, first, second],
        };

        assert_eq!(group.children(0), [1, 2]);
        assert!(group.children(2).is_empty());
        assert!(group.check_links().is_ok());
    }
}
