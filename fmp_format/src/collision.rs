use std::result;

use crate::{
    binary_utils::index_u16,
    reader::Reader,
    record::{read_array, write_array, Record},
    writer::{Slot, Writer},
    Error, FormatVersion, Matrix, RecordType, Result,
};

/// `field_a`, `field_b` of a [`Havok`] entry holding a convex mesh.
///
/// Opaque values the physics engine expects, not derived from anything.
pub const HAVOK_CONVEX_FIELDS: [i32; 2] = [0, 1];
/// `field_a`, `field_b` of a [`Havok`] entry holding a concave mesh.
pub const HAVOK_CONCAVE_FIELDS: [i32; 2] = [4, 0];

/// A shared collider tree, referenced by objects through its list index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionGroup {
    pub name: String,
    pub colliders: Vec<Collider>,
    pub i_12: i32,
}

impl CollisionGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colliders: Vec::new(),
            i_12: 0,
        }
    }

    /// Number of colliders in the whole tree.
    #[must_use]
    pub fn collider_count(&self) -> usize {
        self.colliders.iter().map(Collider::count).sum()
    }

    /// Visits every collider in pre-order with its index, the first root being 0.
    pub fn visit<'a>(&'a self, mut f: impl FnMut(usize, &'a Collider)) {
        let mut index = 0;
        for collider in &self.colliders {
            collider.visit(&mut index, &mut f);
        }
    }
}

impl Record for CollisionGroup {
    const TYPE: RecordType = RecordType::CollisionGroup;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        16
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let count = cursor.count()?;
        let colliders_offset = cursor.offset()?;

        Ok(Self {
            name,
            colliders: read_array(reader, colliders_offset, count)?,
            i_12: cursor.i32()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_string(&self.name);
        writer.write_count(self.colliders.len());
        let slot = writer.placeholder();
        writer.write_i32(self.i_12);
        Ok(slot)
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.colliders)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collider {
    pub name: String,
    pub children: Vec<Collider>,
    pub havok: Vec<Havok>,
    pub i_20: i32,
}

impl Collider {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            havok: Vec::new(),
            i_20: 0,
        }
    }

    /// Number of colliders in this subtree, including itself.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Collider::count).sum::<usize>()
    }

    fn visit<'a>(&'a self, index: &mut usize, f: &mut impl FnMut(usize, &'a Collider)) {
        f(*index, self);
        *index += 1;
        for child in &self.children {
            child.visit(index, f);
        }
    }
}

pub(crate) struct ColliderSlots {
    children: Slot,
    havok: Slot,
}

impl Record for Collider {
    const TYPE: RecordType = RecordType::Collider;

    type Slots = ColliderSlots;

    fn size(_version: FormatVersion) -> usize {
        24
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let child_count = cursor.count()?;
        let children_offset = cursor.offset()?;
        let havok_count = cursor.count()?;
        let havok_offset = cursor.offset()?;

        Ok(Self {
            name,
            children: read_array(reader, children_offset, child_count)?,
            havok: read_array(reader, havok_offset, havok_count)?,
            i_20: cursor.i32()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<ColliderSlots> {
        writer.write_string(&self.name);
        writer.write_count(self.children.len());
        let children = writer.placeholder();
        writer.write_count(self.havok.len());
        let havok = writer.placeholder();
        writer.write_i32(self.i_20);
        Ok(ColliderSlots { children, havok })
    }

    fn write_children(&self, writer: &mut Writer, slots: ColliderSlots) -> Result<()> {
        write_array(writer, slots.children, &self.children)?;
        write_array(writer, slots.havok, &self.havok)
    }
}

/// One physics mesh blob of a collider.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Havok {
    /// Submeshes with equal mesh options share a group.
    pub group: i32,
    pub fragment_group: i32,
    pub field_a: i32,
    pub field_b: i32,
    pub data: Vec<u8>,
}

impl Record for Havok {
    const TYPE: RecordType = RecordType::Havok;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        24
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let group = cursor.i32()?;
        let fragment_group = cursor.i32()?;
        let field_a = cursor.i32()?;
        let field_b = cursor.i32()?;
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

        Ok(Self {
            group,
            fragment_group,
            field_a,
            field_b,
            data,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_i32(self.group);
        writer.write_i32(self.fragment_group);
        writer.write_i32(self.field_a);
        writer.write_i32(self.field_b);
        writer.write_count(self.data.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        if !self.data.is_empty() {
            writer.patch(slot);
            writer.write_bytes(&self.data);
            writer.align(4);
        }
        Ok(())
    }
}

/// A collision group placed by an object.
///
/// `instances` mirrors the group's collider tree: same child count and order at
/// every level.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionGroupInstance {
    pub collision_group_index: Option<u16>,
    pub i_02: u16,
    pub instances: Vec<ColliderInstance>,
}

/// A collider/instance tree shape difference.
#[derive(Debug, Clone, thiserror::Error, Hash, PartialEq, Eq)]
#[error("collider `{collider}` has {colliders} children but its instance has {instances}")]
pub struct InstanceMismatch {
    /// Name of the parent collider, or the group name at the top level.
    pub collider: String,
    pub colliders: usize,
    pub instances: usize,
}

impl CollisionGroupInstance {
    /// Checks that the instance tree has the shape of `group`'s collider tree.
    ///
    /// # Errors
    ///
    /// Returns the first level where child counts differ.
    pub fn check_matches(&self, group: &CollisionGroup) -> result::Result<(), InstanceMismatch> {
        check_level(&group.name, &group.colliders, &self.instances)
    }
}

fn check_level(
    name: &str,
    colliders: &[Collider],
    instances: &[ColliderInstance],
) -> result::Result<(), InstanceMismatch> {
    if colliders.len() != instances.len() {
        return Err(InstanceMismatch {
            collider: name.to_owned(),
            colliders: colliders.len(),
            instances: instances.len(),
        });
    }

    colliders
        .iter()
        .zip(instances)
        .try_for_each(|(collider, instance)| {
            check_level(&collider.name, &collider.children, &instance.children)
        })
}

impl Record for CollisionGroupInstance {
    const TYPE: RecordType = RecordType::CollisionGroupInstance;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let collision_group_index = index_u16(cursor.u16()?);
        let i_02 = cursor.u16()?;
        let count = cursor.count()?;
        let instances_offset = cursor.offset()?;

        Ok(Self {
            collision_group_index,
            i_02,
            instances: read_array(reader, instances_offset, count)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_index_u16(self.collision_group_index);
        writer.write_u16(self.i_02);
        writer.write_count(self.instances.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.instances)
    }
}

/// Placement of one collider for one object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColliderInstance {
    pub i_00: i32,
    pub parameters: Vec<HavokGroupParameters>,
    pub children: Vec<ColliderInstance>,
    pub f_20: f32,
    pub matrix: Matrix,
}

impl ColliderInstance {
    #[must_use]
    pub fn new(matrix: Matrix) -> Self {
        Self {
            i_00: 0,
            parameters: Vec::new(),
            children: Vec::new(),
            f_20: 0.0,
            matrix,
        }
    }
}

pub(crate) struct ColliderInstanceSlots {
    parameters: Slot,
    children: Slot,
}

impl Record for ColliderInstance {
    const TYPE: RecordType = RecordType::ColliderInstance;

    type Slots = ColliderInstanceSlots;

    fn size(_version: FormatVersion) -> usize {
        72
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let i_00 = cursor.i32()?;
        let parameter_count = cursor.count()?;
        let parameters_offset = cursor.offset()?;
        let child_count = cursor.count()?;
        let children_offset = cursor.offset()?;
        let f_20 = cursor.f32()?;
        let matrix = Matrix::read(&mut cursor)?;

        Ok(Self {
            i_00,
            parameters: read_array(reader, parameters_offset, parameter_count)?,
            children: read_array(reader, children_offset, child_count)?,
            f_20,
            matrix,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<ColliderInstanceSlots> {
        writer.write_i32(self.i_00);
        writer.write_count(self.parameters.len());
        let parameters = writer.placeholder();
        writer.write_count(self.children.len());
        let children = writer.placeholder();
        writer.write_f32(self.f_20);
        self.matrix.write(writer);
        Ok(ColliderInstanceSlots {
            parameters,
            children,
        })
    }

    fn write_children(&self, writer: &mut Writer, slots: ColliderInstanceSlots) -> Result<()> {
        write_array(writer, slots.parameters, &self.parameters)?;
        write_array(writer, slots.children, &self.children)
    }
}

/// Physics parameters of one havok group of a collider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HavokGroupParameters {
    pub group: i32,
    pub param1: i32,
    pub param2: i32,
    pub i_12: i32,
}

impl Record for HavokGroupParameters {
    const TYPE: RecordType = RecordType::HavokGroupParameters;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        16
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            group: cursor.i32()?,
            param1: cursor.i32()?,
            param2: cursor.i32()?,
            i_12: cursor.i32()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.group);
        writer.write_i32(self.param1);
        writer.write_i32(self.param2);
        writer.write_i32(self.i_12);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> CollisionGroup {
        let mut root = Collider::new("root");
        let mut model = Collider::new("model");
        model.children = vec![Collider::new("mesh_a"), Collider::new("mesh_b")];
        root.children = vec![model, Collider::new("empty")];

        CollisionGroup {
            name: "building".to_owned(),
            colliders: vec![root],
            i_12: 0,
        }
    }

    #[test]
    fn visits_in_pre_order() {
        let group = sample_group();
        let mut names = Vec::new();
        group.visit(|index, collider| names.push((index, collider.name.as_str())));

        assert_eq!(group.collider_count(), 5);
        assert_eq!(
            names,
            [
                (0, "root"),
                (1, "model"),
                (2, "mesh_a"),
                (3, "mesh_b"),
                (4, "empty")
            ]
        );
    }

    #[test]
    fn instance_shape_is_checked() {
        let group = sample_group();
        let leaf = ColliderInstance::new(Matrix::IDENTITY);
        let mut model = ColliderInstance::new(Matrix::IDENTITY);
        model.children = vec![leaf.clone(), leaf.clone()];
        let mut root = ColliderInstance::new(Matrix::IDENTITY);
        root.children = vec![model, leaf.clone()];

        let mut instance = CollisionGroupInstance {
            collision_group_index: Some(0),
            i_02: 0,
            instances: vec![root],
        };
        assert_eq!(instance.check_matches(&group), Ok(()));

        instance.instances[0].children[0].children.pop();
        assert_eq!(
            instance.check_matches(&group),
            Err(InstanceMismatch {
                collider: "model".to_owned(),
                colliders: 2,
                instances: 1,
            })
        );
    }
}
