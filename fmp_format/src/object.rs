use crate::{
    binary_utils::index_u16,
    reader::Reader,
    record::{read_array, read_optional, write_array, write_optional, Record},
    writer::{Slot, Writer},
    CollisionGroupInstance, DepotKind, Error, FormatVersion, Hierarchy, HitboxGroup, Matrix,
    RecordType, Result,
};

/// A placed object, the main record of a map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Object {
    pub name: String,
    pub flags_a: u16,
    pub hitbox_group_index: Option<u16>,
    pub flags_b: i32,
    pub matrix: Matrix,
    pub entities: Vec<Entity>,
    pub action: Option<Action>,
    /// One per hitbox of the referenced hitbox group, or empty.
    pub virtual_sub_parts: Vec<VirtualSubPart>,
    pub hierarchy: Option<Hierarchy>,
    pub collision_instance: Option<CollisionGroupInstance>,
}

impl Object {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags_a: 0,
            hitbox_group_index: None,
            flags_b: 0,
            matrix: Matrix::IDENTITY,
            entities: Vec::new(),
            action: None,
            virtual_sub_parts: Vec::new(),
            hierarchy: None,
            collision_instance: None,
        }
    }

    /// Virtual sub parts are stored without a count, so they have to line up with
    /// the hitboxes of the referenced group.
    pub(crate) fn check_virtual_sub_parts(&self, hitbox_groups: &[HitboxGroup]) -> Result<()> {
        if self.virtual_sub_parts.is_empty() {
            return Ok(());
        }

        let expected = self
            .hitbox_group_index
            .and_then(|index| hitbox_groups.get(usize::from(index)))
            .map(|group| group.hitboxes.len());

        if expected == Some(self.virtual_sub_parts.len()) {
            Ok(())
        } else {
            Err(Error::Corrupted {
                ty: RecordType::Object,
                error: "virtual sub part count doesn't match the hitbox group",
            })
        }
    }
}

pub(crate) struct ObjectSlots {
    entities: Slot,
    action: Slot,
    virtual_sub_parts: Slot,
    hierarchy: Slot,
    collision_instance: Slot,
}

impl Record for Object {
    const TYPE: RecordType = RecordType::Object;

    type Slots = ObjectSlots;

    fn size(_version: FormatVersion) -> usize {
        84
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let flags_a = cursor.u16()?;
        let hitbox_group_index = index_u16(cursor.u16()?);
        let flags_b = cursor.i32()?;
        let entity_count = cursor.count()?;
        let entity_offset = cursor.offset()?;
        let action_offset = cursor.offset()?;
        let virtual_sub_part_offset = cursor.offset()?;
        let hierarchy_offset = cursor.offset()?;
        let collision_instance_offset = cursor.offset()?;
        let matrix = Matrix::read(&mut cursor)?;

        let virtual_sub_parts = match (virtual_sub_part_offset, hitbox_group_index) {
            (None, _) => Vec::new(),
            (Some(_), None) => {
                return Err(Error::Corrupted {
                    ty: Self::TYPE,
                    error: "virtual sub parts without a hitbox group",
                })
            }
            (Some(_), Some(index)) => {
                read_array(reader, virtual_sub_part_offset, reader.hitbox_count(index)?)?
            }
        };

        Ok(Self {
            name,
            flags_a,
            hitbox_group_index,
            flags_b,
            matrix,
            entities: read_array(reader, entity_offset, entity_count)?,
            action: read_optional(reader, action_offset)?,
            virtual_sub_parts,
            hierarchy: read_optional(reader, hierarchy_offset)?,
            collision_instance: read_optional(reader, collision_instance_offset)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<ObjectSlots> {
        writer.write_string(&self.name);
        writer.write_u16(self.flags_a);
        writer.write_index_u16(self.hitbox_group_index);
        writer.write_i32(self.flags_b);
        writer.write_count(self.entities.len());
        let slots = ObjectSlots {
            entities: writer.placeholder(),
            action: writer.placeholder(),
            virtual_sub_parts: writer.placeholder(),
            hierarchy: writer.placeholder(),
            collision_instance: writer.placeholder(),
        };
        self.matrix.write(writer);
        Ok(slots)
    }

    fn write_children(&self, writer: &mut Writer, slots: ObjectSlots) -> Result<()> {
        write_array(writer, slots.entities, &self.entities)?;
        write_optional(writer, slots.action, self.action.as_ref())?;
        write_array(writer, slots.virtual_sub_parts, &self.virtual_sub_parts)?;
        write_optional(writer, slots.hierarchy, self.hierarchy.as_ref())?;
        write_optional(
            writer,
            slots.collision_instance,
            self.collision_instance.as_ref(),
        )
    }
}

/// A visual instance of an object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub i_00: i32,
    pub visual: Option<Visual>,
    pub matrix: Matrix,
}

impl Record for Entity {
    const TYPE: RecordType = RecordType::Entity;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        56
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let i_00 = cursor.i32()?;
        let visual_offset = cursor.offset()?;
        let matrix = Matrix::read(&mut cursor)?;

        Ok(Self {
            i_00,
            visual: read_optional(reader, visual_offset)?,
            matrix,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_i32(self.i_00);
        let slot = writer.placeholder();
        self.matrix.write(writer);
        Ok(slot)
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_optional(writer, slot, self.visual.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Visual {
    pub name: String,
    pub i_04: i32,
    pub f_08: f32,
    /// A single lod is stored inline, more are stored behind an offset.
    pub lods: Vec<Lod>,
    pub ints: [i32; 3],
}

const INLINE_LOD_SIZE: usize = 24;

impl Record for Visual {
    const TYPE: RecordType = RecordType::Visual;

    type Slots = Option<Slot>;

    fn size(_version: FormatVersion) -> usize {
        52
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let i_04 = cursor.i32()?;
        let f_08 = cursor.f32()?;
        let lod_count = cursor.count()?;

        let lods = if lod_count == 1 {
            vec![Lod::read(reader, cursor.position())?]
        } else {
            let lods_offset = reader.cursor(cursor.position(), Self::TYPE).offset()?;
            read_array(reader, lods_offset, lod_count)?
        };
        cursor.skip(INLINE_LOD_SIZE);

        Ok(Self {
            name,
            i_04,
            f_08,
            lods,
            ints: [cursor.i32()?, cursor.i32()?, cursor.i32()?],
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Option<Slot>> {
        writer.write_string(&self.name);
        writer.write_i32(self.i_04);
        writer.write_f32(self.f_08);
        writer.write_count(self.lods.len());

        let slot = if let [lod] = self.lods.as_slice() {
            lod.write_record(writer)?;
            None
        } else {
            let slot = writer.placeholder();
            writer.write_zeros(INLINE_LOD_SIZE - 4);
            Some(slot)
        };

        for &value in &self.ints {
            writer.write_i32(value);
        }
        Ok(slot)
    }

    fn write_children(&self, writer: &mut Writer, slot: Option<Slot>) -> Result<()> {
        match slot {
            Some(slot) => write_array(writer, slot, &self.lods),
            None => Ok(()),
        }
    }
}

/// A level of detail, referencing depot paths.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lod {
    pub distance: f32,
    pub nsk: Option<String>,
    pub emb: Option<String>,
    pub emm: Option<String>,
    pub ema: Option<String>,
    pub i_20: i32,
}

impl Record for Lod {
    const TYPE: RecordType = RecordType::Lod;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        INLINE_LOD_SIZE
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            distance: cursor.f32()?,
            nsk: reader.depot_path(DepotKind::Nsk, cursor.i32()?)?,
            emb: reader.depot_path(DepotKind::Emb, cursor.i32()?)?,
            emm: reader.depot_path(DepotKind::Emm, cursor.i32()?)?,
            ema: reader.depot_path(DepotKind::Ema, cursor.i32()?)?,
            i_20: cursor.i32()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_f32(self.distance);
        for (kind, path) in DepotKind::ALL.into_iter().zip([
            &self.nsk,
            &self.emb,
            &self.emm,
            &self.ema,
        ]) {
            let index = writer.depot_index(kind, path.as_deref());
            writer.write_i32(index);
        }
        writer.write_i32(self.i_20);
        Ok(())
    }
}

/// A named list of commands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub name: String,
    pub commands: Vec<Command>,
}

impl Record for Action {
    const TYPE: RecordType = RecordType::Action;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let count = cursor.count()?;
        let commands_offset = cursor.offset()?;

        Ok(Self {
            name,
            commands: read_array(reader, commands_offset, count)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_string(&self.name);
        writer.write_count(self.commands.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.commands)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Command {
    pub name: String,
    pub i_04: i32,
    pub parameters: Vec<Parameter>,
}

impl Record for Command {
    const TYPE: RecordType = RecordType::Command;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        16
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;
        let i_04 = cursor.i32()?;
        let count = cursor.count()?;
        let parameters_offset = cursor.offset()?;

        Ok(Self {
            name,
            i_04,
            parameters: read_array(reader, parameters_offset, count)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_string(&self.name);
        writer.write_i32(self.i_04);
        writer.write_count(self.parameters.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.parameters)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
}

impl ParameterValue {
    fn type_id(&self) -> i32 {
        match self {
            ParameterValue::Bool(_) => 0,
            ParameterValue::Int(_) => 1,
            ParameterValue::Float(_) => 2,
            ParameterValue::String(_) => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Record for Parameter {
    const TYPE: RecordType = RecordType::Parameter;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let name = reader.string(cursor.offset()?)?;

        let value = match cursor.i32()? {
            0 => ParameterValue::Bool(cursor.i32()? != 0),
            1 => ParameterValue::Int(cursor.i32()?),
            2 => ParameterValue::Float(cursor.f32()?),
            3 => ParameterValue::String(reader.string(cursor.offset()?)?),
            _ => {
                return Err(Error::Corrupted {
                    ty: Self::TYPE,
                    error: "unknown parameter type",
                })
            }
        };

        Ok(Self { name, value })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_string(&self.name);
        writer.write_i32(self.value.type_id());
        match &self.value {
            ParameterValue::Bool(value) => writer.write_i32(i32::from(*value)),
            ParameterValue::Int(value) => writer.write_i32(*value),
            ParameterValue::Float(value) => writer.write_f32(*value),
            ParameterValue::String(value) => writer.write_string(value),
        }
        Ok(())
    }
}

/// Per-hitbox data of an object.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualSubPart {
    pub i_00: i32,
    pub index_pairs: Vec<IndexPair>,
    pub object_sub_part: Option<ObjectSubPart>,
    pub action: Option<Action>,
    pub values: [f32; 3],
    pub matrix: Matrix,
}

pub(crate) struct VirtualSubPartSlots {
    index_pairs: Slot,
    object_sub_part: Slot,
    action: Slot,
}

impl Record for VirtualSubPart {
    const TYPE: RecordType = RecordType::VirtualSubPart;

    type Slots = VirtualSubPartSlots;

    fn size(_version: FormatVersion) -> usize {
        80
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let i_00 = cursor.i32()?;
        let pair_count = cursor.count()?;
        let pairs_offset = cursor.offset()?;
        let sub_part_offset = cursor.offset()?;
        let action_offset = cursor.offset()?;
        let values = cursor.f32s()?;
        let matrix = Matrix::read(&mut cursor)?;

        Ok(Self {
            i_00,
            index_pairs: read_array(reader, pairs_offset, pair_count)?,
            object_sub_part: read_optional(reader, sub_part_offset)?,
            action: read_optional(reader, action_offset)?,
            values,
            matrix,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<VirtualSubPartSlots> {
        writer.write_i32(self.i_00);
        writer.write_count(self.index_pairs.len());
        let slots = VirtualSubPartSlots {
            index_pairs: writer.placeholder(),
            object_sub_part: writer.placeholder(),
            action: writer.placeholder(),
        };
        writer.write_f32s(&self.values);
        self.matrix.write(writer);
        Ok(slots)
    }

    fn write_children(&self, writer: &mut Writer, slots: VirtualSubPartSlots) -> Result<()> {
        write_array(writer, slots.index_pairs, &self.index_pairs)?;
        write_optional(writer, slots.object_sub_part, self.object_sub_part.as_ref())?;
        write_optional(writer, slots.action, self.action.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexPair {
    pub first: i32,
    pub second: i32,
}

impl Record for IndexPair {
    const TYPE: RecordType = RecordType::IndexPair;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        8
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            first: cursor.i32()?,
            second: cursor.i32()?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_i32(self.first);
        writer.write_i32(self.second);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectSubPart {
    pub ints: [i32; 2],
    pub values: [f32; 7],
    pub matrix: Matrix,
}

impl Record for ObjectSubPart {
    const TYPE: RecordType = RecordType::ObjectSubPart;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        84
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        Ok(Self {
            ints: [cursor.i32()?, cursor.i32()?],
            values: cursor.f32s()?,
            matrix: Matrix::read(&mut cursor)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        for &value in &self.ints {
            writer.write_i32(value);
        }
        writer.write_f32s(&self.values);
        self.matrix.write(writer);
        Ok(())
    }
}
