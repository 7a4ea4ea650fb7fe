#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

//! Reader and writer for the FMP map format.
//!
//! [`FmpDocument::read`] resolves every offset of a file into an owned tree of records,
//! [`FmpDocument::write`] emits the tree again, back-patching forward offsets and
//! appending a single string pool at the end.

pub mod binary_utils;
mod collision;
mod depot;
mod document;
mod header;
mod hierarchy;
mod hitbox;
mod matrix;
mod object;
mod reader;
mod record;
mod section;
mod settings;
mod strings;
mod writer;

#[cfg(test)]
mod tests;

use std::{
    fmt::{self, Display},
    result,
};

use thiserror::Error;

pub use collision::{
    Collider, ColliderInstance, CollisionGroup, CollisionGroupInstance, Havok,
    HavokGroupParameters, InstanceMismatch, HAVOK_CONCAVE_FIELDS, HAVOK_CONVEX_FIELDS,
};
pub use depot::{DepotKind, DepotStringTable};
pub use document::FmpDocument;
pub use header::{SETTINGS_A_OFFSET, SETTINGS_B_OFFSET, SIGNATURE};
pub use hierarchy::{Hierarchy, HierarchyNode, HierarchyNodeKind, Node, NodeTransform};
pub use hitbox::{Destruction, DestructionSubPart, Hitbox, HitboxGroup};
pub use matrix::Matrix;
pub use object::{
    Action, Command, Entity, IndexPair, Lod, Object, ObjectSubPart, Parameter, ParameterValue,
    VirtualSubPart, Visual,
};
pub use section::{FragmentGroup, Section1, Section2};
pub use settings::{SettingsA, SettingsB, SettingsItem, MAX_SETTINGS_ITEMS};
pub use strings::StringPatchList;

/// Layout variant of the file, derived from the version field.
///
/// Old files use 36 byte hitboxes without an embedded havok geometry offset,
/// new files use 40 byte hitboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    Old,
    New,
}

impl FormatVersion {
    #[must_use]
    pub fn from_version(version: i32) -> Self {
        if version & 0xF_FF00 == 0 {
            Self::Old
        } else {
            Self::New
        }
    }

    #[must_use]
    pub fn is_old(self) -> bool {
        self == Self::Old
    }
}

#[derive(Debug, Clone, Error, Hash, PartialEq, Eq)]
pub enum Error {
    #[error("not an fmp file: invalid signature `{signature}`")]
    InvalidSignature { signature: String },
    #[error("{ty} corrupted: {error}")]
    Corrupted { ty: RecordType, error: &'static str },
    #[error("{ty} at offset {offset} is out of bounds")]
    OutOfBounds { ty: RecordType, offset: usize },
    #[error("invalid hierarchy node type {0}")]
    InvalidNodeType(i32),
    #[error("{ty} record is {actual} bytes, expected {expected}")]
    SizeMismatch {
        ty: RecordType,
        expected: usize,
        actual: usize,
    },
    #[error("{ty} {feature} unsupported")]
    Unsupported {
        ty: RecordType,
        feature: &'static str,
    },
    #[error("{0} settings items don't fit, at most {MAX_SETTINGS_ITEMS} are supported")]
    TooManySettingsItems(usize),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The data is malformed, or the writer produced an inconsistent record.
    Format,
    /// The caller passed something that can't be represented.
    Argument,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooManySettingsItems(_) => ErrorKind::Argument,
            _ => ErrorKind::Format,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RecordType {
    Header,
    SettingsA,
    SettingsB,
    SettingsItem,
    Section1,
    Section2,
    FragmentGroup,
    Object,
    Entity,
    Visual,
    Lod,
    Action,
    Command,
    Parameter,
    VirtualSubPart,
    IndexPair,
    ObjectSubPart,
    Hierarchy,
    Node,
    NodeTransform,
    HierarchyNode,
    HitboxGroup,
    Hitbox,
    DestructionList,
    DestructionSubPart,
    HavokData,
    CollisionGroup,
    Collider,
    Havok,
    CollisionGroupInstance,
    ColliderInstance,
    HavokGroupParameters,
    Depot,
    String,
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordType::Header => "header",
            RecordType::SettingsA => "settings a",
            RecordType::SettingsB => "settings b",
            RecordType::SettingsItem => "settings item",
            RecordType::Section1 => "section 1",
            RecordType::Section2 => "section 2",
            RecordType::FragmentGroup => "fragment group",
            RecordType::Object => "object",
            RecordType::Entity => "entity",
            RecordType::Visual => "visual",
            RecordType::Lod => "lod",
            RecordType::Action => "action",
            RecordType::Command => "command",
            RecordType::Parameter => "parameter",
            RecordType::VirtualSubPart => "virtual sub part",
            RecordType::IndexPair => "index pair",
            RecordType::ObjectSubPart => "object sub part",
            RecordType::Hierarchy => "hierarchy",
            RecordType::Node => "node",
            RecordType::NodeTransform => "node transform",
            RecordType::HierarchyNode => "hierarchy node",
            RecordType::HitboxGroup => "hitbox group",
            RecordType::Hitbox => "hitbox",
            RecordType::DestructionList => "destruction list",
            RecordType::DestructionSubPart => "destruction sub part",
            RecordType::HavokData => "havok data",
            RecordType::CollisionGroup => "collision group",
            RecordType::Collider => "collider",
            RecordType::Havok => "havok",
            RecordType::CollisionGroupInstance => "collision group instance",
            RecordType::ColliderInstance => "collider instance",
            RecordType::HavokGroupParameters => "havok group parameters",
            RecordType::Depot => "depot",
            RecordType::String => "string",
        })
    }
}
