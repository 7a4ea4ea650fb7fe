#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

//! Collision hierarchy synthesis for FMP maps.
//!
//! [`Synthesizer`] turns a mesh graph into a [`CollisionGroup`](fmp_format::CollisionGroup),
//! [`merger::import`] stores it in a document and rebuilds the instances of every
//! object using it, [`exporter::export`] turns a placed group back into meshes.

mod codec;
pub mod exporter;
mod hull;
pub mod merger;
mod mesh;
mod mesh_options;
mod synthesizer;

use std::result;

use thiserror::Error;

pub use codec::{CodecError, ColliderMeshCodec, TriangleMesh};
pub use fmp_format::ErrorKind;
pub use mesh::{Bone, BoneLookup, Mesh, MeshGraph, MeshModel, Skeleton, Submesh};
pub use mesh_options::{MeshOptions, PARAM1_EDGE_VFX, PARAM1_FLOAT};
pub use synthesizer::{SynthesisConfig, Synthesized, Synthesizer};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("object {0} is not part of the document")]
    ObjectNotInDocument(usize),
    #[error("expected exactly one submesh, found {0}")]
    NotSingleSubmesh(usize),
    #[error("object `{0}` has no collision instance")]
    NoInstance(String),
    #[error("collision group {0} doesn't exist")]
    MissingGroup(usize),
    #[error("collision instance doesn't match its group: {0}")]
    InstanceMismatch(#[from] fmp_format::InstanceMismatch),
    #[error("collision mesh: {0}")]
    Codec(#[from] CodecError),
    #[error("{0} collision groups can't be indexed")]
    TooManyGroups(usize),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Format(#[from] fmp_format::Error),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ObjectNotInDocument(_)
            | Error::NotSingleSubmesh(_)
            | Error::NoInstance(_)
            | Error::TooManyGroups(_)
            | Error::ThreadPool(_) => ErrorKind::Argument,
            Error::MissingGroup(_) | Error::InstanceMismatch(_) | Error::Codec(_) => {
                ErrorKind::Format
            }
            Error::Format(error) => error.kind(),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
