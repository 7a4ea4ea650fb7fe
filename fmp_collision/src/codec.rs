use glam::{Affine3A, Vec3};
use thiserror::Error;

/// Plain triangle geometry exchanged with a [`ColliderMeshCodec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    #[must_use]
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn transformed(&self, affine: Affine3A) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|&vertex| affine.transform_point3(vertex))
                .collect(),
            triangles: self.triangles.clone(),
        }
    }
}

#[derive(Debug, Clone, Error, Hash, PartialEq, Eq)]
pub enum CodecError {
    #[error("{triangles} triangles exceed the limit of {limit}")]
    TooManyTriangles { triangles: usize, limit: usize },
    #[error("mesh is empty")]
    Empty,
    #[error("invalid collision mesh data: {0}")]
    InvalidData(String),
}

/// Converts between triangle meshes and the physics engine's collision blobs.
///
/// The blob layout belongs to the physics engine; implementations live outside
/// this crate. `Sync` is required because submeshes are encoded in parallel.
pub trait ColliderMeshCodec: Sync {
    /// Encodes `mesh` using the convex or concave template.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the mesh can't be represented, for example because it
    /// has too many triangles.
    fn encode(&self, mesh: &TriangleMesh, convex: bool) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    ///
    /// Returns `Err` if `data` isn't a valid blob.
    fn decode(&self, data: &[u8]) -> Result<TriangleMesh, CodecError>;

    /// # Errors
    ///
    /// Returns `Err` if `data` isn't a valid blob.
    fn is_convex(&self, data: &[u8]) -> Result<bool, CodecError>;
}

impl<C: ColliderMeshCodec + ?Sized> ColliderMeshCodec for &C {
    fn encode(&self, mesh: &TriangleMesh, convex: bool) -> Result<Vec<u8>, CodecError> {
        (**self).encode(mesh, convex)
    }

    fn decode(&self, data: &[u8]) -> Result<TriangleMesh, CodecError> {
        (**self).decode(data)
    }

    fn is_convex(&self, data: &[u8]) -> Result<bool, CodecError> {
        (**self).is_convex(data)
    }
}
