use fmp_uncased::AsUncased;
use glam::Affine3A;

use crate::TriangleMesh;

/// Already parsed source geometry: models, their meshes and their submeshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGraph {
    /// Names the synthesized collision group and its root collider.
    pub name: String,
    pub models: Vec<MeshModel>,
}

impl MeshGraph {
    #[must_use]
    pub fn new(name: impl Into<String>, models: Vec<MeshModel>) -> Self {
        Self {
            name: name.into(),
            models,
        }
    }

    /// All submeshes in model, mesh, submesh order.
    pub fn submeshes(&self) -> impl Iterator<Item = &Submesh> {
        self.models
            .iter()
            .flat_map(|model| &model.meshes)
            .flat_map(|mesh| &mesh.submeshes)
    }

    #[must_use]
    pub fn submesh_count(&self) -> usize {
        self.submeshes().count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshModel {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub submeshes: Vec<Submesh>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    /// May carry a `@[...]` options tag.
    pub name: String,
    pub mesh: TriangleMesh,
}

impl Submesh {
    #[must_use]
    pub fn new(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            mesh,
        }
    }
}

/// Resolves bone names to absolute transforms.
pub trait BoneLookup {
    fn absolute_matrix(&self, name: &str) -> Option<Affine3A>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent_bone_index: Option<usize>,
    /// Relative to the parent bone.
    pub matrix: Affine3A,
}

/// A flat bone list, parents referenced by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    #[must_use]
    pub fn new(bones: Vec<Bone>) -> Self {
        Self { bones }
    }

    /// Finds a bone by name, ignoring ascii case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|bone| bone.name.as_uncased() == name.as_uncased())
    }

    /// Composes the parent chain of the bone at `index`.
    #[must_use]
    pub fn bone_absolute_matrix(&self, index: usize) -> Option<Affine3A> {
        let mut matrix = self.bones.get(index)?.matrix;
        let mut parent = self.bones[index].parent_bone_index;
        let mut depth = 0;

        while let Some(parent_index) = parent {
            // a parent cycle would never end
            if depth > self.bones.len() {
                return None;
            }
            let bone = self.bones.get(parent_index)?;
            matrix = bone.matrix * matrix;
            parent = bone.parent_bone_index;
            depth += 1;
        }

        Some(matrix)
    }
}

impl BoneLookup for Skeleton {
    fn absolute_matrix(&self, name: &str) -> Option<Affine3A> {
        self.find(name)
            .and_then(|index| self.bone_absolute_matrix(index))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{Vec3, Vec3A};

    use super::*;

    #[test]
    fn absolute_matrix_composes_parents() {
        let skeleton = Skeleton::new(vec![
            Bone {
                name: "root".to_owned(),
                parent_bone_index: None,
                matrix: Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            },
            Bone {
                name: "Door_L".to_owned(),
                parent_bone_index: Some(0),
                matrix: Affine3A::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            },
        ]);

        let matrix = skeleton.absolute_matrix("door_l").unwrap();
        assert_relative_eq!(matrix.translation, Vec3A::new(1.0, 2.0, 0.0));
        assert!(skeleton.absolute_matrix("door_r").is_none());
    }

    #[test]
    fn parent_cycle_is_not_followed() {
        let bone = |parent| Bone {
            name: "loop".to_owned(),
            parent_bone_index: Some(parent),
            matrix: Affine3A::IDENTITY,
        };
        let skeleton = Skeleton::new(vec![bone(1), bone(0)]);

        assert!(skeleton.bone_absolute_matrix(0).is_none());
    }
}
