//! Turning placed collision groups back into meshes.

use fmp_format::{
    Collider, ColliderInstance, CollisionGroup, CollisionGroupInstance, FmpDocument,
    HavokGroupParameters, InstanceMismatch,
};
use glam::Affine3A;

use crate::{
    ColliderMeshCodec, Error, Mesh, MeshGraph, MeshModel, MeshOptions, Result, Submesh,
};

/// Exports every havok blob of `group`, placed by `instance`, as a submesh.
///
/// Each collider with havok data becomes a mesh, grouped under one model per
/// top-level collider. Submeshes are named `{collider}_{index}` followed by a tag
/// carrying the resolved options. Synthesizing the result again gives submeshes
/// with the same geometry and mesh options, but colliders between the model and
/// its meshes are flattened and the skeleton matrices are not exported.
///
/// # Errors
///
/// Returns `Err` if the instance tree doesn't have the shape of the collider tree
/// or if a blob can't be decoded.
pub fn export<C: ColliderMeshCodec + ?Sized>(
    group: &CollisionGroup,
    instance: &CollisionGroupInstance,
    codec: &C,
) -> Result<MeshGraph> {
    check_count(&group.name, &group.colliders, &instance.instances)?;

    let mut models = Vec::new();
    for (collider, collider_instance) in group.colliders.iter().zip(&instance.instances) {
        let mut meshes = Vec::new();
        export_collider(
            collider,
            collider_instance,
            Affine3A::IDENTITY,
            codec,
            &mut meshes,
        )?;
        models.push(MeshModel {
            name: collider.name.clone(),
            meshes,
        });
    }

    Ok(MeshGraph::new(group.name.as_str(), models))
}

/// Exports the collision group placed by the object at `index`.
///
/// # Errors
///
/// Returns `Err` if the object doesn't exist, has no collision instance, its
/// group doesn't exist, or [`export`] fails.
pub fn export_object<C: ColliderMeshCodec + ?Sized>(
    doc: &FmpDocument,
    index: usize,
    codec: &C,
) -> Result<MeshGraph> {
    let object = doc
        .objects
        .get(index)
        .ok_or(Error::ObjectNotInDocument(index))?;
    let instance = object
        .collision_instance
        .as_ref()
        .ok_or_else(|| Error::NoInstance(object.name.clone()))?;
    let group_index = instance
        .collision_group_index
        .map(usize::from)
        .ok_or_else(|| Error::NoInstance(object.name.clone()))?;
    let group = doc
        .collision_groups
        .get(group_index)
        .ok_or(Error::MissingGroup(group_index))?;

    export(group, instance, codec)
}

fn check_count(name: &str, colliders: &[Collider], instances: &[ColliderInstance]) -> Result<()> {
    if colliders.len() == instances.len() {
        Ok(())
    } else {
        Err(InstanceMismatch {
            collider: name.to_owned(),
            colliders: colliders.len(),
            instances: instances.len(),
        }
        .into())
    }
}

fn export_collider<C: ColliderMeshCodec + ?Sized>(
    collider: &Collider,
    instance: &ColliderInstance,
    parent: Affine3A,
    codec: &C,
    meshes: &mut Vec<Mesh>,
) -> Result<()> {
    let world = parent * instance.matrix.to_affine();

    if !collider.havok.is_empty() {
        let submeshes = collider
            .havok
            .iter()
            .enumerate()
            .map(|(index, havok)| {
                let mesh = codec.decode(&havok.data)?.transformed(world);
                let parameters = group_parameters(&instance.parameters, havok.group);
                let options = MeshOptions {
                    convex: codec.is_convex(&havok.data)?,
                    fragment_group: havok.fragment_group,
                    param1_edge_vfx: false,
                    param1_float: false,
                    param1_custom: parameters.map_or(-1, |p| p.param1),
                    param2_custom: parameters.map_or(-1, |p| p.param2),
                };
                let name = format!("{}_{}{}", collider.name, index, options.to_tag());
                Ok::<_, Error>(Submesh::new(name, mesh))
            })
            .collect::<Result<Vec<_>>>()?;

        meshes.push(Mesh {
            name: collider.name.clone(),
            submeshes,
        });
    }

    check_count(&collider.name, &collider.children, &instance.children)?;
    for (child, child_instance) in collider.children.iter().zip(&instance.children) {
        export_collider(child, child_instance, world, codec, meshes)?;
    }

    Ok(())
}

fn group_parameters(
    parameters: &[HavokGroupParameters],
    group: i32,
) -> Option<&HavokGroupParameters> {
    parameters
        .iter()
        .find(|parameters| parameters.group == group)
}

#[cfg(test)]
mod tests {
    use std::result;

    use fmp_format::{Havok, Matrix, Object, HAVOK_CONCAVE_FIELDS};
    use glam::Vec3;

    use super::*;
    use crate::{CodecError, TriangleMesh};

    /// Every blob decodes to a unit triangle, the first byte is the convex flag.
    struct TriangleCodec;

    impl ColliderMeshCodec for TriangleCodec {
        fn encode(&self, _mesh: &TriangleMesh, convex: bool) -> result::Result<Vec<u8>, CodecError> {
            Ok(vec![u8::from(convex)])
        }

        fn decode(&self, data: &[u8]) -> result::Result<TriangleMesh, CodecError> {
            if data.is_empty() {
                return Err(CodecError::Empty);
            }
            Ok(TriangleMesh::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                vec![[0, 1, 2]],
            ))
        }

        fn is_convex(&self, data: &[u8]) -> result::Result<bool, CodecError> {
            data.first().map(|&flag| flag == 1).ok_or(CodecError::Empty)
        }
    }

    fn placed_group() -> (CollisionGroup, CollisionGroupInstance) {
        let mut mesh = Collider::new("wall");
        mesh.havok = vec![
            Havok {
                group: 0,
                fragment_group: 2,
                field_a: HAVOK_CONCAVE_FIELDS[0],
                field_b: HAVOK_CONCAVE_FIELDS[1],
                data: vec![0],
            },
            Havok {
                group: 1,
                fragment_group: 0,
                field_a: HAVOK_CONCAVE_FIELDS[0],
                field_b: HAVOK_CONCAVE_FIELDS[1],
                data: vec![1],
            },
        ];
        let mut root = Collider::new("house");
        root.children.push(mesh);
        let mut group = CollisionGroup::new("house");
        group.colliders.push(root);

        let mut mesh_instance = ColliderInstance::new(Matrix::from_translation(Vec3::Z));
        mesh_instance.parameters = vec![HavokGroupParameters {
            group: 1,
            param1: 3,
            param2: 9,
            i_12: 0,
        }];
        let mut root_instance =
            ColliderInstance::new(Matrix::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        root_instance.children.push(mesh_instance);

        let instance = CollisionGroupInstance {
            collision_group_index: Some(0),
            i_02: 0,
            instances: vec![root_instance],
        };
        (group, instance)
    }

    #[test]
    fn exported_meshes_are_placed_and_tagged() {
        let (group, instance) = placed_group();
        let graph = export(&group, &instance, &TriangleCodec).unwrap();

        assert_eq!(graph.name, "house");
        assert_eq!(graph.models.len(), 1);
        let mesh = &graph.models[0].meshes[0];
        assert_eq!(mesh.name, "wall");

        let names: Vec<&str> = mesh.submeshes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["wall_0@[fragment=2]", "wall_1@[convex, param1=3, param2=9]"]);
        assert_eq!(mesh.submeshes[0].mesh.vertices[1], Vec3::new(11.0, 0.0, 1.0));
    }

    #[test]
    fn mismatched_instance_is_a_format_error() {
        let (group, mut instance) = placed_group();
        instance.instances[0].children.clear();

        let error = export(&group, &instance, &TriangleCodec).unwrap_err();
        assert!(matches!(error, Error::InstanceMismatch(_)));
        assert_eq!(error.kind(), crate::ErrorKind::Format);
    }

    #[test]
    fn object_without_instance_is_an_argument_error() {
        let mut doc = FmpDocument::new(0x100);
        doc.objects.push(Object::new("crate"));

        let error = export_object(&doc, 0, &TriangleCodec).unwrap_err();
        assert_eq!(error, Error::NoInstance("crate".to_owned()));
        assert_eq!(error.kind(), crate::ErrorKind::Argument);
        assert_eq!(
            export_object(&doc, 3, &TriangleCodec).unwrap_err(),
            Error::ObjectNotInDocument(3)
        );
    }
}
