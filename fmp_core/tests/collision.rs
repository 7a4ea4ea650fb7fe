use approx::assert_relative_eq;
use glam::{Affine3A, Vec3};

use fmp_core::{
    collision::{exporter, merger, Bone, ErrorKind, Skeleton, Synthesizer},
    format::FmpDocument,
};
use fmp_test_utils::{mesh_graph, sample_document, ReferenceCodec, OLD_VERSION};

#[test]
fn synthesized_collision_survives_the_file() {
    let codec = ReferenceCodec::default();
    let skeleton = Skeleton::new(vec![
        Bone {
            name: "root".to_owned(),
            parent_bone_index: None,
            matrix: Affine3A::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        },
        Bone {
            name: "Warehouse_Model".to_owned(),
            parent_bone_index: Some(0),
            matrix: Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)),
        },
    ]);

    let synthesized = Synthesizer::new(codec)
        .synthesize(&mesh_graph(), Some(&skeleton))
        .unwrap();
    assert_eq!(synthesized.matrices.len(), 1);

    let mut doc = sample_document(OLD_VERSION);
    let door = doc.find_object("door_02").unwrap();
    let index = merger::import_synthesized(&mut doc, door, synthesized).unwrap();
    // door_02 already used the sample group
    assert_eq!(index, 0);

    let doc = FmpDocument::read(&doc.write().unwrap()).unwrap();
    // door_01 shared the group and got rebuilt along with it
    for object in ["door_01", "door_02"] {
        let object = &doc.objects[doc.find_object(object).unwrap()];
        let instance = object.collision_instance.as_ref().unwrap();
        assert_eq!(instance.check_matches(&doc.collision_groups[0]), Ok(()));
    }

    let exported = exporter::export_object(&doc, door, &codec).unwrap();
    let crate_mesh = &exported.models[0].meshes[1].submeshes[0].mesh;
    let min = crate_mesh
        .vertices
        .iter()
        .fold(Vec3::splat(f32::MAX), |min, &vertex| min.min(vertex));
    // cube centered at (4, 4, 1) moved by the bone chain
    assert_relative_eq!(min, Vec3::new(4.0, 3.0, 2.0));
}

#[test]
fn exporting_a_plain_object_fails() {
    let doc = sample_document(OLD_VERSION);
    let forest = doc.find_object("forest").unwrap();

    let error = exporter::export_object(&doc, forest, &ReferenceCodec::default()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Argument);
}
