use approx::assert_relative_eq;
use byteorder::{ByteOrder, LittleEndian};

use crate::{header::Section, *};

const NEW_VERSION: i32 = 0x0002_0100;
const OLD_VERSION: i32 = 0x0000_0003;

fn lod(distance: f32, emb: &str) -> Lod {
    Lod {
        distance,
        nsk: Some("stage/bg_common.nsk".to_owned()),
        emb: Some(emb.to_owned()),
        emm: None,
        ema: None,
        i_20: 0,
    }
}

fn leaf_hierarchy() -> Hierarchy {
    Hierarchy {
        nodes: vec![Node {
            i_00: 3,
            transforms: vec![NodeTransform {
                position: [1.0, 2.0, 3.0],
                rotation: [0.0, 90.0, 0.0],
                scale: [1.0; 3],
            }],
        }],
        tree: vec![HierarchyNode {
            i_04: 0,
            center: [0.0; 3],
            half_size: 16.0,
            kind: HierarchyNodeKind::Leaf {
                node_indices: vec![0],
            },
        }],
        i_12: 0,
    }
}

fn document(version: i32) -> FmpDocument {
    let mut object = Object::new("crate_01");
    object.entities = vec![Entity {
        i_00: 1,
        visual: Some(Visual {
            name: "crate".to_owned(),
            i_04: 0,
            f_08: 1.0,
            lods: vec![lod(10.0, "stage/crate.emb"), lod(50.0, "stage/crate.emb")],
            ints: [0; 3],
        }),
        matrix: Matrix::IDENTITY,
    }];
    object.action = Some(Action {
        name: "break".to_owned(),
        commands: vec![Command {
            name: "spawn".to_owned(),
            i_04: 2,
            parameters: vec![
                Parameter {
                    name: "enabled".to_owned(),
                    value: ParameterValue::Bool(true),
                },
                Parameter {
                    name: "effect".to_owned(),
                    value: ParameterValue::String("smoke".to_owned()),
                },
            ],
        }],
    });

    let mut doc = FmpDocument::new(version);
    doc.objects = vec![object];
    doc
}

fn round_trip(doc: &FmpDocument) -> FmpDocument {
    FmpDocument::read(&doc.write().unwrap()).unwrap()
}

#[test]
fn document_round_trip() {
    let doc = document(NEW_VERSION);
    assert_eq!(round_trip(&doc), doc);

    let doc = document(OLD_VERSION);
    assert_eq!(doc.format_version(), FormatVersion::Old);
    assert_eq!(round_trip(&doc), doc);
}

#[test]
fn shared_depot_paths_are_deduplicated() {
    let bytes = document(NEW_VERSION).write().unwrap();

    let emb_count_slot = Section::Depot2.offset_slot() - 4;
    let nsk_count_slot = Section::Depot1.offset_slot() - 4;
    let emm_count_slot = Section::Depot3.offset_slot() - 4;
    assert_eq!(LittleEndian::read_i32(&bytes[emb_count_slot..]), 1);
    assert_eq!(LittleEndian::read_i32(&bytes[nsk_count_slot..]), 1);
    assert_eq!(LittleEndian::read_i32(&bytes[emm_count_slot..]), 0);
}

#[test]
fn offsets_point_forward() {
    let mut doc = document(NEW_VERSION);
    doc.objects[0].hierarchy = Some(leaf_hierarchy());
    let (bytes, patches) = doc.write_traced().unwrap();

    assert!(!patches.is_empty());
    for (slot, target) in patches {
        assert!(target > slot, "offset at {} points back to {}", slot, target);
        assert!(target < bytes.len(), "offset at {} points past the end", slot);
    }
}

#[test]
fn rotations_are_stored_in_radians() {
    let mut doc = document(NEW_VERSION);
    doc.objects[0].hierarchy = Some(leaf_hierarchy());
    let bytes = doc.write().unwrap();

    let object_offset = LittleEndian::read_i32(&bytes[Section::Objects.offset_slot()..]) as usize;
    let hierarchy_offset = LittleEndian::read_i32(&bytes[object_offset + 28..]) as usize;
    let nodes_offset = LittleEndian::read_i32(&bytes[hierarchy_offset + 4..]) as usize;
    let transforms_offset = LittleEndian::read_i32(&bytes[nodes_offset + 8..]) as usize;
    let stored = LittleEndian::read_f32(&bytes[transforms_offset + 16..]);
    assert_relative_eq!(stored, std::f32::consts::FRAC_PI_2, epsilon = 1e-6);

    let read = FmpDocument::read(&bytes).unwrap();
    let transform = &read.objects[0].hierarchy.as_ref().unwrap().nodes[0].transforms[0];
    assert_relative_eq!(transform.rotation[1], 90.0, epsilon = 1e-4);
    assert_eq!(transform.position, [1.0, 2.0, 3.0]);
}

#[test]
fn invalid_node_type_is_rejected() {
    let mut doc = document(NEW_VERSION);
    doc.objects[0].hierarchy = Some(leaf_hierarchy());
    let mut bytes = doc.write().unwrap();

    let object_offset = LittleEndian::read_i32(&bytes[Section::Objects.offset_slot()..]) as usize;
    let hierarchy_offset = LittleEndian::read_i32(&bytes[object_offset + 28..]) as usize;
    let root_offset = LittleEndian::read_i32(&bytes[hierarchy_offset + 8..]) as usize;
    LittleEndian::write_i32(&mut bytes[root_offset..], 7);

    assert_eq!(FmpDocument::read(&bytes), Err(Error::InvalidNodeType(7)));
}

#[test]
fn too_many_settings_items() {
    let mut doc = document(NEW_VERSION);
    doc.settings_b.items = (0..52)
        .map(|i| SettingsItem {
            name: format!("item_{}", i),
            value_type: 0,
            value: i,
        })
        .collect();

    let error = doc.write().unwrap_err();
    assert_eq!(error, Error::TooManySettingsItems(52));
    assert_eq!(error.kind(), ErrorKind::Argument);

    doc.settings_b.items.truncate(MAX_SETTINGS_ITEMS);
    assert_eq!(round_trip(&doc), doc);
}

#[test]
fn hitbox_size_depends_on_version() {
    let group = HitboxGroup {
        name: "gate".to_owned(),
        hitboxes: vec![Hitbox::new("gate_l"), Hitbox::new("gate_r")],
    };

    let mut old = document(OLD_VERSION);
    old.hitbox_groups = vec![group.clone()];
    let mut new = document(NEW_VERSION);
    new.hitbox_groups = vec![group];

    let old_len = old.write().unwrap().len();
    let new_len = new.write().unwrap().len();
    assert_eq!(new_len - old_len, 8);
    assert_eq!(round_trip(&old), old);
    assert_eq!(round_trip(&new), new);
}

#[test]
fn old_format_has_no_hitbox_havok() {
    let mut hitbox = Hitbox::new("wall");
    hitbox.havok = Some(vec![1, 2, 3]);

    let mut doc = document(OLD_VERSION);
    doc.hitbox_groups = vec![HitboxGroup {
        name: "wall".to_owned(),
        hitboxes: vec![hitbox],
    }];

    assert!(matches!(
        doc.write(),
        Err(Error::Unsupported {
            ty: RecordType::Hitbox,
            ..
        })
    ));

    doc.version = NEW_VERSION;
    assert_eq!(round_trip(&doc), doc);
}

#[test]
fn virtual_sub_parts_must_match_hitboxes() {
    let mut doc = document(NEW_VERSION);
    doc.hitbox_groups = vec![HitboxGroup {
        name: "gate".to_owned(),
        hitboxes: vec![Hitbox::new("gate_l"), Hitbox::new("gate_r")],
    }];
    doc.objects[0].hitbox_group_index = Some(0);
    doc.objects[0].virtual_sub_parts = vec![VirtualSubPart {
        i_00: 0,
        index_pairs: vec![IndexPair {
            first: 0,
            second: 1,
        }],
        object_sub_part: None,
        action: None,
        values: [0.0; 3],
        matrix: Matrix::IDENTITY,
    }];

    assert!(matches!(
        doc.write(),
        Err(Error::Corrupted {
            ty: RecordType::Object,
            ..
        })
    ));

    let part = doc.objects[0].virtual_sub_parts[0].clone();
    doc.objects[0].virtual_sub_parts.push(part);
    assert_eq!(round_trip(&doc), doc);
}

#[test]
fn truncated_file_is_out_of_bounds() {
    let bytes = document(NEW_VERSION).write().unwrap();
    let error = FmpDocument::read(&bytes[..200]).unwrap_err();

    assert!(matches!(error, Error::OutOfBounds { .. }));
    assert_eq!(error.kind(), ErrorKind::Format);
}
