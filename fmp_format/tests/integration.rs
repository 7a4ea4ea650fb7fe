use byteorder::{ByteOrder, LittleEndian};

use fmp_format::{Error, ErrorKind, FmpDocument, FormatVersion, HierarchyNodeKind, Matrix};
use fmp_test_utils::{sample_document, NEW_VERSION, OLD_VERSION};

#[test]
fn sample_documents_round_trip() {
    for version in [NEW_VERSION, OLD_VERSION] {
        let doc = sample_document(version);
        let bytes = doc.write().unwrap();
        let read = FmpDocument::read(&bytes).unwrap();

        assert_eq!(read, doc);
        // rewriting is stable byte for byte
        assert_eq!(read.write().unwrap(), bytes);
    }
}

#[test]
fn read_document_is_navigable() {
    let doc = FmpDocument::read(&sample_document(NEW_VERSION).write().unwrap()).unwrap();
    assert_eq!(doc.format_version(), FormatVersion::New);

    let forest = doc.find_object("FOREST").unwrap();
    let hierarchy = doc.objects[forest].hierarchy.as_ref().unwrap();
    match &hierarchy.root().unwrap().kind {
        HierarchyNodeKind::Branch { children } => {
            assert_eq!(children.iter().flatten().count(), 2);
        }
        HierarchyNodeKind::Leaf { .. } => panic!("root should be a branch"),
    }

    let door = &doc.objects[doc.find_object("door_01").unwrap()];
    assert_eq!(door.entities[0].visual.as_ref().unwrap().lods.len(), 2);
    assert_eq!(door.virtual_sub_parts.len(), 3);
    assert_eq!(door.matrix, Matrix::from_translation([10.0, 0.0, -4.0].into()));
    assert_eq!(doc.find_collision_group("Door"), Some(0));
}

#[test]
fn old_version_drops_hitbox_havok_offset() {
    let old = sample_document(OLD_VERSION).write().unwrap();
    let mut new = sample_document(OLD_VERSION);
    new.version = NEW_VERSION;

    // three hitboxes, four more bytes each
    assert_eq!(new.write().unwrap().len() - old.len(), 12);
}

#[test]
fn mismatched_virtual_sub_parts_fail_to_write() {
    let mut doc = sample_document(NEW_VERSION);
    doc.objects[0].virtual_sub_parts.pop();

    let error = doc.write().unwrap_err();
    assert!(matches!(error, Error::Corrupted { .. }));
    assert_eq!(error.kind(), ErrorKind::Format);
}

#[test]
fn unsorted_destruction_lists_round_trip() {
    let mut bytes = sample_document(NEW_VERSION).write().unwrap();

    let read_offset = |bytes: &[u8], at: usize| LittleEndian::read_i32(&bytes[at..]) as usize;
    let groups = read_offset(&bytes, 60);
    let hitboxes = read_offset(&bytes, groups + 8);
    let lists = read_offset(&bytes, hitboxes + 16);
    // lists are written as [0, 3], make the file order [5, 3]
    LittleEndian::write_i32(&mut bytes[lists..], 5);

    let read = FmpDocument::read(&bytes).unwrap();
    let keys: Vec<i32> = read.hitbox_groups[0].hitboxes[0]
        .destructions
        .iter()
        .map(|destruction| destruction.group)
        .collect();
    assert_eq!(keys, [3, 5, 5]);

    let reread = FmpDocument::read(&read.write().unwrap()).unwrap();
    assert_eq!(reread, read);
}
