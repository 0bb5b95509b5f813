//! Tests for manifest rendering and id allocation against the archive.

use quick_xml::events::Event;
use quick_xml::Reader;
use xvatool_core::ids::IdAllocation;
use xvatool_core::manifest::{generate_manifest, DiskMeta, ManifestTemplates};

fn metas(names: &[&str]) -> Vec<DiskMeta> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| DiskMeta {
            name: n.to_string(),
            virtual_size: (i as u64 + 1) * 1024 * 1024,
        })
        .collect()
}

fn assert_well_formed(xml: &str) {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("manifest is not well-formed XML: {e}"),
        }
    }
}

#[test]
fn test_default_manifest_is_well_formed_xml() {
    let ids = IdAllocation::allocate(3);
    let manifest = generate_manifest(
        &ManifestTemplates::default(),
        &ids,
        "appliance",
        &metas(&["root", "swap", "data"]),
    );
    assert_well_formed(&manifest.text);
}

#[test]
fn test_manifest_with_no_disks_is_well_formed() {
    let ids = IdAllocation::allocate(0);
    let manifest = generate_manifest(&ManifestTemplates::default(), &ids, "empty", &[]);
    assert_well_formed(&manifest.text);
    assert!(manifest.vdi_ids.is_empty());
}

#[test]
fn test_vdi_ids_follow_allocation_order() {
    let ids = IdAllocation::allocate(3);
    let manifest = generate_manifest(
        &ManifestTemplates::default(),
        &ids,
        "VM",
        &metas(&["a", "b", "c"]),
    );
    assert_eq!(manifest.vdi_ids, vec![2, 4, 6]);
}

#[test]
fn test_manifest_references_every_entity_id() {
    let ids = IdAllocation::allocate(2);
    let manifest = generate_manifest(
        &ManifestTemplates::default(),
        &ids,
        "VM",
        &metas(&["a", "b"]),
    );

    // VM 0, VBD/VDI pairs 1..=4, SR 5.
    for id in 0..=5u32 {
        assert!(
            manifest.text.contains(&format!("<value>Ref:{id}</value>")),
            "manifest should reference Ref:{id}"
        );
    }
}

#[test]
fn test_manifest_contains_virtual_sizes() {
    let ids = IdAllocation::allocate(2);
    let manifest = generate_manifest(
        &ManifestTemplates::default(),
        &ids,
        "VM",
        &metas(&["a", "b"]),
    );
    assert!(manifest.text.contains("<value>1048576</value>"));
    assert!(manifest.text.contains("<value>2097152</value>"));
}

#[test]
fn test_manifest_contains_fresh_uuids() {
    let ids = IdAllocation::allocate(1);
    let manifest = generate_manifest(&ManifestTemplates::default(), &ids, "VM", &metas(&["a"]));

    for uuid in [&ids.vm.uuid, &ids.vbds[0].uuid, &ids.vdis[0].uuid, &ids.sr.uuid] {
        assert!(manifest.text.contains(&uuid.to_string()));
    }
}
