// Snapshot persistence tests

mod common;

use common::StoreFixture;
use modelite_core::{Backend, Error, FieldType};
use modelite_embedded::{EmbeddedBackend, EmbeddedConfig};
use std::fs;

#[test]
fn test_snapshot_round_trip() {
    let fixture = StoreFixture::new();
    fixture.seed(3);
    fixture.backend.close().expect("Failed to close store");
    assert!(fixture.snapshot_path.exists());

    let reopened = EmbeddedBackend::open(EmbeddedConfig::persistent(&fixture.snapshot_path))
        .expect("Failed to reopen store");
    let model = reopened.ensure_model("User").unwrap();
    let fields = reopened.inspect_fields(&model).unwrap();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[0].field_type, FieldType::String);
    assert!(fields[0].required);

    let found = reopened.find_by_id(&model, &3.into()).unwrap().unwrap();
    assert_eq!(found.get("name").and_then(|v| v.as_str()), Some("user3"));

    // ids keep increasing after reload
    let added = reopened
        .add(&model, modelite_core::Record::new().with("name", "user4"))
        .unwrap();
    assert_eq!(added.id().and_then(|v| v.as_int()), Some(4));
}

#[test]
fn test_corrupted_snapshot_is_rejected() {
    let fixture = StoreFixture::new();
    fixture.seed(1);
    fixture.backend.save().unwrap();

    let mut bytes = fs::read(&fixture.snapshot_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5A;
    fs::write(&fixture.snapshot_path, bytes).unwrap();

    let result = EmbeddedBackend::open(EmbeddedConfig::persistent(&fixture.snapshot_path));
    assert!(matches!(result, Err(Error::Corruption(_))));
}

#[test]
fn test_open_without_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let backend = EmbeddedBackend::open(EmbeddedConfig::persistent(dir.path().join("new.snap")))
        .unwrap();
    assert!(backend.model_names().unwrap().is_empty());
}
