//! Unit tests for the local store.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::{fs, path::PathBuf};

use tempfile::TempDir;

use crate::{
    ConfsyncError,
    store::{ConfigSnapshot, LocalStore, nanos_to_system_time, system_time_to_nanos},
};

fn config_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.json");
    fs::write(&path, content).unwrap();
    path
}

fn set_mtime(path: &PathBuf, nanos: i64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(nanos_to_system_time(nanos)).unwrap();
}

#[test]
fn read_reports_content_and_mtime() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, r#"{"level": 3}"#);
    set_mtime(&path, 1_700_000_000_123_456_789);

    let store = LocalStore::open(&path).unwrap();
    let snapshot = store.read().unwrap();

    assert_eq!(snapshot.body, r#"{"level": 3}"#);
    assert_eq!(snapshot.timestamp, 1_700_000_000_123_456_789);
}

#[test]
fn read_is_never_cached() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, "first");
    let store = LocalStore::open(&path).unwrap();
    assert_eq!(store.read().unwrap().body, "first");

    fs::write(&path, "second").unwrap();

    assert_eq!(store.read().unwrap().body, "second");
}

#[test]
fn open_missing_file_is_config_io_error() {
    let dir = TempDir::new().unwrap();

    let result = LocalStore::open(dir.path().join("missing.json"));

    assert!(matches!(result, Err(ConfsyncError::ConfigIo { .. })));
}

#[test]
fn read_existing_treats_deleted_file_as_absent() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, "gone soon");
    let store = LocalStore::open(&path).unwrap();

    fs::remove_file(&path).unwrap();

    assert_eq!(store.read_existing().unwrap(), None);
    assert!(matches!(store.read(), Err(ConfsyncError::ConfigIo { .. })));
}

#[test]
fn read_rejects_non_utf8_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    let store = LocalStore::open(&path).unwrap();

    assert!(matches!(store.read(), Err(ConfsyncError::ConfigIo { .. })));
}

#[test]
fn write_replaces_content() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, "old");
    let store = LocalStore::open(&path).unwrap();

    store.write("new").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
}

#[test]
fn write_at_pins_timestamp() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, "old");
    let store = LocalStore::open(&path).unwrap();

    store.write_at("remote", 1_650_000_000_000_000_000).unwrap();

    let snapshot = store.read().unwrap();
    assert_eq!(snapshot, ConfigSnapshot::new(1_650_000_000_000_000_000, "remote"));
}

#[test]
fn write_at_recreates_deleted_file_without_leftovers() {
    let dir = TempDir::new().unwrap();
    let path = config_file(&dir, "old");
    let store = LocalStore::open(&path).unwrap();
    fs::remove_file(&path).unwrap();

    store.write_at("restored", 1_000_000_000).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "restored");
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn nanos_conversion_handles_pre_epoch_times() {
    let time = nanos_to_system_time(-5_000);

    assert_eq!(system_time_to_nanos(time), -5_000);
    assert_eq!(system_time_to_nanos(nanos_to_system_time(42)), 42);
}

#[test]
fn snapshot_wire_format_uses_original_field_names() {
    let snapshot = ConfigSnapshot::new(100, "v1");

    let wire = snapshot.to_wire().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&wire).unwrap();

    assert_eq!(value["Time"], 100);
    assert_eq!(value["Body"], "v1");
    assert_eq!(ConfigSnapshot::from_wire(&wire).unwrap(), snapshot);
}

#[test]
fn snapshot_from_garbage_is_malformed() {
    let result = ConfigSnapshot::from_wire(b"not json at all");

    match result {
        Err(ConfsyncError::MalformedMessage { kind, .. }) => assert_eq!(kind, "snapshot"),
        other => panic!("expected malformed message, got {other:?}"),
    }
}
