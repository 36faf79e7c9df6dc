use std::fs;
use std::path::{Path, PathBuf};

use super::fixtures::*;
use crate::reflect::FieldValue;
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_session::SaveSession;
use crate::save_types::Snapshot;
use crate::store::{encode_snapshot, FileStore, SaveStore};

fn test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(format!("/tmp/graph_save_scenario_{name}"));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn file_session(dir: &Path) -> SaveSession {
    let config = SaveConfig {
        save_dir: dir.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let store = FileStore::from_config(&config);
    SaveSession::new(config, Box::new(store))
}

#[test]
fn test_save_load_restore_through_files() {
    let dir = test_dir("roundtrip");
    let mut session = file_session(&dir);
    let (mut world, level) = new_world(FOREST);
    world.put_field(level.session, "Gold", FieldValue::Int(99));
    world.put_field(level.pawn, "Health", FieldValue::Float(12.25));

    session.request_save(&mut world, "Slot One", false).unwrap();
    assert!(dir.join("Slot_One.sav").exists());

    world.put_field(level.session, "Gold", FieldValue::Int(0));
    session.request_load(&mut world, "Slot One").unwrap();
    assert_eq!(world.pending_level(), Some(FOREST));
    let reloaded = activate(&mut world);
    restore(&mut session, &mut world);

    assert_eq!(int(&world, reloaded.session, "Gold"), 99);
    assert!((float(&world, reloaded.pawn, "Health") - 12.25).abs() < 1e-9);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_autosave_copy_and_list() {
    let dir = test_dir("autosave");
    let mut session = file_session(&dir);
    let (mut world, _) = new_world(FOREST);

    let slot = session.autosave(&mut world, false).unwrap();
    assert_eq!(slot, "Autosave_Forest");
    session.copy_save(&slot, "Backup").unwrap();
    assert!(matches!(session.copy_save("Nothing", "Other"), Err(SaveError::NoData)));

    assert_eq!(
        session.store().list_slots().unwrap(),
        vec!["Autosave_Forest".to_string(), "Backup".to_string()]
    );
    assert!(session.store_mut().delete("Backup").unwrap());
    assert!(!session.store_mut().delete("Backup").unwrap());
    assert!(!session.store().exists("Backup"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_store_follows_config_dir_and_compression() {
    let dir = test_dir("config");
    let config = SaveConfig {
        compress: false,
        save_dir: dir.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let mut store = FileStore::from_config(&config);
    assert_eq!(store.dir(), dir.as_path());

    let snapshot = Snapshot {
        current_level: FOREST.to_string(),
        ..Default::default()
    };
    store.save("Plain", &snapshot).unwrap();
    let written = fs::read(dir.join("Plain.sav")).unwrap();
    assert_eq!(written, encode_snapshot(&snapshot, false));
    assert_ne!(written, encode_snapshot(&snapshot, true));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_newer_snapshot_is_refused() {
    let dir = test_dir("version");
    let store = FileStore::new(&dir, false);
    let future = Snapshot {
        version: 99,
        current_level: FOREST.to_string(),
        ..Default::default()
    };
    fs::create_dir_all(&dir).unwrap();
    fs::write(store.slot_path("Future").unwrap(), encode_snapshot(&future, false)).unwrap();

    let mut session = file_session(&dir);
    let (mut world, _) = new_world(FOREST);
    match session.request_load(&mut world, "Future") {
        Err(SaveError::VersionMismatch { expected_max, found }) => {
            assert_eq!(found, 99);
            assert!(expected_max < 99);
        }
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
    assert_eq!(world.pending_level(), None);
    assert!(!session.is_loading());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_corrupt_file_is_a_decode_error() {
    let dir = test_dir("corrupt");
    let mut session = file_session(&dir);
    let (mut world, _) = new_world(FOREST);
    session.request_save(&mut world, "slot1", false).unwrap();

    let path = dir.join("slot1.sav");
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        session.request_load(&mut world, "slot1"),
        Err(SaveError::Decode(_))
    ));
    assert!(matches!(
        session.request_load(&mut world, "missing"),
        Err(SaveError::NoData)
    ));
    assert_eq!(world.pending_level(), None);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_interrupted_writes_are_cleaned_up() {
    let dir = test_dir("recover");
    let store = FileStore::new(&dir, true);
    assert_eq!(store.recover_tmp_files(), 0);
    assert!(store.list_slots().unwrap().is_empty());

    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("slot1.sav.tmp"), b"partial").unwrap();
    fs::write(dir.join("slot2.sav.tmp"), b"partial").unwrap();
    assert!(store.list_slots().unwrap().is_empty());

    assert_eq!(store.recover_tmp_files(), 2);
    assert!(!dir.join("slot1.sav.tmp").exists());
    assert_eq!(store.dir(), dir.as_path());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unusable_slot_names_are_rejected() {
    let dir = test_dir("names");
    let mut session = file_session(&dir);
    let (mut world, _) = new_world(FOREST);
    assert!(matches!(
        session.request_save(&mut world, "!!!", false),
        Err(SaveError::InvalidSlotName(_))
    ));
    assert!(!dir.exists());

    let _ = fs::remove_dir_all(&dir);
}
