use super::fixtures::*;
use crate::debug_compare::SnapshotMismatch;
use crate::host_world::{HostWorld, NullStatus};
use crate::memory_world::{MemoryObject, MemoryWorld};
use crate::reflect::FieldValue;
use crate::restore_pipeline::{RestoreOptions, RestorePipeline, RestoreState};
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_session::SaveSession;
use crate::save_types::{SavedTransform, Snapshot};
use crate::store::MemoryStore;

/// Forest with an equipped item, an opened chest and a runtime lamp, saved,
/// loaded and reactivated. A stray lamp is placed after activation.
fn prepared() -> (SaveSession, MemoryWorld, Level) {
    let (mut world, level) = new_world(FOREST);
    let chest = level.chest.unwrap();
    let sword = add_item(&mut world, level.pawn, 1);
    world.put_field(level.pawn, "Equipped", FieldValue::Object(Some(sword)));
    world.put_field(level.pawn, "Health", FieldValue::Float(42.5));
    world.put_field(chest, "Opened", FieldValue::Bool(true));
    world.put_field(
        chest,
        "Loot",
        FieldValue::Map(vec![(FieldValue::Int(1), FieldValue::Float(0.5))]),
    );
    spawn_lamp(&mut world, "Lamp_Saved", 0.8);

    let mut session = memory_session();
    session.request_save(&mut world, "slot1", false).unwrap();
    session.request_load(&mut world, "slot1").unwrap();
    let reloaded = activate(&mut world);
    spawn_lamp(&mut world, "Stray", 0.1);
    (session, world, reloaded)
}

fn live_objects(world: &MemoryWorld) -> Vec<(u64, MemoryObject)> {
    world.objects().map(|(id, o)| (id.0, o.clone())).collect()
}

fn restore_stepped(max_count: usize) -> (MemoryWorld, Vec<String>, usize) {
    let (mut session, mut world, _) = prepared();
    let mut status: Vec<String> = Vec::new();
    let mut pipeline = session.on_level_activated(&world).unwrap();
    let mut steps = 0;
    while !pipeline.is_done() {
        pipeline.step(&mut world, &mut status, max_count).unwrap();
        steps += 1;
        assert!(steps < 100, "restore does not terminate");
    }
    session.finish_restore(pipeline, &mut status);
    (world, status, steps)
}

fn restore_atomic() -> (MemoryWorld, Vec<String>) {
    let (mut session, mut world, _) = prepared();
    let mut status: Vec<String> = Vec::new();
    session.restore_now(&mut world, &mut status).unwrap().unwrap();
    (world, status)
}

#[test]
fn test_stepped_restore_matches_atomic() {
    let (atomic, _) = restore_atomic();
    for max_count in [1, 2] {
        let (stepped, _, _) = restore_stepped(max_count);
        assert_eq!(live_objects(&stepped), live_objects(&atomic), "max_count {max_count}");
        assert_eq!(stepped.hook_log, atomic.hook_log);
    }
}

#[test]
fn test_step_counts_follow_the_budget() {
    // 5 actor records, 2 object records, 6 single-step states.
    assert_eq!(restore_stepped(1).2, 13);
    assert_eq!(restore_stepped(2).2, 10);
    assert_eq!(restore_stepped(0).2, 8);
}

#[test]
fn test_status_texts_in_order() {
    let (_, status) = restore_atomic();
    let position = |text: &str| {
        status
            .iter()
            .position(|s| s == text)
            .unwrap_or_else(|| panic!("missing status {text}: {status:?}"))
    };
    let order = [
        "Starting restore...",
        "Restoring basic objects...",
        "Destroying old actors...",
        "Respawning actors...",
        "Recreating dynamic objects...",
        "Restoring actor data...",
        "Restoring actor 100%",
        "Restoring custom objects...",
        "Restoring custom object 100%",
        "Calling restore on objects...",
        "Finishing restoration...",
    ];
    for pair in order.windows(2) {
        assert!(position(pair[0]) < position(pair[1]), "{} before {}", pair[0], pair[1]);
    }
    assert!(status.iter().any(|s| s == "Restoring actor 20%"));
    assert!(!status.iter().any(|s| s == "Handling level change..."));
}

#[test]
fn test_restored_world_matches_saved_state() {
    let (mut session, mut world, level) = prepared();
    let report = restore(&mut session, &mut world);
    assert_eq!(report.level, FOREST);
    assert!(!report.level_change);
    assert_eq!(report.handoff_actor, None);

    assert!((float(&world, level.pawn, "Health") - 42.5).abs() < 1e-9);
    let chest = level.chest.unwrap();
    assert_eq!(world.field(chest, "Opened"), Some(&FieldValue::Bool(true)));
    assert_eq!(
        world.field(chest, "Loot"),
        Some(&FieldValue::Map(vec![(FieldValue::Int(1), FieldValue::Float(0.5))]))
    );

    // The equipped item was recreated under the new pawn and rewired.
    let sword = object_ref(&world, level.pawn, "Equipped").unwrap();
    assert_eq!(world.outer_of(sword), Some(level.pawn));
    assert_eq!(int(&world, sword, "Count"), 1);

    // The saved lamp was respawned; the stray one was destroyed.
    let lamps: Vec<_> = world
        .actors_of_class("Lamp")
        .into_iter()
        .filter(|id| world.is_valid(*id))
        .collect();
    assert_eq!(lamps.len(), 1);
    let lamp = lamps[0];
    assert_ne!(world.name_of(lamp), "Stray");
    assert!((float(&world, lamp, "Brightness") - 0.8).abs() < 1e-9);
    assert!(world
        .actor_transform(lamp)
        .approx_eq(&SavedTransform::from_translation(3.0, 4.0, 5.0), 1e-6));
    assert!(world.find_named("Stray").is_none());

    assert!(world.hook_log.iter().any(|l| l == "pre_restore Chest_1"));
    assert!(world.hook_log.iter().any(|l| l == "on_restore Chest_1"));
    assert!(world.hook_log.iter().any(|l| l == "on_restore Hero"));
    assert!(!session.is_loading());
    assert!(!session.is_restoring());
}

#[test]
fn test_finish_drops_records_the_next_save_regenerates() {
    let (mut session, mut world, _) = prepared();
    restore(&mut session, &mut world);
    let carried = session.snapshot().unwrap();
    assert!(carried.level(FOREST).is_none());
    assert!(carried.global_actors.is_empty());
    assert!(carried.global_objects.is_empty());
}

#[test]
fn test_missing_level_record_aborts_and_keeps_snapshot() {
    let (mut world, _) = new_world(FOREST);
    let mut session = memory_session();
    session.request_save(&mut world, "slot1", false).unwrap();
    session.request_load(&mut world, "slot1").unwrap();
    world.open_level(EAST);
    activate(&mut world);

    let err = session.restore_now(&mut world, &mut NullStatus).unwrap_err();
    assert!(matches!(err, SaveError::LevelDataMissing(ref level) if level == EAST));
    assert!(session.snapshot().is_some());
    assert!(!session.is_restoring());
}

/// A snapshot saved in Forest, and the world reloaded into Forest.
fn saved_snapshot(setup: impl FnOnce(&mut MemoryWorld, &Level)) -> (Snapshot, MemoryWorld, Level) {
    let (mut world, level) = new_world(FOREST);
    setup(&mut world, &level);
    let mut session = memory_session();
    session.request_save(&mut world, "slot1", false).unwrap();
    let snapshot = session.snapshot().cloned().unwrap();
    world.open_level(FOREST);
    let reloaded = activate(&mut world);
    (snapshot, world, reloaded)
}

#[test]
fn test_dynamic_object_without_outer_is_fatal() {
    let (mut snapshot, mut world, _) = saved_snapshot(|world, level| {
        let sword = add_item(world, level.pawn, 1);
        world.put_field(level.pawn, "Equipped", FieldValue::Object(Some(sword)));
    });
    for object in snapshot.global_objects.iter_mut().filter(|o| o.class == "Item") {
        object.outer_object_index = None;
    }

    let mut pipeline = RestorePipeline::new(snapshot, RestoreOptions::default());
    let err = pipeline.run_atomic(&mut world, &mut NullStatus).unwrap_err();
    match err {
        SaveError::UnresolvedOuter { name, class } => {
            assert_eq!(name, "Item_1");
            assert_eq!(class, "Item");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(pipeline.state(), RestoreState::RecreateAllObjects);
}

#[test]
fn test_placed_actor_missing_from_level_is_fatal() {
    let (snapshot, mut world, reloaded) = saved_snapshot(|_, _| {});
    world.destroy_actor(reloaded.chest.unwrap());

    let mut pipeline = RestorePipeline::new(snapshot, RestoreOptions::default());
    let err = pipeline.run_atomic(&mut world, &mut NullStatus).unwrap_err();
    assert!(matches!(err, SaveError::ActorNotFound { ref name } if name == "Chest_1"));
}

#[test]
fn test_gathered_classes_cover_globals_then_level() {
    let (snapshot, _, _) = saved_snapshot(|world, _| {
        spawn_lamp(world, "Lamp_Saved", 1.0);
    });
    let mut pipeline = RestorePipeline::new(snapshot, RestoreOptions::default());
    let classes = pipeline.gather_classes_to_load().to_vec();
    assert_eq!(
        classes,
        vec!["Controller", "Scene", "Pawn", "Backpack", "GameStateActor", "Session", "Chest", "Lamp"]
    );
}

#[test]
fn test_recapture_reports_edits_since_save() {
    let config = SaveConfig {
        clean_up_after_save: false,
        ..Default::default()
    };
    let mut session = SaveSession::new(config, Box::new(MemoryStore::new(false)));
    let (mut world, level) = new_world(FOREST);
    assert!(matches!(session.debug_compare(&mut world, false), Err(SaveError::NoData)));

    session.request_save(&mut world, "slot1", false).unwrap();
    assert!(session.last_registry().is_some());
    assert_eq!(session.debug_compare(&mut world, false).unwrap(), Vec::new());

    world.put_field(level.chest.unwrap(), "Opened", FieldValue::Bool(true));
    let mismatches = session.debug_compare(&mut world, false).unwrap();
    assert_eq!(
        mismatches,
        vec![SnapshotMismatch::ValueMismatch {
            object: "tag \"None\" name \"Chest_1\" class \"Chest\"".to_string(),
            property: "Opened".to_string(),
            expected: "False".to_string(),
            found: "True".to_string(),
        }]
    );
}
