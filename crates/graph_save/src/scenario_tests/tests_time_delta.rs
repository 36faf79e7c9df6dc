use super::fixtures::*;
use crate::host_world::HostWorld;
use crate::reflect::FieldValue;

/// Save in Forest at `saved_at`, reload and restore at `restored_at`.
fn save_and_restore(last_hit: f64, saved_at: f64, restored_at: f64) -> (f64, f64) {
    let (mut world, level) = new_world(FOREST);
    let mut session = memory_session();
    world.set_elapsed(saved_at);
    world.put_field(level.pawn, "LastHit", FieldValue::Time(last_hit));
    session.request_save(&mut world, "slot1", false).unwrap();

    session.request_load(&mut world, "slot1").unwrap();
    let reloaded = activate(&mut world);
    world.set_elapsed(restored_at);
    restore(&mut session, &mut world);
    let play_time = session.play_time(&world);
    (float(&world, reloaded.pawn, "LastHit"), play_time)
}

#[test]
fn test_time_field_shifts_by_clock_difference() {
    let (last_hit, _) = save_and_restore(50.0, 60.0, 5.0);
    assert!((last_hit - -5.0).abs() < 1e-9, "{last_hit}");
}

#[test]
fn test_unset_time_stays_unset() {
    let (last_hit, _) = save_and_restore(0.0, 60.0, 5.0);
    assert_eq!(last_hit, 0.0);
}

#[test]
fn test_play_time_continues_from_save() {
    let (_, play_time) = save_and_restore(10.0, 60.0, 5.0);
    assert!((play_time - 60.0).abs() < 1e-9, "{play_time}");
}

#[test]
fn test_new_game_starts_a_fresh_clock() {
    let (mut world, _) = new_world(FOREST);
    let mut session = memory_session();
    world.set_elapsed(40.0);
    session.start_new_game(&mut world, EAST).unwrap();
    assert_eq!(world.pending_level(), Some(EAST));

    activate(&mut world);
    world.advance(12.0);
    assert!(session.on_level_activated(&world).is_none());
    world.advance(3.0);
    assert!((session.play_time(&world) - 3.0).abs() < 1e-9);
    assert!(world.current_level_name().ends_with(EAST));
}
