use super::fixtures::*;
use crate::debug_compare::find_first_reference_to;
use crate::host_world::{HostWorld, ObjectId, SaveTraits, TAG_DONT_SAVE, TAG_FORCE_SAVE};
use crate::memory_world::MemoryWorld;
use crate::object_index::ObjectIndexRegistry;
use crate::property_codec::RefToken;
use crate::reflect::FieldValue;
use crate::save_error::SaveError;
use crate::save_stages::{build_snapshot, BuildRequest};
use crate::save_types::{ActorSaveData, Snapshot};

fn build(world: &mut MemoryWorld) -> (Snapshot, ObjectIndexRegistry) {
    let output = build_snapshot(
        world,
        BuildRequest {
            save_time: 12.0,
            timestamp: 1_700_000_000,
            retain_registry: true,
            ..Default::default()
        },
    )
    .unwrap();
    (output.snapshot, output.registry.unwrap())
}

fn global_actor<'a>(snapshot: &'a Snapshot, tag: &str) -> &'a ActorSaveData {
    snapshot
        .global_actor_with_tag(tag)
        .unwrap_or_else(|| panic!("no global actor tagged {tag}"))
}

fn local_actor<'a>(snapshot: &'a Snapshot, name: &str) -> &'a ActorSaveData {
    snapshot
        .level(FOREST)
        .and_then(|l| l.actors.iter().find(|a| a.custom.name == name))
        .unwrap_or_else(|| panic!("no local actor {name}"))
}

fn component_names(actor: &ActorSaveData) -> Vec<&str> {
    actor.components.iter().map(|c| c.custom.name.as_str()).collect()
}

fn component(world: &MemoryWorld, actor: ObjectId, name: &str) -> ObjectId {
    world.find_component(actor, name).unwrap()
}

#[test]
fn test_roots_are_global_and_tagged() {
    let (mut world, level) = new_world(FOREST);
    let (snapshot, registry) = build(&mut world);

    assert_eq!(snapshot.current_level, FOREST);
    assert_eq!(snapshot.save_time, 12.0);
    assert_eq!(snapshot.timestamp, 1_700_000_000);

    let session = snapshot.global_object_with_tag("GameInstance").unwrap();
    assert_eq!(registry.resolve(session.object_index, true), Some(level.session));

    for (tag, live) in [
        ("PlayerController", level.controller),
        ("PlayerPawn", level.pawn),
        ("GameState", level.game_state),
    ] {
        let record = global_actor(&snapshot, tag);
        assert_eq!(registry.resolve(record.custom.object_index, true), Some(live));
    }

    let pawn = global_actor(&snapshot, "PlayerPawn");
    assert_eq!(component_names(pawn), vec!["Root", "Pack", "Hand"]);
    let tags: Vec<_> = pawn.components.iter().filter_map(|c| c.custom.tag.as_deref()).collect();
    assert_eq!(tags, vec!["PlayerPawn.Root", "PlayerPawn.Pack", "PlayerPawn.Hand"]);
    assert!(pawn.transform.approx_eq(&world.actor_transform(level.pawn), 1e-6));

    let chest = local_actor(&snapshot, "Chest_1");
    assert_eq!(component_names(chest), vec!["Root", "Lid"]);
    assert!(chest.custom.tag.is_none());
    assert!(chest.components.iter().all(|c| c.custom.tag.is_none()));
    assert_eq!(
        registry.find(level.chest.unwrap()).map(|at| at.global),
        Some(false)
    );

    // The door has no save capability.
    assert!(!registry.contains(level.door));
}

#[test]
fn test_component_tags_override_category() {
    let (mut world, level) = new_world(FOREST);
    let body = component(&world, level.pawn, "Body");
    let pack = component(&world, level.pawn, "Pack");
    world.object_mut(body).unwrap().tags.push(TAG_FORCE_SAVE.to_string());
    world.object_mut(pack).unwrap().tags.push(TAG_DONT_SAVE.to_string());

    let (snapshot, _) = build(&mut world);
    let pawn = global_actor(&snapshot, "PlayerPawn");
    assert_eq!(component_names(pawn), vec!["Root", "Body", "Hand"]);
}

#[test]
fn test_dynamic_objects_follow_their_outer() {
    let (mut world, level) = new_world(FOREST);
    let chest = level.chest.unwrap();
    let sword = add_item(&mut world, level.pawn, 1);
    let key = add_item(&mut world, chest, 2);
    world.put_field(level.pawn, "Equipped", FieldValue::Object(Some(sword)));
    world.put_field(chest, "Key", FieldValue::Object(Some(key)));

    let (snapshot, registry) = build(&mut world);
    let pawn_at = registry.find(level.pawn).unwrap();
    let chest_at = registry.find(chest).unwrap();
    let sword_at = registry.find(sword).unwrap();
    let key_at = registry.find(key).unwrap();
    assert!(sword_at.global);
    assert!(!key_at.global);

    let sword_record = snapshot
        .global_objects
        .iter()
        .find(|o| o.object_index == sword_at.index)
        .unwrap();
    assert_eq!(sword_record.class, "Item");
    assert_eq!(sword_record.outer_object_index, Some(pawn_at.index));
    assert!(sword_record.outer_is_global);
    assert_eq!(sword_record.properties.singles.get("Count").map(String::as_str), Some("1"));

    let forest = snapshot.level(FOREST).unwrap();
    let key_record = forest
        .custom_objects
        .iter()
        .find(|o| o.object_index == key_at.index)
        .unwrap();
    assert_eq!(key_record.outer_object_index, Some(chest_at.index));
    assert!(!key_record.outer_is_global);

    let pawn = global_actor(&snapshot, "PlayerPawn");
    assert_eq!(
        pawn.custom.properties.singles.get("Equipped"),
        Some(&RefToken::Global(sword_at.index).to_string())
    );
    let chest_record = local_actor(&snapshot, "Chest_1");
    assert_eq!(
        chest_record.custom.properties.singles.get("Key"),
        Some(&format!("!{FOREST}:{}", key_at.index))
    );
}

#[test]
fn test_reference_cycle_saves_each_object_once() {
    let (mut world, level) = new_world(FOREST);
    let a = add_item(&mut world, level.session, 10);
    let b = add_item(&mut world, level.session, 20);
    world.put_field(a, "Contents", FieldValue::Object(Some(b)));
    world.put_field(b, "Contents", FieldValue::Object(Some(a)));
    world.put_field(
        level.pawn,
        "Inventory",
        FieldValue::Array(vec![FieldValue::Object(Some(a)), FieldValue::Object(Some(b))]),
    );

    let (snapshot, registry) = build(&mut world);
    let items: Vec<_> = snapshot.global_objects.iter().filter(|o| o.class == "Item").collect();
    assert_eq!(items.len(), 2);

    let a_at = registry.find(a).unwrap();
    let b_at = registry.find(b).unwrap();
    let a_record = items.iter().find(|o| o.object_index == a_at.index).unwrap();
    assert_eq!(
        a_record.properties.singles.get("Contents"),
        Some(&RefToken::Global(b_at.index).to_string())
    );
    let pawn = global_actor(&snapshot, "PlayerPawn");
    assert_eq!(pawn.custom.properties.arrays["Inventory"].len(), 2);
}

#[test]
fn test_every_record_index_resolves_to_its_object() {
    let (mut world, level) = new_world(FOREST);
    let sword = add_item(&mut world, level.pawn, 1);
    world.put_field(level.pawn, "Equipped", FieldValue::Object(Some(sword)));
    let (snapshot, registry) = build(&mut world);

    let mut seen = 0;
    let levels = snapshot.levels.iter().map(|l| (false, &l.actors, &l.custom_objects));
    for (global, actors, objects) in std::iter::once((true, &snapshot.global_actors, &snapshot.global_objects)).chain(levels) {
        for actor in actors {
            let live = registry.resolve(actor.custom.object_index, global).unwrap();
            assert_eq!(world.name_of(live), actor.custom.name);
            for c in &actor.components {
                let live = registry.resolve(c.custom.object_index, global).unwrap();
                assert_eq!(world.name_of(live), c.custom.name);
                seen += 1;
            }
            seen += 1;
        }
        for object in objects {
            let live = registry.resolve(object.object_index, global).unwrap();
            assert_eq!(world.name_of(live), object.name);
            seen += 1;
        }
    }
    assert_eq!(seen, registry.len(true) + registry.len(false));

    // Same world, same snapshot.
    let (again, _) = build(&mut world);
    assert_eq!(again, snapshot);
}

#[test]
fn test_blocked_actor_refuses_the_save() {
    let (mut world, level) = new_world(FOREST);
    world.set_traits(
        level.chest.unwrap(),
        SaveTraits {
            block_saving: true,
            block_reason: "Looting".to_string(),
            ..Default::default()
        },
    );
    let mut session = memory_session();
    assert!(!session.can_save(&world));
    let err = session.request_save(&mut world, "slot1", false).unwrap_err();
    match err {
        SaveError::SaveBlocked { actor, reason } => {
            assert_eq!(actor, "Chest_1");
            assert_eq!(reason, "Looting");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(session.snapshot().is_none());
    assert!(!session.store().exists("slot1"));
}

#[test]
fn test_missing_avatar_refuses_the_save() {
    let (mut world, level) = new_world(FOREST);
    world.destroy_actor(level.pawn);
    let result = build_snapshot(&mut world, BuildRequest::default());
    assert!(matches!(result, Err(SaveError::MissingCollaborator("avatar"))));
}

#[test]
fn test_asset_references_are_paths_and_preloaded() {
    let (mut world, level) = new_world(FOREST);
    let rules = world.find_by_path(CONFIG_PATH).unwrap();
    let loot_table = world.add_asset("GameConfig", "/Game/Data/DA_Loot.DA_Loot");
    world.put_field(level.session, "Rules", FieldValue::Object(Some(rules)));
    world.put_field(
        level.session,
        "Portrait",
        FieldValue::SoftObject("/Game/UI/T_Hero.T_Hero".to_string()),
    );
    world.object_mut(level.chest.unwrap()).unwrap().custom_assets.push(loot_table);

    let (snapshot, registry) = build(&mut world);
    // Actors are captured before plain objects.
    assert_eq!(
        snapshot.assets_to_load,
        vec!["/Game/Data/DA_Loot.DA_Loot".to_string(), CONFIG_PATH.to_string()]
    );
    assert!(!registry.contains(rules));

    let session = snapshot.global_object_with_tag("GameInstance").unwrap();
    assert_eq!(session.properties.singles["Rules"], CONFIG_PATH);
    assert_eq!(
        session.properties.singles["Portrait"],
        "![SoftObject]:/Game/UI/T_Hero.T_Hero"
    );
    assert_eq!(session.properties.singles["Difficulty"], "Easy");
}

#[test]
fn test_attached_child_of_tagged_actor_is_global() {
    let (mut world, level) = new_world(FOREST);
    let torch = spawn_lamp(&mut world, "Torch_A", 0.75);
    let hand = component(&world, level.pawn, "Hand");
    world.attach_to_component(torch, hand, Some("Grip"));
    world.object_mut(torch).unwrap().attached_tag = Some("Torch".to_string());

    let (snapshot, registry) = build(&mut world);
    let torch_record = global_actor(&snapshot, "PlayerPawn.Torch");
    assert!(torch_record.custom.recreate);
    assert_eq!(torch_record.attach_socket.as_deref(), Some("Grip"));
    let hand_at = registry.find(hand).unwrap();
    assert_eq!(torch_record.custom.outer_object_index, Some(hand_at.index));
    assert!(torch_record.custom.outer_is_global);
    assert!(torch_record.components.iter().all(|c| c.custom.tag.as_deref() == Some("PlayerPawn.Torch.Root")));
    assert!(snapshot.level(FOREST).unwrap().actors.iter().all(|a| a.custom.name != "Torch_A"));
}

#[test]
fn test_find_first_reference_names_the_referrer() {
    let (mut world, level) = new_world(FOREST);
    let chest = level.chest.unwrap();
    let key = add_item(&mut world, chest, 2);
    world.put_field(chest, "Key", FieldValue::Object(Some(key)));
    let pack = component(&world, level.pawn, "Pack");
    world.put_field(pack, "Slots", FieldValue::Int(777));

    let (snapshot, registry) = build(&mut world);
    let chest_at = registry.find(chest).unwrap();
    let key_at = registry.find(key).unwrap();
    let token = format!("!{FOREST}:{}", key_at.index);
    assert_eq!(
        find_first_reference_to(&snapshot, &token),
        Some(format!("!{FOREST}:{}", chest_at.index))
    );

    let pawn_at = registry.find(level.pawn).unwrap();
    let pack_at = registry.find(pack).unwrap();
    assert_eq!(
        find_first_reference_to(&snapshot, "777"),
        Some(format!("![Global]:{} - ![Global]:{}", pawn_at.index, pack_at.index))
    );
    assert_eq!(find_first_reference_to(&snapshot, "![Global]:999"), None);
}
