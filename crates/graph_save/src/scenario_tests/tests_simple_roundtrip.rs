use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::fixtures::*;
use crate::custom_capture::{apply, capture, CaptureOptions};
use crate::host_world::{HostWorld, ObjectId};
use crate::memory_world::MemoryWorld;
use crate::property_codec::{DecodeContext, EncodeContext};
use crate::reflect::FieldValue;
use crate::save_types::PropertyMaps;

fn tuning_object(world: &mut MemoryWorld, owner: ObjectId) -> ObjectId {
    let tuning = world.add_object("Tuning", "Tuning_0", Some(owner));
    world.put_field(tuning, "Count", FieldValue::Int(42));
    world.put_field(tuning, "Ratio", FieldValue::Float(3.14));
    world.put_field(
        tuning,
        "Values",
        FieldValue::Array(vec![FieldValue::Int(1), FieldValue::Int(2), FieldValue::Int(3)]),
    );
    world.put_field(
        tuning,
        "Weights",
        FieldValue::Map(vec![
            (FieldValue::Int(5), FieldValue::Float(1.5)),
            (FieldValue::Int(7), FieldValue::Float(2.5)),
        ]),
    );
    tuning
}

fn randomize(world: &mut MemoryWorld, tuning: ObjectId, rng: &mut ChaCha8Rng) {
    world.put_field(tuning, "Count", FieldValue::Int(rng.gen_range(1000..2000)));
    world.put_field(tuning, "Ratio", FieldValue::Float(rng.gen_range(10.0..100.0)));
    let len = rng.gen_range(4..8);
    world.put_field(
        tuning,
        "Values",
        FieldValue::Array((0..len).map(|_| FieldValue::Int(rng.gen_range(-50..50))).collect()),
    );
    world.put_field(
        tuning,
        "Weights",
        FieldValue::Map(vec![(
            FieldValue::Int(rng.gen_range(100..200)),
            FieldValue::Float(rng.gen_range(0.0..1.0)),
        )]),
    );
    world.put_field(tuning, "Rules", FieldValue::Object(None));
}

fn map_value(value: &FieldValue, key: i64) -> Option<f64> {
    match value {
        FieldValue::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.as_int() == Some(key))
            .and_then(|(_, v)| v.as_float()),
        _ => None,
    }
}

#[test]
fn test_simple_fields_survive_capture_randomize_apply() {
    let (mut world, level) = new_world(FOREST);
    let tuning = tuning_object(&mut world, level.session);
    let opts = CaptureOptions::simple();

    let first = capture(&mut world, tuning, &opts, &mut EncodeContext::simple(0.0));

    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    randomize(&mut world, tuning, &mut rng);
    assert_ne!(int(&world, tuning, "Count"), 42);

    let report = apply(&mut world, tuning, &first, &DecodeContext::simple(0.0));
    assert_eq!(report.skipped, 0);

    assert_eq!(int(&world, tuning, "Count"), 42);
    assert!((float(&world, tuning, "Ratio") - 3.14).abs() < 1e-4);
    assert_eq!(
        world.field(tuning, "Values"),
        Some(&FieldValue::Array(vec![
            FieldValue::Int(1),
            FieldValue::Int(2),
            FieldValue::Int(3)
        ]))
    );
    let weights = world.field(tuning, "Weights").cloned().unwrap_or(FieldValue::Bool(false));
    assert!((map_value(&weights, 5).unwrap() - 1.5).abs() < 1e-4);
    assert!((map_value(&weights, 7).unwrap() - 2.5).abs() < 1e-4);
    assert!(matches!(weights, FieldValue::Map(ref e) if e.len() == 2));

    let second = capture(&mut world, tuning, &opts, &mut EncodeContext::simple(0.0));
    assert_eq!(first, second);
}

#[test]
fn test_simple_mode_skips_graph_references_but_keeps_data_assets() {
    let (mut world, level) = new_world(FOREST);
    let tuning = tuning_object(&mut world, level.session);
    let item = add_item(&mut world, level.session, 1);
    let rules = world.find_by_path(CONFIG_PATH).unwrap();
    world.put_field(tuning, "Target", FieldValue::Object(Some(item)));
    world.put_field(tuning, "Rules", FieldValue::Object(Some(rules)));

    let props = capture(
        &mut world,
        tuning,
        &CaptureOptions::simple(),
        &mut EncodeContext::simple(0.0),
    );
    assert!(!props.singles.contains_key("Target"));
    assert_eq!(props.singles.get("Rules").map(String::as_str), Some(CONFIG_PATH));

    world.put_field(tuning, "Rules", FieldValue::Object(None));
    apply(&mut world, tuning, &props, &DecodeContext::simple(0.0));
    assert_eq!(object_ref(&world, tuning, "Rules"), Some(rules));
}

#[test]
fn test_excluded_and_unknown_fields() {
    let (mut world, level) = new_world(FOREST);
    let tuning = tuning_object(&mut world, level.session);
    let opts = CaptureOptions {
        exclude: vec!["Ratio".to_string()],
        simple_only: true,
        ..Default::default()
    };
    let mut props = capture(&mut world, tuning, &opts, &mut EncodeContext::simple(0.0));
    assert!(!props.singles.contains_key("Ratio"));

    props.singles.insert("Ghost".to_string(), "1".to_string());
    props.singles.insert("Count".to_string(), "not a number".to_string());
    let report = apply(&mut world, tuning, &props, &DecodeContext::simple(0.0));
    assert_eq!(report.skipped, 2);
    assert_eq!(int(&world, tuning, "Count"), 42);
}

#[test]
fn test_fixed_array_needs_matching_length() {
    let (mut world, level) = new_world(FOREST);
    let tuning = tuning_object(&mut world, level.session);
    world.put_field(
        tuning,
        "Slots",
        FieldValue::Array(vec![FieldValue::Int(4), FieldValue::Int(5), FieldValue::Int(6)]),
    );

    let mut props = PropertyMaps::default();
    props
        .arrays
        .insert("Slots".to_string(), vec!["9".to_string(), "9".to_string()]);
    let report = apply(&mut world, tuning, &props, &DecodeContext::simple(0.0));
    assert_eq!(report.skipped, 1);
    assert_eq!(
        world.field(tuning, "Slots").and_then(FieldValue::as_array).map(<[FieldValue]>::len),
        Some(3)
    );

    props.arrays.insert(
        "Slots".to_string(),
        vec!["7".to_string(), "oops".to_string(), "9".to_string()],
    );
    apply(&mut world, tuning, &props, &DecodeContext::simple(0.0));
    assert_eq!(
        world.field(tuning, "Slots"),
        Some(&FieldValue::Array(vec![FieldValue::Int(7), FieldValue::Int(5), FieldValue::Int(9)]))
    );
}
