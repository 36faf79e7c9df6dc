// ---------------------------------------------------------------------------
// Debug Compare: locate references and diff two captures of the same world
// ---------------------------------------------------------------------------
//
// Records of two snapshots are paired through the live objects behind them:
// expected index -> expected registry -> ObjectId -> actual registry ->
// actual index. Snapshots built without a retained registry cannot be
// compared.

use std::collections::BTreeMap;
use std::fmt;

use bevy::prelude::*;

use crate::host_world::HostWorld;
use crate::object_index::ObjectIndexRegistry;
use crate::property_codec::{RefToken, GLOBAL_PREFIX};
use crate::save_error::SaveError;
use crate::save_stages::{build_snapshot, BuildRequest};
use crate::save_types::{ActorSaveData, CustomSaveData, PropertyMaps, Snapshot};

/// One difference between an expected and an actual capture.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotMismatch {
    /// No actual record for the live object behind an expected record.
    MissingRecord { object: String },
    /// The expected record has a property the actual one lacks.
    MissingProperty { object: String, property: String },
    ValueMismatch {
        object: String,
        property: String,
        expected: String,
        found: String,
    },
    /// Array length or map entry count differs.
    SizeMismatch {
        object: String,
        property: String,
        expected: usize,
        found: usize,
    },
    MissingLevel(String),
}

impl fmt::Display for SnapshotMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotMismatch::MissingRecord { object } => {
                write!(f, "{object}: not found in current object list")
            }
            SnapshotMismatch::MissingProperty { object, property } => {
                write!(f, "{object}: property \"{property}\" not found")
            }
            SnapshotMismatch::ValueMismatch {
                object,
                property,
                expected,
                found,
            } => write!(
                f,
                "{object}: property \"{property}\" is \"{found}\", was \"{expected}\""
            ),
            SnapshotMismatch::SizeMismatch {
                object,
                property,
                expected,
                found,
            } => write!(
                f,
                "{object}: property \"{property}\" has {found} entries, had {expected}"
            ),
            SnapshotMismatch::MissingLevel(level) => write!(f, "no data for level \"{level}\""),
        }
    }
}

// ---------------------------------------------------------------------------
// Reference search
// ---------------------------------------------------------------------------

/// Name the first record whose properties contain `token` exactly, as
/// `"<prefix><index>"`, with `" - <prefix><index>"` appended for a component.
pub fn find_first_reference_to(snapshot: &Snapshot, token: &str) -> Option<String> {
    let global = |index: u32| format!("{GLOBAL_PREFIX}{index}");
    if let Some(found) = search_actors(&snapshot.global_actors, token, &global) {
        return Some(found);
    }
    if let Some(object) = snapshot.global_objects.iter().find(|o| o.properties.contains_text(token)) {
        return Some(global(object.object_index));
    }

    for level in &snapshot.levels {
        let prefix = RefToken::local_prefix(&level.level_name);
        let local = |index: u32| format!("{prefix}{index}");
        if let Some(found) = search_actors(&level.actors, token, &local) {
            return Some(found);
        }
        if let Some(object) = level.custom_objects.iter().find(|o| o.properties.contains_text(token)) {
            return Some(local(object.object_index));
        }
    }
    None
}

fn search_actors(actors: &[ActorSaveData], token: &str, name: &dyn Fn(u32) -> String) -> Option<String> {
    for actor in actors {
        if actor.custom.properties.contains_text(token) {
            return Some(name(actor.custom.object_index));
        }
        for component in &actor.components {
            if component.custom.properties.contains_text(token) {
                return Some(format!(
                    "{} - {}",
                    name(actor.custom.object_index),
                    name(component.custom.object_index)
                ));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Snapshot comparison
// ---------------------------------------------------------------------------

/// Reference tokens match when their prefix matches; struct texts match when
/// both are structs.
pub fn properties_match(expected: &str, found: &str) -> bool {
    if expected.starts_with('!') && found.starts_with('!') {
        return match (expected.split_once(':'), found.split_once(':')) {
            (Some((a, _)), Some((b, _))) => a == b,
            _ => false,
        };
    }
    if expected.starts_with('(') && found.starts_with('(') {
        return true;
    }
    expected == found
}

/// Diff globals and `level` of two snapshots of the same live world.
pub fn compare_snapshots(
    expected: &Snapshot,
    expected_registry: &ObjectIndexRegistry,
    actual: &Snapshot,
    actual_registry: &ObjectIndexRegistry,
    level: &str,
) -> Vec<SnapshotMismatch> {
    let pairing = Pairing {
        expected: expected_registry,
        actual: actual_registry,
    };
    let mut out = Vec::new();

    pairing.compare_actors(&expected.global_actors, &actual.global_actors, true, &mut out);
    pairing.compare_objects(&expected.global_objects, &actual.global_objects, true, &mut out);

    match (expected.level(level), actual.level(level)) {
        (Some(old), Some(new)) => {
            pairing.compare_actors(&old.actors, &new.actors, false, &mut out);
            pairing.compare_objects(&old.custom_objects, &new.custom_objects, false, &mut out);
        }
        _ => out.push(SnapshotMismatch::MissingLevel(level.to_string())),
    }

    for mismatch in &out {
        warn!("Snapshot mismatch: {}", mismatch);
    }
    out
}

/// Capture the live world again without storing it and diff it against
/// `expected`, which must have been built with a retained registry.
pub fn recapture_and_compare(
    world: &mut dyn HostWorld,
    expected: &Snapshot,
    expected_registry: &ObjectIndexRegistry,
    multi_level: bool,
) -> Result<Vec<SnapshotMismatch>, SaveError> {
    let output = build_snapshot(
        world,
        BuildRequest {
            previous: None,
            multi_level,
            save_time: expected.save_time,
            timestamp: expected.timestamp,
            retain_registry: true,
        },
    )?;
    let registry = output.registry.unwrap_or_default();
    let level = output.snapshot.current_level.clone();
    Ok(compare_snapshots(
        expected,
        expected_registry,
        &output.snapshot,
        &registry,
        &level,
    ))
}

struct Pairing<'a> {
    expected: &'a ObjectIndexRegistry,
    actual: &'a ObjectIndexRegistry,
}

impl Pairing<'_> {
    /// Actual index of the live object behind an expected index.
    fn actual_index(&self, index: u32, global: bool) -> Option<u32> {
        let object = self.expected.resolve(index, global)?;
        self.actual
            .find(object)
            .filter(|at| at.global == global)
            .map(|at| at.index)
    }

    fn compare_actors(
        &self,
        expected: &[ActorSaveData],
        actual: &[ActorSaveData],
        global: bool,
        out: &mut Vec<SnapshotMismatch>,
    ) {
        for old in expected {
            let new = self
                .actual_index(old.custom.object_index, global)
                .and_then(|index| actual.iter().find(|a| a.custom.object_index == index));
            match new {
                Some(new) => compare_props(&old.custom, &new.custom.properties, out),
                None => out.push(SnapshotMismatch::MissingRecord {
                    object: describe(&old.custom),
                }),
            }
        }
    }

    fn compare_objects(
        &self,
        expected: &[CustomSaveData],
        actual: &[CustomSaveData],
        global: bool,
        out: &mut Vec<SnapshotMismatch>,
    ) {
        for old in expected {
            let new = self
                .actual_index(old.object_index, global)
                .and_then(|index| actual.iter().find(|o| o.object_index == index));
            match new {
                Some(new) => compare_props(old, &new.properties, out),
                None => out.push(SnapshotMismatch::MissingRecord {
                    object: describe(old),
                }),
            }
        }
    }
}

fn describe(record: &CustomSaveData) -> String {
    format!(
        "tag \"{}\" name \"{}\" class \"{}\"",
        record.tag.as_deref().unwrap_or("None"),
        record.name,
        record.class
    )
}

fn compare_props(old: &CustomSaveData, new: &PropertyMaps, out: &mut Vec<SnapshotMismatch>) {
    let object = describe(old);
    let value_mismatch = |property: String, expected: &str, found: &str| SnapshotMismatch::ValueMismatch {
        object: object.clone(),
        property,
        expected: expected.to_string(),
        found: found.to_string(),
    };

    for (name, expected) in &old.properties.singles {
        match new.singles.get(name) {
            None => out.push(SnapshotMismatch::MissingProperty {
                object: object.clone(),
                property: name.clone(),
            }),
            Some(found) if !properties_match(expected, found) => {
                out.push(value_mismatch(name.clone(), expected, found))
            }
            Some(_) => {}
        }
    }

    for (name, expected) in &old.properties.arrays {
        let Some(found) = new.arrays.get(name) else {
            out.push(SnapshotMismatch::MissingProperty {
                object: object.clone(),
                property: name.clone(),
            });
            continue;
        };
        if found.len() != expected.len() {
            out.push(SnapshotMismatch::SizeMismatch {
                object: object.clone(),
                property: name.clone(),
                expected: expected.len(),
                found: found.len(),
            });
            continue;
        }
        if let Some(i) = (0..expected.len()).find(|&i| !properties_match(&expected[i], &found[i])) {
            out.push(value_mismatch(format!("{name}[{i}]"), &expected[i], &found[i]));
        }
    }

    for (name, expected) in &old.properties.maps {
        let Some(found) = new.maps.get(name) else {
            out.push(SnapshotMismatch::MissingProperty {
                object: object.clone(),
                property: name.clone(),
            });
            continue;
        };
        if found.len() != expected.len() {
            out.push(SnapshotMismatch::SizeMismatch {
                object: object.clone(),
                property: name.clone(),
                expected: expected.len(),
                found: found.len(),
            });
            continue;
        }
        if let Some(mismatch) = first_map_mismatch(name, expected, found, &value_mismatch, &object) {
            out.push(mismatch);
        }
    }
}

fn first_map_mismatch(
    name: &str,
    expected: &BTreeMap<String, String>,
    found: &BTreeMap<String, String>,
    value_mismatch: &dyn Fn(String, &str, &str) -> SnapshotMismatch,
    object: &str,
) -> Option<SnapshotMismatch> {
    for (key, value) in expected {
        match found.get(key) {
            None => {
                return Some(SnapshotMismatch::MissingProperty {
                    object: object.to_string(),
                    property: format!("{name}[{key}]"),
                })
            }
            Some(new) if !properties_match(value, new) => {
                return Some(value_mismatch(format!("{name}[{key}]"), value, new))
            }
            Some(_) => {}
        }
    }
    None
}
