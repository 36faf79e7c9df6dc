// Size accounting: an estimate of the in-memory footprint of a record, used
// for diagnostics (slow-restore warnings, save summaries). It counts string
// bytes plus a 4-byte length prefix per string and per collection.

use super::{ActorSaveData, CustomSaveData, LevelRecord, PropertyMaps, Snapshot};

const LEN_PREFIX: usize = 4;
const TRANSFORM_BYTES: usize = std::mem::size_of::<[f32; 10]>();

fn string_bytes(s: &str) -> usize {
    s.len() + LEN_PREFIX
}

/// Estimated bytes of one set of encoded properties.
pub fn calculate_bytes(props: &PropertyMaps) -> usize {
    let mut total = LEN_PREFIX;
    for (key, value) in &props.singles {
        total += string_bytes(key) + string_bytes(value);
    }

    total += LEN_PREFIX;
    for (key, items) in &props.arrays {
        total += string_bytes(key) + LEN_PREFIX;
        total += items.iter().map(|s| string_bytes(s)).sum::<usize>();
    }

    total += LEN_PREFIX;
    for (key, entries) in &props.maps {
        total += string_bytes(key) + LEN_PREFIX;
        total += entries
            .iter()
            .map(|(k, v)| string_bytes(k) + string_bytes(v))
            .sum::<usize>();
    }
    total
}

pub fn actor_bytes(actor: &ActorSaveData) -> usize {
    let mut total = actor.attach_socket.as_deref().map_or(0, str::len);
    total += calculate_bytes(&actor.custom.properties);
    total += TRANSFORM_BYTES * 2;
    total += LEN_PREFIX;
    for component in &actor.components {
        total += TRANSFORM_BYTES + calculate_bytes(&component.custom.properties);
    }
    total
}

fn actors_bytes(actors: &[ActorSaveData]) -> usize {
    LEN_PREFIX + actors.iter().map(actor_bytes).sum::<usize>()
}

fn objects_bytes(objects: &[CustomSaveData]) -> usize {
    LEN_PREFIX
        + objects
            .iter()
            .map(|o| calculate_bytes(&o.properties))
            .sum::<usize>()
}

pub fn level_bytes(level: &LevelRecord) -> usize {
    actors_bytes(&level.actors)
        + objects_bytes(&level.custom_objects)
        + level.level_name.len()
        + std::mem::size_of::<f64>()
}

pub fn global_bytes(snapshot: &Snapshot) -> usize {
    actors_bytes(&snapshot.global_actors) + objects_bytes(&snapshot.global_objects)
}

pub fn total_bytes(snapshot: &Snapshot) -> usize {
    global_bytes(snapshot) + snapshot.levels.iter().map(level_bytes).sum::<usize>()
}

/// Split a byte count into (megabytes, kilobytes, bytes) remainders.
pub fn parse_bytes(total: usize) -> (usize, usize, usize) {
    let kilobytes = total / 1024;
    let bytes = total - kilobytes * 1024;
    let megabytes = kilobytes / 1024;
    let kilobytes = kilobytes - megabytes * 1024;
    (megabytes, kilobytes, bytes)
}

/// `"X.Y MB"`, `"X.Y KB"` or `"N bytes"`, with the fraction truncated.
pub fn size_string(total: usize) -> String {
    let (megabytes, kilobytes, bytes) = parse_bytes(total);
    if megabytes > 0 {
        format!("{megabytes}.{} MB", kilobytes * 10 / 1024)
    } else if kilobytes > 0 {
        format!("{kilobytes}.{} KB", bytes * 10 / 1024)
    } else {
        format!("{bytes} bytes")
    }
}

impl CustomSaveData {
    pub fn calculate_bytes(&self) -> usize {
        calculate_bytes(&self.properties)
    }

    pub fn get_size_string(&self) -> String {
        size_string(self.calculate_bytes())
    }
}
