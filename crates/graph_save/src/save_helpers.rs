//! Slot-name and level-name helpers shared by the session and the stages.

use crate::host_world::HostWorld;

/// Turn free text into a slot name: `_` reads as a space, anything that is
/// not alphanumeric or a space is dropped, then spaces become `_`.
pub fn parse_save_filename(name: &str) -> String {
    name.replace('_', " ")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Short level name: the text after the last `.`, else after the last `/`.
pub fn strip_level_name(level: &str) -> &str {
    if let Some((_, tail)) = level.rsplit_once('.') {
        return tail;
    }
    match level.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => level,
    }
}

/// The host's current level, stripped to its short name.
pub fn current_level_name(world: &dyn HostWorld) -> String {
    strip_level_name(&world.current_level_name()).to_string()
}

/// `base`, or `base_1`, `base_2`, ... whichever is not taken yet.
/// Case-insensitive.
pub fn ensure_unique_saving_tag(base: &str, existing: &[String]) -> String {
    let taken = |candidate: &str| existing.iter().any(|e| e.eq_ignore_ascii_case(candidate));
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn autosave_slot_name(prefix: &str, level: &str) -> String {
    format!("{}_{}", prefix, strip_level_name(level))
}
