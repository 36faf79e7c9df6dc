use bevy::prelude::*;

/// Tunables for save, load and restore.
///
/// Held by `SaveSession`. `GraphSavePlugin` inserts a copy of the session's
/// config as a resource.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SaveConfig {
    /// Transient slot written when changing levels.
    pub level_change_slot: String,
    /// Autosaves go to `"<prefix>_<levelName>"`.
    pub autosave_prefix: String,
    /// Actors (and dynamic objects) restored per incremental step.
    pub restore_actors_per_tick: usize,
    /// Per-actor restore time above which a warning is logged.
    pub slow_actor_restore_secs: f32,
    /// Spread restore across ticks instead of restoring in one call.
    pub use_incremental_restore: bool,
    /// LZ4-compress the snapshot payload on disk.
    pub compress: bool,
    /// Slot directory for `FileStore::from_config`.
    pub save_dir: String,
    /// Drop the index lists once a save is assembled.
    pub clean_up_after_save: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            level_change_slot: "LevelChange".to_string(),
            autosave_prefix: "Autosave".to_string(),
            restore_actors_per_tick: 3,
            slow_actor_restore_secs: 0.5,
            use_incremental_restore: true,
            compress: true,
            save_dir: "saves".to_string(),
            clean_up_after_save: true,
        }
    }
}
