// ---------------------------------------------------------------------------
// Snapshot: the root serializable aggregate
// ---------------------------------------------------------------------------

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::records::{ActorSaveData, CustomSaveData};
use super::version::CURRENT_SNAPSHOT_VERSION;

/// Local records of one level.
#[derive(Serialize, Deserialize, Encode, Decode, Default, Clone, Debug, PartialEq)]
pub struct LevelRecord {
    pub level_name: String,
    pub actors: Vec<ActorSaveData>,
    pub custom_objects: Vec<CustomSaveData>,
    /// Session play time when this level was last saved.
    pub save_time: f64,
}

impl LevelRecord {
    pub fn new(level_name: impl Into<String>) -> Self {
        Self {
            level_name: level_name.into(),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Snapshot layout version.
    #[serde(default)]
    pub version: u32,
    /// Unix seconds at save.
    pub timestamp: u64,
    /// Session play time at save.
    pub save_time: f64,
    /// Level that was active at save; a load opens this level.
    pub current_level: String,
    /// At most one record per level name.
    pub levels: Vec<LevelRecord>,
    pub global_actors: Vec<ActorSaveData>,
    pub global_objects: Vec<CustomSaveData>,
    /// Asset paths to preload before restoring.
    pub assets_to_load: Vec<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            timestamp: 0,
            save_time: 0.0,
            current_level: String::new(),
            levels: Vec::new(),
            global_actors: Vec::new(),
            global_objects: Vec::new(),
            assets_to_load: Vec::new(),
        }
    }
}

impl Snapshot {
    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }

    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.level_name == level)
    }

    pub fn level(&self, level: &str) -> Option<&LevelRecord> {
        self.levels.iter().find(|l| l.level_name == level)
    }

    /// Existing record for `level`, emptied, or a new one appended.
    pub fn reset_level(&mut self, level: &str) -> &mut LevelRecord {
        let index = match self.level_index(level) {
            Some(i) => {
                let record = &mut self.levels[i];
                record.actors.clear();
                record.custom_objects.clear();
                i
            }
            None => {
                self.levels.push(LevelRecord::new(level));
                self.levels.len() - 1
            }
        };
        &mut self.levels[index]
    }

    /// Remove one level's record. Returns false when there was none.
    pub fn clear_level_data(&mut self, level: &str) -> bool {
        match self.level_index(level) {
            Some(i) => {
                self.levels.remove(i);
                true
            }
            None => false,
        }
    }

    /// Drop `level` and every global record; the next save regenerates them.
    pub fn clear_current_level_and_global_data(&mut self, level: &str) {
        self.clear_level_data(level);
        self.global_actors.clear();
        self.global_objects.clear();
    }

    pub fn global_actor_with_tag(&self, tag: &str) -> Option<&ActorSaveData> {
        self.global_actors.iter().find(|a| a.custom.has_tag(tag))
    }

    pub fn global_object_with_tag(&self, tag: &str) -> Option<&CustomSaveData> {
        self.global_objects.iter().find(|o| o.has_tag(tag))
    }

    pub fn add_asset(&mut self, path: String) {
        if !self.assets_to_load.contains(&path) {
            self.assets_to_load.push(path);
        }
    }
}
