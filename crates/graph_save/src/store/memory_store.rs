use std::collections::BTreeMap;

use crate::save_error::SaveError;
use crate::save_types::Snapshot;

use super::{decode_snapshot, encode_snapshot, SaveStore};

/// Slots kept as encoded bytes in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<String, Vec<u8>>,
    compress: bool,
}

impl MemoryStore {
    pub fn new(compress: bool) -> Self {
        Self {
            slots: BTreeMap::new(),
            compress,
        }
    }

    /// Raw stored bytes of a slot.
    pub fn bytes(&self, slot: &str) -> Option<&[u8]> {
        self.slots.get(slot).map(Vec::as_slice)
    }

    /// Overwrite a slot's raw bytes (corruption tests).
    pub fn put_bytes(&mut self, slot: &str, bytes: Vec<u8>) {
        self.slots.insert(slot.to_string(), bytes);
    }
}

impl SaveStore for MemoryStore {
    fn save(&mut self, slot: &str, snapshot: &Snapshot) -> Result<(), SaveError> {
        if slot.is_empty() {
            return Err(SaveError::InvalidSlotName(slot.to_string()));
        }
        self.slots
            .insert(slot.to_string(), encode_snapshot(snapshot, self.compress));
        Ok(())
    }

    fn load(&self, slot: &str) -> Result<Option<Snapshot>, SaveError> {
        self.slots
            .get(slot)
            .map(|bytes| decode_snapshot(bytes))
            .transpose()
    }

    fn exists(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    fn delete(&mut self, slot: &str) -> Result<bool, SaveError> {
        Ok(self.slots.remove(slot).is_some())
    }

    fn copy(&mut self, from: &str, to: &str) -> Result<(), SaveError> {
        let bytes = self.slots.get(from).cloned().ok_or(SaveError::NoData)?;
        self.slots.insert(to.to_string(), bytes);
        Ok(())
    }

    fn list_slots(&self) -> Result<Vec<String>, SaveError> {
        Ok(self.slots.keys().cloned().collect())
    }
}
