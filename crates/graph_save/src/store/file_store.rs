use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;

use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_helpers::parse_save_filename;
use crate::save_types::Snapshot;

use super::atomic_write::atomic_write;
use super::{decode_snapshot, encode_snapshot, SaveStore};

const EXTENSION: &str = "sav";

/// One `<dir>/<slot>.sav` file per slot.
pub struct FileStore {
    dir: PathBuf,
    compress: bool,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    /// Store under `config.save_dir`, compressing when `config.compress` is set.
    pub fn from_config(config: &SaveConfig) -> Self {
        Self::new(&config.save_dir, config.compress)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of a slot. Slot names are sanitised first.
    pub fn slot_path(&self, slot: &str) -> Result<PathBuf, SaveError> {
        let clean = parse_save_filename(slot);
        if clean.is_empty() {
            return Err(SaveError::InvalidSlotName(slot.to_string()));
        }
        Ok(self.dir.join(format!("{clean}.{EXTENSION}")))
    }

    /// Delete `.tmp` files left by interrupted writes. Returns how many
    /// were removed.
    pub fn recover_tmp_files(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut cleaned = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        info!("Removed interrupted save artifact {}", path.display());
                        cleaned += 1;
                    }
                    Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }
        cleaned
    }
}

impl SaveStore for FileStore {
    fn save(&mut self, slot: &str, snapshot: &Snapshot) -> Result<(), SaveError> {
        let path = self.slot_path(slot)?;
        let bytes = encode_snapshot(snapshot, self.compress);
        atomic_write(&path, &bytes)?;
        info!("Saved slot {} ({} bytes)", slot, bytes.len());
        Ok(())
    }

    fn load(&self, slot: &str) -> Result<Option<Snapshot>, SaveError> {
        let path = self.slot_path(slot)?;
        match fs::read(&path) {
            Ok(bytes) => decode_snapshot(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, slot: &str) -> bool {
        self.slot_path(slot).is_ok_and(|p| p.exists())
    }

    fn delete(&mut self, slot: &str) -> Result<bool, SaveError> {
        let path = self.slot_path(slot)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn copy(&mut self, from: &str, to: &str) -> Result<(), SaveError> {
        let source = self.slot_path(from)?;
        let target = self.slot_path(to)?;
        let bytes = match fs::read(&source) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(SaveError::NoData),
            Err(e) => return Err(e.into()),
        };
        atomic_write(&target, &bytes)?;
        Ok(())
    }

    fn list_slots(&self) -> Result<Vec<String>, SaveError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut slots: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        slots.sort();
        Ok(slots)
    }
}
