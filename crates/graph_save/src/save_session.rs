// ---------------------------------------------------------------------------
// SaveSession: request API over the assembler, the store and the restore
// ---------------------------------------------------------------------------
//
// The session owns the store and the snapshot being carried between levels.
// A load or level change only opens the target level; the restore itself
// starts when the host reports the level active (`on_level_activated`) and
// ends with `finish_restore`.
//
// ```text
//   request_save ----------> build_snapshot -> store.save
//   request_load ----------> store.load -> open_level
//   request_level_change --> pre_change_level -> build (multi-level)
//                            -> store.save(level_change_slot) -> open_level
//   on_level_activated ----> RestorePipeline (stepped or atomic)
//   finish_restore --------> drop current level + globals, clear flags
// ```

use bevy::prelude::*;

use crate::debug_compare::{recapture_and_compare, SnapshotMismatch};
use crate::host_world::{HostWorld, StatusSink};
use crate::object_index::ObjectIndexRegistry;
use crate::restore_pipeline::{RestoreOptions, RestorePipeline, RestoreReport};
use crate::save_config::SaveConfig;
use crate::save_error::SaveError;
use crate::save_helpers::{autosave_slot_name, current_level_name};
use crate::save_stages::{build_snapshot, check_save_blocked, BuildRequest};
use crate::save_types::Snapshot;
use crate::store::SaveStore;

#[derive(Resource)]
pub struct SaveSession {
    config: SaveConfig,
    store: Box<dyn SaveStore>,
    /// Snapshot carried across level changes and loads.
    snapshot: Option<Snapshot>,
    loading: bool,
    in_level_change: bool,
    /// A restore pipeline has been handed out and not finished.
    restoring: bool,
    position_tag: String,
    time_skip: f64,
    /// Play time = offset + host elapsed time.
    play_time_offset: f64,
    last_registry: Option<ObjectIndexRegistry>,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl SaveSession {
    pub fn new(config: SaveConfig, store: Box<dyn SaveStore>) -> Self {
        Self {
            config,
            store,
            snapshot: None,
            loading: false,
            in_level_change: false,
            restoring: false,
            position_tag: String::new(),
            time_skip: 0.0,
            play_time_offset: 0.0,
            last_registry: None,
        }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn SaveStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn SaveStore {
        self.store.as_mut()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn in_level_change(&self) -> bool {
        self.in_level_change
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn position_tag(&self) -> &str {
        &self.position_tag
    }

    /// Time skipped by level changes this session.
    pub fn time_skip(&self) -> f64 {
        self.time_skip
    }

    /// Index lists of the last save, kept when `clean_up_after_save` is off.
    pub fn last_registry(&self) -> Option<&ObjectIndexRegistry> {
        self.last_registry.as_ref()
    }

    /// Total session play time.
    pub fn play_time(&self, world: &dyn HostWorld) -> f64 {
        self.play_time_offset + world.elapsed_time()
    }

    pub fn can_save(&self, world: &dyn HostWorld) -> bool {
        !self.loading && !self.in_level_change && !self.restoring && check_save_blocked(world).is_ok()
    }

    fn ensure_idle(&self) -> Result<(), SaveError> {
        if self.restoring || self.loading {
            return Err(SaveError::Busy("a restore is in progress"));
        }
        if self.in_level_change {
            return Err(SaveError::Busy("a level change is in progress"));
        }
        Ok(())
    }

    /// Assemble a snapshot over the carried one and keep it as the new
    /// carried snapshot.
    fn build(&mut self, world: &mut dyn HostWorld, multi_level: bool) -> Result<(), SaveError> {
        let request = BuildRequest {
            previous: self.snapshot.clone(),
            multi_level,
            save_time: self.play_time(&*world),
            timestamp: unix_now(),
            retain_registry: !self.config.clean_up_after_save,
        };
        let output = build_snapshot(world, request)?;
        self.last_registry = output.registry;
        self.snapshot = Some(output.snapshot);
        Ok(())
    }

    fn store_snapshot(&mut self, slot: &str) -> Result<(), SaveError> {
        match &self.snapshot {
            Some(snapshot) => self.store.save(slot, snapshot),
            None => Err(SaveError::NoData),
        }
    }

    pub fn request_save(
        &mut self,
        world: &mut dyn HostWorld,
        slot: &str,
        multi_level: bool,
    ) -> Result<(), SaveError> {
        self.ensure_idle()?;
        self.build(world, multi_level)?;
        self.store_snapshot(slot)?;
        info!("Saved game to slot \"{}\"", slot);
        Ok(())
    }

    /// Save to `"<autosave_prefix>_<level>"`. Returns the slot name.
    pub fn autosave(&mut self, world: &mut dyn HostWorld, multi_level: bool) -> Result<String, SaveError> {
        let slot = autosave_slot_name(&self.config.autosave_prefix, &current_level_name(&*world));
        self.request_save(world, &slot, multi_level)?;
        Ok(slot)
    }

    pub fn copy_save(&mut self, from: &str, to: &str) -> Result<(), SaveError> {
        self.store.copy(from, to)
    }

    /// Load a slot and open the level it was saved in. The restore runs once
    /// the host reports the level active.
    pub fn request_load(&mut self, world: &mut dyn HostWorld, slot: &str) -> Result<(), SaveError> {
        self.ensure_idle()?;
        let snapshot = self.store.load(slot)?.ok_or(SaveError::NoData)?;
        if snapshot.current_level.is_empty() {
            error!("Save \"{}\" has no level name", slot);
            return Err(SaveError::NoData);
        }

        let level = snapshot.current_level.clone();
        self.snapshot = Some(snapshot);
        self.loading = true;
        self.in_level_change = false;
        self.time_skip = 0.0;
        info!("Loading slot \"{}\" into level {}", slot, level);
        world.open_level(&level);
        Ok(())
    }

    /// Destroy every save-capable actor that respawns on level change.
    pub fn pre_change_level(&mut self, world: &mut dyn HostWorld) {
        for actor in world.save_capable_actors().into_iter().rev() {
            if world
                .save_traits(actor)
                .is_some_and(|t| t.respawn_on_level_change)
            {
                world.destroy_actor(actor);
            }
        }
    }

    /// Save the current level into the carried snapshot (multi-level) and the
    /// level-change slot, then open `level`.
    pub fn request_level_change(
        &mut self,
        world: &mut dyn HostWorld,
        level: &str,
        position_tag: &str,
    ) -> Result<(), SaveError> {
        self.ensure_idle()?;
        if self.config.level_change_slot.is_empty() {
            return Err(SaveError::InvalidSlotName(String::new()));
        }
        self.pre_change_level(world);

        let slot = self.config.level_change_slot.clone();
        self.build(world, true)?;
        self.store_snapshot(&slot)?;

        self.in_level_change = true;
        self.loading = false;
        self.position_tag = position_tag.to_string();
        info!("Changing level to {} at \"{}\"", level, position_tag);
        world.open_level(level);
        Ok(())
    }

    /// Forget the carried snapshot and open `level` without restoring.
    pub fn start_new_game(&mut self, world: &mut dyn HostWorld, level: &str) -> Result<(), SaveError> {
        if self.restoring {
            return Err(SaveError::Busy("a restore is in progress"));
        }
        self.snapshot = None;
        self.loading = false;
        self.in_level_change = false;
        self.time_skip = 0.0;
        self.position_tag.clear();
        world.open_level(level);
        Ok(())
    }

    /// Called once the opened level is live. Returns the restore to run when
    /// a load or level change is pending; otherwise starts a fresh play clock.
    pub fn on_level_activated(&mut self, world: &dyn HostWorld) -> Option<RestorePipeline> {
        if self.restoring {
            warn!("Level activated while a restore is still running");
            return None;
        }
        if !(self.loading || self.in_level_change) {
            self.play_time_offset = -world.elapsed_time();
            return None;
        }
        let Some(snapshot) = self.snapshot.take() else {
            error!("Restore requested but no snapshot is loaded");
            self.loading = false;
            self.in_level_change = false;
            return None;
        };

        self.play_time_offset = snapshot.save_time - world.elapsed_time();
        self.restoring = true;
        let options = RestoreOptions {
            level_change: self.in_level_change,
            position_tag: self.position_tag.clone(),
            trigger_post_level_change: self.in_level_change,
            slow_actor_restore_secs: self.config.slow_actor_restore_secs,
            time_skip: self.time_skip,
        };
        Some(RestorePipeline::new(snapshot, options))
    }

    /// Take back the snapshot from a finished pipeline, drop the records the
    /// next save regenerates and clear the loading flags.
    pub fn finish_restore(&mut self, pipeline: RestorePipeline, status: &mut dyn StatusSink) -> RestoreReport {
        status.set_status("Finishing restoration...");
        let (mut snapshot, report) = pipeline.into_parts();
        snapshot.clear_current_level_and_global_data(&report.level);
        self.snapshot = Some(snapshot);
        self.time_skip = report.time_skip;
        self.finish_loading();
        info!(
            "Restored level {} (level change: {}, time skip: {:.1}s)",
            report.level, report.level_change, report.time_skip
        );
        report
    }

    /// Give up on a failed restore. The snapshot is kept for another attempt.
    pub fn abort_restore(&mut self, pipeline: RestorePipeline) {
        let (snapshot, _) = pipeline.into_parts();
        self.snapshot = Some(snapshot);
        self.finish_loading();
    }

    fn finish_loading(&mut self) {
        self.restoring = false;
        self.loading = false;
        self.in_level_change = false;
    }

    /// Level activation plus an atomic restore in one call.
    pub fn restore_now(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<Option<RestoreReport>, SaveError> {
        let Some(mut pipeline) = self.on_level_activated(&*world) else {
            return Ok(None);
        };
        match pipeline.run_atomic(world, status) {
            Ok(_) => Ok(Some(self.finish_restore(pipeline, status))),
            Err(err) => {
                self.abort_restore(pipeline);
                Err(err)
            }
        }
    }

    /// Capture the world again and diff it against the last save. Needs
    /// `clean_up_after_save` off so the save's index lists are kept.
    pub fn debug_compare(
        &self,
        world: &mut dyn HostWorld,
        multi_level: bool,
    ) -> Result<Vec<SnapshotMismatch>, SaveError> {
        let (Some(snapshot), Some(registry)) = (&self.snapshot, &self.last_registry) else {
            return Err(SaveError::NoData);
        };
        recapture_and_compare(world, snapshot, registry, multi_level)
    }

    /// Drop one level's record from the carried snapshot.
    pub fn clear_level_data(&mut self, level: &str) -> bool {
        self.snapshot
            .as_mut()
            .is_some_and(|s| s.clear_level_data(level))
    }
}
