// ---------------------------------------------------------------------------
// Restore Pipeline: incremental reconstruction of a saved graph
// ---------------------------------------------------------------------------
//
// A `RestorePipeline` owns the snapshot being restored and the index lists
// being rebuilt. `step` runs the current state and advances; the two actor
// and object states may take several steps when given a `max_count`.
//
// ## State order
//
// ```text
//   BasicObjects            re-link the fixed roots and custom tags
//   ClearObjects            destroy untracked delete-on-restore actors
//   RecreateAllObjects      find or spawn actors, recreate dynamic objects
//   RestoreActors*          transforms, data, reattachment, components
//   RestoreDynamicObjects*  object data
//   CalculateLevelChangeActor
//   CallOnRestore
//   Finish
//   Done
//
//   * steppable: `max_count` records per step, 0 = all
// ```
//
// `run_atomic` steps through every state in one call. Both modes share the
// same per-state code, so they leave the world in the same state.
//
// Fatal graph problems (unresolvable outer, missing actor) abort the step
// with a `SaveError`. World changes made before the failure are not undone.

mod apply_records;
mod basic_objects;
mod finish;
mod recreate;

use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId, StatusSink};
use crate::object_index::ObjectIndexRegistry;
use crate::save_error::SaveError;
use crate::save_stages::SaveRoots;
use crate::save_types::{ActorSaveData, CustomSaveData, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RestoreState {
    BasicObjects,
    ClearObjects,
    RecreateAllObjects,
    RestoreActors,
    RestoreDynamicObjects,
    CalculateLevelChangeActor,
    CallOnRestore,
    Finish,
    Done,
}

impl RestoreState {
    pub const ALL: [RestoreState; 9] = [
        RestoreState::BasicObjects,
        RestoreState::ClearObjects,
        RestoreState::RecreateAllObjects,
        RestoreState::RestoreActors,
        RestoreState::RestoreDynamicObjects,
        RestoreState::CalculateLevelChangeActor,
        RestoreState::CallOnRestore,
        RestoreState::Finish,
        RestoreState::Done,
    ];

    pub fn next(self) -> RestoreState {
        let i = Self::ALL.iter().position(|s| *s == self).unwrap_or(Self::ALL.len() - 1);
        Self::ALL[(i + 1).min(Self::ALL.len() - 1)]
    }

    /// Position in the state order; the incremental driver's progress counter.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

/// How a restore should behave.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOptions {
    /// The restore follows a level change; missing level data is allowed.
    pub level_change: bool,
    pub position_tag: String,
    /// Call `post_level_change` on the handoff actor at `Finish`.
    pub trigger_post_level_change: bool,
    pub slow_actor_restore_secs: f32,
    /// Time skipped by earlier level changes this session.
    pub time_skip: f64,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            level_change: false,
            position_tag: String::new(),
            trigger_post_level_change: false,
            slow_actor_restore_secs: 0.5,
            time_skip: 0.0,
        }
    }
}

/// Outcome of a finished restore.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RestoreReport {
    pub level: String,
    pub level_change: bool,
    pub time_skip: f64,
    /// Actor that accepted the level-change handoff.
    pub handoff_actor: Option<ObjectId>,
}

pub struct RestorePipeline {
    snapshot: Snapshot,
    options: RestoreOptions,
    state: RestoreState,
    registry: ObjectIndexRegistry,
    roots: Option<SaveRoots>,
    level_name: String,
    /// Index of the current level's record in `snapshot.levels`.
    level: Option<usize>,
    actor_cursor: usize,
    object_cursor: usize,
    time_skip: f64,
    handoff_actor: Option<ObjectId>,
    gathered_classes: Option<Vec<String>>,
}

impl RestorePipeline {
    pub fn new(snapshot: Snapshot, options: RestoreOptions) -> Self {
        let time_skip = options.time_skip;
        Self {
            snapshot,
            options,
            state: RestoreState::BasicObjects,
            registry: ObjectIndexRegistry::new(),
            roots: None,
            level_name: String::new(),
            level: None,
            actor_cursor: 0,
            object_cursor: 0,
            time_skip,
            handoff_actor: None,
            gathered_classes: None,
        }
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == RestoreState::Done
    }

    /// Number of states completed so far.
    pub fn progress(&self) -> usize {
        self.state.ordinal()
    }

    pub fn registry(&self) -> &ObjectIndexRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Run the current state once. Steppable states handle up to
    /// `max_count` records (0 = all) and only advance once exhausted.
    pub fn step(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
        max_count: usize,
    ) -> Result<RestoreState, SaveError> {
        let advance = match self.state {
            RestoreState::BasicObjects => self.restore_basic_objects(&*world, status).map(|_| true),
            RestoreState::ClearObjects => {
                self.clear_objects(world, status);
                Ok(true)
            }
            RestoreState::RecreateAllObjects => self.recreate_all_objects(world, status).map(|_| true),
            RestoreState::RestoreActors => self.restore_actors(world, status, max_count),
            RestoreState::RestoreDynamicObjects => {
                self.restore_dynamic_objects(world, status, max_count)
            }
            RestoreState::CalculateLevelChangeActor => {
                self.calculate_level_change_actor(world, status).map(|_| true)
            }
            RestoreState::CallOnRestore => self.call_on_restore(world, status).map(|_| true),
            RestoreState::Finish => self.finish(world).map(|_| true),
            RestoreState::Done => Ok(false),
        };
        match advance {
            Ok(true) => self.state = self.state.next(),
            Ok(false) => {}
            Err(err) => {
                error!("Restore failed in {:?}: {}", self.state, err);
                return Err(err);
            }
        }
        Ok(self.state)
    }

    /// Run every remaining state in one call.
    pub fn run_atomic(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<RestoreReport, SaveError> {
        while !self.is_done() {
            self.step(world, status, 0)?;
        }
        Ok(self.report())
    }

    pub fn report(&self) -> RestoreReport {
        RestoreReport {
            level: self.level_name.clone(),
            level_change: self.options.level_change,
            time_skip: self.time_skip,
            handoff_actor: self.handoff_actor,
        }
    }

    /// Hand back the snapshot and the report. The index lists are dropped.
    pub fn into_parts(self) -> (Snapshot, RestoreReport) {
        let report = self.report();
        (self.snapshot, report)
    }

    fn roots(&self, world: &dyn HostWorld) -> Result<SaveRoots, SaveError> {
        match self.roots {
            Some(roots) => Ok(roots),
            None => SaveRoots::require(world),
        }
    }
}

fn actors_of(snapshot: &Snapshot, level: Option<usize>, global: bool) -> &[ActorSaveData] {
    match (global, level) {
        (true, _) => &snapshot.global_actors,
        (false, Some(i)) => &snapshot.levels[i].actors,
        (false, None) => &[],
    }
}

fn objects_of(snapshot: &Snapshot, level: Option<usize>, global: bool) -> &[CustomSaveData] {
    match (global, level) {
        (true, _) => &snapshot.global_objects,
        (false, Some(i)) => &snapshot.levels[i].custom_objects,
        (false, None) => &[],
    }
}

/// Percentage shown while restoring record `index` of `total`.
fn load_percentage(index: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    (index + 1) * 100 / total
}
