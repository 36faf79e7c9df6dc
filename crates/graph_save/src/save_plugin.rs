use std::marker::PhantomData;

use bevy::prelude::*;

use crate::host_world::{HostWorld, StatusSink};
use crate::restore_pipeline::{RestorePipeline, RestoreReport};
use crate::save_session::SaveSession;

// ---------------------------------------------------------------------------
// State and resources
// ---------------------------------------------------------------------------

/// Whether a save, load or restore is in flight. Gameplay systems should only
/// run while `Idle`.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaveLoadState {
    #[default]
    Idle,
    Saving,
    /// A load, level change or new game is opening a level.
    Loading,
    /// A restore pipeline is being stepped, one state per tick.
    Restoring,
}

/// Latest loading-screen status text.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct LoadingStatus {
    pub text: String,
    /// Number of status updates since startup.
    pub updates: u64,
}

impl StatusSink for LoadingStatus {
    fn set_status(&mut self, text: &str) {
        self.text = text.to_string();
        self.updates += 1;
    }
}

/// The restore being driven across ticks.
#[derive(Resource, Default)]
pub struct ActiveRestore(pub Option<RestorePipeline>);

#[derive(Debug, Clone, PartialEq)]
enum LoadRequest {
    Slot(String),
    LevelChange { level: String, position_tag: String },
    NewGame(String),
}

#[derive(Resource, Default)]
struct PendingRequests {
    save: Option<SaveRequestEvent>,
    load: Option<LoadRequest>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone, PartialEq)]
pub struct SaveRequestEvent {
    pub slot: String,
    pub multi_level: bool,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct LoadRequestEvent {
    pub slot: String,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct LevelChangeRequestEvent {
    pub level: String,
    pub position_tag: String,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct NewGameRequestEvent {
    pub level: String,
}

/// Sent by the host once a level opened through `HostWorld::open_level` is live.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelActivatedEvent;

#[derive(Event, Debug, Clone, PartialEq)]
pub struct RestoreFinishedEvent(pub RestoreReport);

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Wires a `SaveSession` to the host world resource `W`. The session must be
/// inserted by the host before the plugin is added; a copy of its config is
/// inserted as the `SaveConfig` resource.
pub struct GraphSavePlugin<W> {
    _world: PhantomData<fn() -> W>,
}

impl<W> Default for GraphSavePlugin<W> {
    fn default() -> Self {
        Self {
            _world: PhantomData,
        }
    }
}

impl<W: HostWorld + Resource> Plugin for GraphSavePlugin<W> {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveRequestEvent>()
            .add_event::<LoadRequestEvent>()
            .add_event::<LevelChangeRequestEvent>()
            .add_event::<NewGameRequestEvent>()
            .add_event::<LevelActivatedEvent>()
            .add_event::<RestoreFinishedEvent>()
            .init_state::<SaveLoadState>()
            .init_resource::<LoadingStatus>()
            .init_resource::<ActiveRestore>()
            .init_resource::<PendingRequests>();

        let config = app
            .world()
            .get_resource::<SaveSession>()
            .map(|session| session.config().clone())
            .unwrap_or_default();
        app.insert_resource(config);

        app.add_systems(
            Update,
            (
                (detect_save_request, detect_load_request).chain(),
                detect_level_activated::<W>,
                drive_restore::<W>.run_if(in_state(SaveLoadState::Restoring)),
            ),
        );

        app.add_systems(OnEnter(SaveLoadState::Saving), exclusive_save::<W>);
        app.add_systems(OnEnter(SaveLoadState::Loading), exclusive_load::<W>);
    }
}

// ---------------------------------------------------------------------------
// Request detection (lightweight, run in Update)
// ---------------------------------------------------------------------------

fn detect_save_request(
    mut events: EventReader<SaveRequestEvent>,
    state: Res<State<SaveLoadState>>,
    mut pending: ResMut<PendingRequests>,
    mut next_state: ResMut<NextState<SaveLoadState>>,
) {
    let Some(request) = events.read().next().cloned() else {
        return;
    };
    events.read().for_each(drop);
    if *state.get() != SaveLoadState::Idle {
        warn!("Ignoring save request for \"{}\": busy", request.slot);
        return;
    }
    pending.save = Some(request);
    next_state.set(SaveLoadState::Saving);
}

fn detect_load_request(
    mut loads: EventReader<LoadRequestEvent>,
    mut level_changes: EventReader<LevelChangeRequestEvent>,
    mut new_games: EventReader<NewGameRequestEvent>,
    state: Res<State<SaveLoadState>>,
    mut pending: ResMut<PendingRequests>,
    mut next_state: ResMut<NextState<SaveLoadState>>,
) {
    // One request per frame; a new game wins over a load, a load over a
    // level change.
    let request = new_games
        .read()
        .last()
        .map(|e| LoadRequest::NewGame(e.level.clone()))
        .or_else(|| loads.read().last().map(|e| LoadRequest::Slot(e.slot.clone())))
        .or_else(|| {
            level_changes.read().last().map(|e| LoadRequest::LevelChange {
                level: e.level.clone(),
                position_tag: e.position_tag.clone(),
            })
        });
    loads.read().for_each(drop);
    level_changes.read().for_each(drop);

    let Some(request) = request else {
        return;
    };
    if *state.get() != SaveLoadState::Idle || pending.save.is_some() {
        warn!("Ignoring {:?}: busy", request);
        return;
    }
    pending.load = Some(request);
    next_state.set(SaveLoadState::Loading);
}

/// Start the restore once the opened level is live. Without incremental
/// restore the whole pipeline runs here.
fn detect_level_activated<W: HostWorld + Resource>(
    mut events: EventReader<LevelActivatedEvent>,
    mut host: ResMut<W>,
    mut session: ResMut<SaveSession>,
    mut active: ResMut<ActiveRestore>,
    mut status: ResMut<LoadingStatus>,
    mut finished: EventWriter<RestoreFinishedEvent>,
    mut next_state: ResMut<NextState<SaveLoadState>>,
) {
    if events.read().next().is_none() {
        return;
    }
    events.read().for_each(drop);

    if !session.config().use_incremental_restore {
        match session.restore_now(&mut *host, &mut *status) {
            Ok(Some(report)) => {
                finished.send(RestoreFinishedEvent(report));
            }
            Ok(None) => {}
            Err(e) => error!("Restore failed: {e}"),
        }
        return;
    }

    if let Some(pipeline) = session.on_level_activated(&*host) {
        active.0 = Some(pipeline);
        next_state.set(SaveLoadState::Restoring);
    }
}

/// Advance the active restore by one state per tick.
fn drive_restore<W: HostWorld + Resource>(
    mut host: ResMut<W>,
    mut session: ResMut<SaveSession>,
    mut active: ResMut<ActiveRestore>,
    mut status: ResMut<LoadingStatus>,
    mut finished: EventWriter<RestoreFinishedEvent>,
    mut next_state: ResMut<NextState<SaveLoadState>>,
) {
    let Some(pipeline) = active.0.as_mut() else {
        next_state.set(SaveLoadState::Idle);
        return;
    };
    let per_tick = session.config().restore_actors_per_tick;

    match pipeline.step(&mut *host, &mut *status, per_tick) {
        Ok(_) if pipeline.is_done() => {
            if let Some(pipeline) = active.0.take() {
                let report = session.finish_restore(pipeline, &mut *status);
                finished.send(RestoreFinishedEvent(report));
            }
            next_state.set(SaveLoadState::Idle);
        }
        Ok(_) => {}
        Err(e) => {
            error!("Restore failed: {e}");
            if let Some(pipeline) = active.0.take() {
                session.abort_restore(pipeline);
            }
            next_state.set(SaveLoadState::Idle);
        }
    }
}

// ---------------------------------------------------------------------------
// Exclusive systems
// ---------------------------------------------------------------------------

/// Runs on `OnEnter(Saving)`, then transitions back to `Idle`.
fn exclusive_save<W: HostWorld + Resource>(world: &mut World) {
    let request = world.resource_mut::<PendingRequests>().save.take();
    if let Some(request) = request {
        world.resource_scope(|world, mut session: Mut<SaveSession>| {
            world.resource_scope(|_world, mut host: Mut<W>| {
                if let Err(e) = session.request_save(&mut *host, &request.slot, request.multi_level) {
                    error!("Save to \"{}\" failed: {e}", request.slot);
                }
            });
        });
    }
    world
        .resource_mut::<NextState<SaveLoadState>>()
        .set(SaveLoadState::Idle);
}

/// Runs on `OnEnter(Loading)`: opens the target level, then transitions back
/// to `Idle` until the host reports the level active.
fn exclusive_load<W: HostWorld + Resource>(world: &mut World) {
    let request = world.resource_mut::<PendingRequests>().load.take();
    if let Some(request) = request {
        world.resource_scope(|world, mut session: Mut<SaveSession>| {
            world.resource_scope(|_world, mut host: Mut<W>| {
                let result = match &request {
                    LoadRequest::Slot(slot) => session.request_load(&mut *host, slot),
                    LoadRequest::LevelChange {
                        level,
                        position_tag,
                    } => session.request_level_change(&mut *host, level, position_tag),
                    LoadRequest::NewGame(level) => session.start_new_game(&mut *host, level),
                };
                if let Err(e) = result {
                    error!("{:?} failed: {e}", request);
                }
            });
        });
    }
    world
        .resource_mut::<NextState<SaveLoadState>>()
        .set(SaveLoadState::Idle);
}
