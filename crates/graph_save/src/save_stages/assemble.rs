use bevy::prelude::*;

use crate::host_world::HostWorld;
use crate::object_index::ObjectIndexRegistry;
use crate::save_error::SaveError;
use crate::save_types::Snapshot;

use super::attach_parent_stage::force_attach_parents;
use super::capture_stage::capture_stage;
use super::graph_state::SaveGraph;
use super::level_stage::collect_level_stage;
use super::relation_stage::relation_stage;
use super::root_stage::{collect_root_stage, SaveRoots};

/// Inputs of one save pass.
#[derive(Debug, Default, Clone)]
pub struct BuildRequest {
    /// Snapshot to extend. Its other levels survive only in multi-level mode.
    pub previous: Option<Snapshot>,
    pub multi_level: bool,
    /// Session play time stored as the save time.
    pub save_time: f64,
    /// Unix seconds.
    pub timestamp: u64,
    /// Keep the index lists in the output instead of releasing them.
    pub retain_registry: bool,
}

pub struct BuildOutput {
    pub snapshot: Snapshot,
    pub registry: Option<ObjectIndexRegistry>,
}

/// Refuse the save when any save-capable actor blocks it.
pub fn check_save_blocked(world: &dyn HostWorld) -> Result<(), SaveError> {
    for actor in world.save_capable_actors() {
        if let Some(traits) = world.save_traits(actor) {
            if traits.block_saving {
                return Err(SaveError::SaveBlocked {
                    actor: world.name_of(actor),
                    reason: traits.block_reason,
                });
            }
        }
    }
    Ok(())
}

/// Build a complete snapshot of the live world. All-or-nothing: every
/// failure is detected before the previous snapshot is touched.
pub fn build_snapshot(world: &mut dyn HostWorld, request: BuildRequest) -> Result<BuildOutput, SaveError> {
    let roots = SaveRoots::require(&*world)?;
    check_save_blocked(&*world)?;

    let level_name = crate::save_helpers::current_level_name(&*world);
    let mut graph = SaveGraph::new(Some(level_name.clone()));

    collect_root_stage(&*world, &mut graph, &roots);
    collect_level_stage(&*world, &mut graph, &roots);
    force_attach_parents(&*world, &mut graph);
    capture_stage(world, &mut graph);
    relation_stage(&*world, &mut graph);

    let mut snapshot = request.previous.unwrap_or_default();
    if !request.multi_level {
        snapshot.levels.clear();
    }
    snapshot.version = crate::save_types::CURRENT_SNAPSHOT_VERSION;
    snapshot.timestamp = request.timestamp;
    snapshot.save_time = request.save_time;
    snapshot.current_level = level_name.clone();
    snapshot.assets_to_load.clear();
    for asset in graph.assets.drain(..) {
        snapshot.add_asset(asset);
    }
    snapshot.global_actors = std::mem::take(&mut graph.global_actors);
    snapshot.global_objects = std::mem::take(&mut graph.global_objects);

    let level = snapshot.reset_level(&level_name);
    level.actors = std::mem::take(&mut graph.local_actors);
    level.custom_objects = std::mem::take(&mut graph.local_objects);
    level.save_time = request.save_time;

    info!(
        "Saved {} levels {} global actors and {} custom global objects",
        snapshot.levels.len(),
        snapshot.global_actors.len(),
        snapshot.global_objects.len()
    );

    let registry = request.retain_registry.then_some(graph.registry);
    Ok(BuildOutput { snapshot, registry })
}
