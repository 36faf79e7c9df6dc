use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId};

use super::graph_state::SaveGraph;

/// Force every attach-parent component of a tracked actor into the save,
/// under its owning actor's record.
///
/// Parents are added even when their category is excluded or they carry
/// `DontSave`; an attachment chain must always resolve at restore. Parents
/// whose owner is not tracked are left out.
pub fn force_attach_parents(world: &dyn HostWorld, graph: &mut SaveGraph) {
    let mut parents: Vec<ObjectId> = Vec::new();
    for global in [true, false] {
        for actor in graph.actors(global) {
            let Some(id) = graph.registry.resolve(actor.custom.object_index, global) else {
                continue;
            };
            if let Some((parent, _)) = world.attach_parent(id) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
    }

    for parent in parents {
        if graph.registry.contains(parent) {
            continue;
        }
        let Some(owner) = world.owner_of(parent) else {
            continue;
        };
        let Some(owner_at) = graph.registry.find(owner) else {
            continue;
        };
        let Some(slot) = graph.actor_slot(owner_at) else {
            continue;
        };
        let owner_tag = graph.actors(owner_at.global)[slot].custom.tag.clone();
        debug!(
            "Forcing component \"{}\" on actor \"{}\" to save",
            world.name_of(parent),
            world.name_of(owner)
        );
        graph.add_component(world, owner_at.global, slot, owner_tag.as_deref(), parent);
    }
}
