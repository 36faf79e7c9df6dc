use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId, StatusSink};
use crate::object_index::{IndexRef, ObjectIndexRegistry};
use crate::save_error::SaveError;
use crate::save_types::{ActorSaveData, CustomSaveData, Snapshot};

use super::basic_objects::place;
use super::{actors_of, objects_of, RestorePipeline};

/// Outer chains longer than this are treated as broken.
const MAX_OUTER_DEPTH: usize = 64;

impl RestorePipeline {
    /// Destroy save-capable actors the rebuilt lists do not track and that
    /// ask to be deleted on restore. During a level change, actors that
    /// respawn on level change are kept.
    pub(super) fn clear_objects(&mut self, world: &mut dyn HostWorld, status: &mut dyn StatusSink) {
        if self.level.is_none() {
            return;
        }
        status.set_status("Destroying old actors...");

        let level_change = self.options.level_change;
        for actor in world.save_capable_actors().into_iter().rev() {
            if self.registry.contains(actor) {
                continue;
            }
            let Some(traits) = world.save_traits(actor) else {
                continue;
            };
            if traits.delete_on_restore && (!level_change || !traits.respawn_on_level_change) {
                debug!("Destroying actor {} before restore", world.name_of(actor));
                world.destroy_actor(actor);
            }
        }
    }

    /// Resolve every actor record to a live actor, then recreate every
    /// dynamic object from its class and outer.
    pub(super) fn recreate_all_objects(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<(), SaveError> {
        let roots = self.roots(&*world)?;
        status.set_status("Respawning actors...");

        respawn_or_find_actors(
            world,
            actors_of(&self.snapshot, self.level, true),
            &mut self.registry,
            true,
        )?;

        if self.level.is_some() {
            for (tag, actor) in world.custom_local_tags(roots.controller, roots.avatar) {
                if !self.restore_actor_by_tag(&*world, actor, &tag, false) {
                    debug!("No saved record for custom local tag \"{}\"", tag);
                }
            }
            respawn_or_find_actors(
                world,
                actors_of(&self.snapshot, self.level, false),
                &mut self.registry,
                false,
            )?;
        }

        status.set_status("Recreating dynamic objects...");
        for global in [true, false] {
            for record in objects_of(&self.snapshot, self.level, global) {
                recreate_dynamic_object(
                    world,
                    &self.snapshot,
                    self.level,
                    &mut self.registry,
                    record,
                    global,
                    0,
                )?;
            }
        }
        Ok(())
    }
}

fn resolved(world: &dyn HostWorld, registry: &ObjectIndexRegistry, index: u32, global: bool) -> Option<ObjectId> {
    registry
        .resolve(index, global)
        .filter(|id| world.is_valid(*id))
}

/// Spawn (recreate) or find each unresolved actor record, then place it
/// and its components in the index lists.
fn respawn_or_find_actors(
    world: &mut dyn HostWorld,
    records: &[ActorSaveData],
    registry: &mut ObjectIndexRegistry,
    global: bool,
) -> Result<(), SaveError> {
    for record in records {
        if resolved(&*world, registry, record.custom.object_index, global).is_some() {
            continue;
        }
        let custom = &record.custom;
        let actor = if custom.recreate {
            world
                .spawn_actor(&custom.class, &record.transform)
                .ok_or_else(|| SaveError::SpawnFailed {
                    name: custom.name.clone(),
                    class: custom.class.clone(),
                })?
        } else {
            find_live_actor(&*world, custom).ok_or_else(|| SaveError::ActorNotFound {
                name: custom.name.clone(),
            })?
        };
        place_actor(&*world, registry, record, actor, global);
    }
    Ok(())
}

/// A live actor of the record's class matching its save tag, or its name
/// when the record has no tag.
fn find_live_actor(world: &dyn HostWorld, record: &CustomSaveData) -> Option<ObjectId> {
    world.actors_of_class(&record.class).into_iter().find(|actor| match &record.tag {
        Some(tag) => world
            .save_traits(*actor)
            .and_then(|t| t.saving_tag)
            .is_some_and(|t| t == *tag),
        None => world.name_of(*actor) == record.name,
    })
}

/// Place an actor and its live components (matched by name).
fn place_actor(
    world: &dyn HostWorld,
    registry: &mut ObjectIndexRegistry,
    record: &ActorSaveData,
    actor: ObjectId,
    global: bool,
) {
    place(
        registry,
        actor,
        IndexRef {
            index: record.custom.object_index,
            global,
        },
    );
    for component in &record.components {
        if let Some(live) = world.find_component(actor, &component.custom.name) {
            place(
                registry,
                live,
                IndexRef {
                    index: component.custom.object_index,
                    global,
                },
            );
        }
    }
}

/// Recreate one dynamic object, recreating its outer first when needed.
fn recreate_dynamic_object(
    world: &mut dyn HostWorld,
    snapshot: &Snapshot,
    level: Option<usize>,
    registry: &mut ObjectIndexRegistry,
    record: &CustomSaveData,
    global: bool,
    depth: usize,
) -> Result<ObjectId, SaveError> {
    if let Some(existing) = resolved(&*world, registry, record.object_index, global) {
        return Ok(existing);
    }
    let unresolved = || SaveError::UnresolvedOuter {
        name: record.name.clone(),
        class: record.class.clone(),
    };
    let outer_index = record.outer_object_index.ok_or_else(unresolved)?;
    let outer_global = record.outer_is_global;

    let mut outer = resolved(&*world, registry, outer_index, outer_global);
    if outer.is_none() && depth < MAX_OUTER_DEPTH {
        let outer_record = objects_of(snapshot, level, outer_global)
            .iter()
            .find(|r| r.object_index == outer_index);
        if let Some(outer_record) = outer_record {
            outer = Some(recreate_dynamic_object(
                world,
                snapshot,
                level,
                registry,
                outer_record,
                outer_global,
                depth + 1,
            )?);
        }
    }
    let outer = outer.ok_or_else(unresolved)?;

    let object = world
        .create_object(&record.class, outer)
        .ok_or_else(|| SaveError::SpawnFailed {
            name: record.name.clone(),
            class: record.class.clone(),
        })?;
    place(
        registry,
        object,
        IndexRef {
            index: record.object_index,
            global,
        },
    );
    Ok(object)
}
