use std::time::Instant;

use bevy::prelude::*;

use crate::custom_capture::apply;
use crate::host_world::{HostWorld, ObjectId, StatusSink};
use crate::property_codec::DecodeContext;
use crate::save_error::SaveError;
use crate::save_types::{actor_bytes, size_string, ActorSaveData};

use super::{actors_of, load_percentage, objects_of, RestorePipeline};

impl RestorePipeline {
    /// Restore up to `max_count` actor records (0 = all remaining), globals
    /// first. Returns true once every actor record is done.
    pub(super) fn restore_actors(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
        max_count: usize,
    ) -> Result<bool, SaveError> {
        if self.actor_cursor == 0 {
            status.set_status("Restoring actor data...");
        }
        let globals = actors_of(&self.snapshot, self.level, true);
        let locals = actors_of(&self.snapshot, self.level, false);
        let total = globals.len() + locals.len();
        let budget = if max_count == 0 { usize::MAX } else { max_count };

        let mut done = 0;
        while self.actor_cursor < total && done < budget {
            let i = self.actor_cursor;
            let (record, global) = if i < globals.len() {
                (&globals[i], true)
            } else {
                (&locals[i - globals.len()], false)
            };
            status.set_status(&format!("Restoring actor {}%", load_percentage(i, total)));

            let actor = self
                .registry
                .resolve(record.custom.object_index, global)
                .filter(|id| world.is_valid(*id))
                .ok_or_else(|| SaveError::ActorNotFound {
                    name: record.custom.name.clone(),
                })?;

            let started = Instant::now();
            let cx = DecodeContext {
                elapsed: world.elapsed_time(),
                level_name: &self.level_name,
                refs: Some(&self.registry),
            };
            restore_actor(world, actor, record, global, &cx)?;

            let secs = started.elapsed().as_secs_f32();
            if secs > self.options.slow_actor_restore_secs {
                warn!(
                    "Actor {} took {} seconds to restore with size {}",
                    record.custom.name,
                    secs,
                    size_string(actor_bytes(record))
                );
            }

            self.actor_cursor += 1;
            done += 1;
        }
        Ok(self.actor_cursor >= total)
    }

    /// Apply up to `max_count` dynamic object records (0 = all remaining),
    /// globals first. Returns true once every object record is done.
    pub(super) fn restore_dynamic_objects(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
        max_count: usize,
    ) -> Result<bool, SaveError> {
        if self.object_cursor == 0 {
            status.set_status("Restoring custom objects...");
        }
        let globals = objects_of(&self.snapshot, self.level, true);
        let locals = objects_of(&self.snapshot, self.level, false);
        let total = globals.len() + locals.len();
        let budget = if max_count == 0 { usize::MAX } else { max_count };

        let mut done = 0;
        while self.object_cursor < total && done < budget {
            let i = self.object_cursor;
            let (record, global) = if i < globals.len() {
                (&globals[i], true)
            } else {
                (&locals[i - globals.len()], false)
            };
            status.set_status(&format!(
                "Restoring custom object {}%",
                load_percentage(i, total)
            ));

            let object = self
                .registry
                .resolve(record.object_index, global)
                .filter(|id| world.is_valid(*id))
                .ok_or(SaveError::MissingRecord {
                    index: record.object_index,
                    global,
                })?;

            let cx = DecodeContext {
                elapsed: world.elapsed_time(),
                level_name: &self.level_name,
                refs: Some(&self.registry),
            };
            apply(world, object, &record.properties, &cx);

            self.object_cursor += 1;
            done += 1;
        }
        Ok(self.object_cursor >= total)
    }
}

/// Transform, data, reattachment, then each saved component by name.
fn restore_actor(
    world: &mut dyn HostWorld,
    actor: ObjectId,
    record: &ActorSaveData,
    global: bool,
    cx: &DecodeContext<'_>,
) -> Result<(), SaveError> {
    let root = world.root_component(actor);
    if root.is_some_and(|r| world.is_movable(r)) {
        world.set_actor_transform(actor, &record.transform);
    }

    apply(world, actor, &record.custom.properties, cx);

    if let Some(parent_index) = record.custom.outer_object_index {
        let parent = cx
            .refs
            .and_then(|refs| refs.resolve(parent_index, record.custom.outer_is_global))
            .filter(|id| world.is_valid(*id))
            .ok_or_else(|| SaveError::MissingAttachParent {
                name: record.custom.name.clone(),
                index: parent_index,
            })?;
        let socket = record.attach_socket.as_deref();
        if world.save_traits(actor).is_some() {
            world.handle_reattach(actor, parent, socket, &record.relative_transform);
        } else {
            world.attach_to_component(actor, parent, socket);
        }
    }

    for saved in &record.components {
        let Some(component) = world.find_component(actor, &saved.custom.name) else {
            warn!(
                "Component {} of actor {} ({} list) no longer exists",
                saved.custom.name,
                record.custom.name,
                if global { "global" } else { "local" }
            );
            continue;
        };
        if Some(component) != root && world.is_movable(component) {
            world.set_relative_transform(component, &saved.transform);
        }
        apply(world, component, &saved.custom.properties, cx);
    }
    Ok(())
}
