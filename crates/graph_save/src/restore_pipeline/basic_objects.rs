use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId, StatusSink};
use crate::object_index::IndexRef;
use crate::save_error::SaveError;
use crate::save_helpers::current_level_name;
use crate::save_stages::{
    SaveRoots, TAG_GAME_INSTANCE, TAG_GAME_STATE, TAG_PLAYER_CONTROLLER, TAG_PLAYER_PAWN,
};

use super::{actors_of, objects_of, RestorePipeline};

impl RestorePipeline {
    /// Reset the index lists, find the level record and re-link the fixed
    /// roots and custom global tags.
    pub(super) fn restore_basic_objects(
        &mut self,
        world: &dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<(), SaveError> {
        status.set_status("Starting restore...");

        let roots = SaveRoots::require(world)?;
        self.roots = Some(roots);
        self.registry.clear();
        self.actor_cursor = 0;
        self.object_cursor = 0;

        self.level_name = current_level_name(world);
        self.level = self.snapshot.level_index(&self.level_name);
        if self.level.is_none() && !self.options.level_change {
            return Err(SaveError::LevelDataMissing(self.level_name.clone()));
        }

        self.time_skip = match (self.options.level_change, self.level) {
            (true, Some(i)) => {
                self.options.time_skip + self.snapshot.save_time - self.snapshot.levels[i].save_time
            }
            _ => 0.0,
        };

        status.set_status("Restoring basic objects...");

        if !self.restore_object_by_tag(roots.session, TAG_GAME_INSTANCE, true) {
            return Err(SaveError::MissingTaggedObject(TAG_GAME_INSTANCE.to_string()));
        }
        for (actor, tag) in [
            (roots.controller, TAG_PLAYER_CONTROLLER),
            (roots.avatar, TAG_PLAYER_PAWN),
            (roots.game_state, TAG_GAME_STATE),
        ] {
            if !self.restore_actor_by_tag(world, actor, tag, true) {
                return Err(SaveError::MissingTaggedObject(tag.to_string()));
            }
        }

        for (tag, actor) in world.custom_global_tags(roots.controller, roots.avatar) {
            if !self.restore_actor_by_tag(world, actor, &tag, true) {
                debug!("No saved record for custom global tag \"{}\"", tag);
            }
        }
        Ok(())
    }

    /// Put `object` at the index of the object record carrying `tag`.
    pub(super) fn restore_object_by_tag(&mut self, object: ObjectId, tag: &str, global: bool) -> bool {
        let Some(record) = objects_of(&self.snapshot, self.level, global)
            .iter()
            .find(|r| r.has_tag(tag))
        else {
            return false;
        };
        place(&mut self.registry, object, IndexRef { index: record.object_index, global });
        true
    }

    /// Put `actor` at the index of the actor record carrying `tag`, and each
    /// of its components at the record tagged `"<tag>.<component name>"`.
    pub(super) fn restore_actor_by_tag(
        &mut self,
        world: &dyn HostWorld,
        actor: ObjectId,
        tag: &str,
        global: bool,
    ) -> bool {
        let Some(record) = actors_of(&self.snapshot, self.level, global)
            .iter()
            .find(|r| r.custom.has_tag(tag))
        else {
            return false;
        };
        place(
            &mut self.registry,
            actor,
            IndexRef {
                index: record.custom.object_index,
                global,
            },
        );

        for component in world.components_of(actor) {
            let component_tag = format!("{}.{}", tag, world.name_of(component));
            if let Some(saved) = record.components.iter().find(|c| c.custom.has_tag(&component_tag)) {
                place(
                    &mut self.registry,
                    component,
                    IndexRef {
                        index: saved.custom.object_index,
                        global,
                    },
                );
            }
        }
        true
    }
}

/// `ObjectIndexRegistry::place` with a warning on conflict.
pub(super) fn place(registry: &mut crate::object_index::ObjectIndexRegistry, object: ObjectId, at: IndexRef) {
    if !registry.place(object, at) {
        warn!(
            "Cannot place {} at {} index {}: slot or object already taken",
            object,
            if at.global { "global" } else { "local" },
            at.index
        );
    }
}
