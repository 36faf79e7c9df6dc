use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::host_world::{HostWorld, StatusSink};
use crate::save_error::SaveError;

use super::{actors_of, objects_of, RestorePipeline};

impl RestorePipeline {
    /// Offer the level-change handoff to each level-change actor in turn.
    /// The first one that accepts it becomes the handoff actor.
    pub(super) fn calculate_level_change_actor(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<(), SaveError> {
        self.handoff_actor = None;
        if !self.options.level_change {
            return Ok(());
        }
        status.set_status("Handling level change...");

        let roots = self.roots(&*world)?;
        for actor in world.level_change_actors() {
            if world.on_level_change(actor, roots.controller, roots.avatar, &self.options.position_tag) {
                debug!(
                    "Level change handoff to {} at \"{}\"",
                    world.name_of(actor),
                    self.options.position_tag
                );
                self.handoff_actor = Some(actor);
                break;
            }
        }
        Ok(())
    }

    /// Call the restore hook on every tracked object, globals first.
    pub(super) fn call_on_restore(
        &mut self,
        world: &mut dyn HostWorld,
        status: &mut dyn StatusSink,
    ) -> Result<(), SaveError> {
        status.set_status("Calling restore on objects...");
        let roots = self.roots(&*world)?;

        for global in [true, false] {
            let ids: Vec<_> = self.registry.iter(global).map(|(_, id)| id).collect();
            for id in ids {
                if world.is_valid(id) {
                    world.on_restore(id, roots.session, roots.controller);
                }
            }
        }
        Ok(())
    }

    pub(super) fn finish(&mut self, world: &mut dyn HostWorld) -> Result<(), SaveError> {
        self.gathered_classes = None;
        if !self.options.trigger_post_level_change {
            return Ok(());
        }
        let roots = self.roots(&*world)?;
        match self.handoff_actor {
            Some(actor) => {
                world.post_level_change(actor, roots.controller, roots.avatar);
            }
            None => error!("No level change actor!"),
        }
        Ok(())
    }

    /// Distinct classes of every record the restore will touch: global
    /// actors and their components, global objects, then the current
    /// level's actors, components and objects. Cached until `Finish`.
    pub fn gather_classes_to_load(&mut self) -> &[String] {
        if self.gathered_classes.is_none() {
            let level = self.level.or_else(|| self.snapshot.level_index(&self.snapshot.current_level));
            let mut seen = BTreeSet::new();
            let mut classes = Vec::new();
            let mut push = |class: &str| {
                if seen.insert(class.to_string()) {
                    classes.push(class.to_string());
                }
            };
            for global in [true, false] {
                for actor in actors_of(&self.snapshot, level, global) {
                    push(&actor.custom.class);
                    for component in &actor.components {
                        push(&component.custom.class);
                    }
                }
                for object in objects_of(&self.snapshot, level, global) {
                    push(&object.class);
                }
            }
            self.gathered_classes = Some(classes);
        }
        self.gathered_classes.as_deref().unwrap_or_default()
    }
}
