use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId, TAG_DONT_SAVE, TAG_FORCE_SAVE};
use crate::object_index::{IndexRef, ObjectIndexRegistry};
use crate::property_codec::{RefToken, ReferenceEncoder};
use crate::save_types::{ActorSaveData, ComponentSaveData, CustomSaveData};

/// Outer chains longer than this are treated as broken.
const MAX_OUTER_DEPTH: usize = 64;

/// Working state of one save pass: the index lists plus every record
/// created so far. Record `object_index` fields always agree with the
/// registry.
#[derive(Debug, Default)]
pub struct SaveGraph {
    pub registry: ObjectIndexRegistry,
    /// Level whose local records are being built. `None` saves globals only.
    pub level_name: Option<String>,
    pub global_actors: Vec<ActorSaveData>,
    pub local_actors: Vec<ActorSaveData>,
    pub global_objects: Vec<CustomSaveData>,
    pub local_objects: Vec<CustomSaveData>,
    /// Asset paths collected while encoding hard references.
    pub assets: Vec<String>,
}

impl SaveGraph {
    pub fn new(level_name: Option<String>) -> Self {
        Self {
            level_name,
            ..Default::default()
        }
    }

    pub fn actors(&self, global: bool) -> &Vec<ActorSaveData> {
        if global {
            &self.global_actors
        } else {
            &self.local_actors
        }
    }

    pub fn actors_mut(&mut self, global: bool) -> &mut Vec<ActorSaveData> {
        if global {
            &mut self.global_actors
        } else {
            &mut self.local_actors
        }
    }

    pub fn objects(&self, global: bool) -> &Vec<CustomSaveData> {
        if global {
            &self.global_objects
        } else {
            &self.local_objects
        }
    }

    pub fn objects_mut(&mut self, global: bool) -> &mut Vec<CustomSaveData> {
        if global {
            &mut self.global_objects
        } else {
            &mut self.local_objects
        }
    }

    /// Position of the actor record holding `index` in the matching list.
    pub fn actor_slot(&self, at: IndexRef) -> Option<usize> {
        self.actors(at.global)
            .iter()
            .position(|a| a.custom.object_index == at.index)
    }

    pub fn add_asset(&mut self, path: String) {
        if !self.assets.contains(&path) {
            self.assets.push(path);
        }
    }

    fn token(&self, at: IndexRef) -> RefToken {
        if at.global {
            RefToken::Global(at.index)
        } else {
            RefToken::Local {
                level: self.level_name.clone().unwrap_or_default(),
                index: at.index,
            }
        }
    }

    fn new_record(world: &dyn HostWorld, object: ObjectId, index: u32, tag: Option<String>) -> CustomSaveData {
        let traits = world.save_traits(object);
        let mut record = CustomSaveData::new(
            world.class_of(object).unwrap_or_default(),
            world.name_of(object),
            index,
        );
        record.tag = tag.or_else(|| traits.as_ref().and_then(|t| t.saving_tag.clone()));
        record.recreate = traits.map(|t| t.delete_on_restore).unwrap_or(false);
        record
    }

    /// Track a plain object. Already-tracked objects keep their index.
    pub fn add_object(
        &mut self,
        world: &dyn HostWorld,
        object: ObjectId,
        global: bool,
        tag: Option<String>,
    ) -> IndexRef {
        if let Some(at) = self.registry.find(object) {
            return at;
        }
        let at = self.registry.register(object, global);
        let record = Self::new_record(world, object, at.index, tag);
        self.objects_mut(global).push(record);
        at
    }

    /// Track an actor with its eligible components and, for global actors,
    /// its saveable attached children.
    pub fn add_actor(
        &mut self,
        world: &dyn HostWorld,
        actor: ObjectId,
        global: bool,
        tag: Option<String>,
    ) -> IndexRef {
        if let Some(at) = self.registry.find(actor) {
            return at;
        }
        let at = self.registry.register(actor, global);
        let custom = Self::new_record(world, actor, at.index, tag);
        let actor_tag = custom.tag.clone();
        self.actors_mut(global).push(ActorSaveData {
            custom,
            ..Default::default()
        });
        let slot = self.actors(global).len() - 1;

        for component in world.components_of(actor) {
            let tags = world.component_tags(component);
            if tags.iter().any(|t| t == TAG_DONT_SAVE) {
                continue;
            }
            if !tags.iter().any(|t| t == TAG_FORCE_SAVE) {
                let class = world.class_of(component).unwrap_or_default();
                if world.schema().category_of(&class).excluded_by_default() {
                    continue;
                }
            }
            self.add_component(world, global, slot, actor_tag.as_deref(), component);
        }

        if global {
            self.add_attached_children(world, actor, actor_tag.as_deref());
        }
        at
    }

    /// Track `component` under the actor record at `slot`.
    pub fn add_component(
        &mut self,
        world: &dyn HostWorld,
        global: bool,
        slot: usize,
        actor_tag: Option<&str>,
        component: ObjectId,
    ) {
        if self.registry.contains(component) {
            return;
        }
        let at = self.registry.register(component, global);
        let name = world.name_of(component);
        let mut custom = Self::new_record(world, component, at.index, None);
        custom.tag = actor_tag.map(|tag| format!("{tag}.{name}"));
        self.actors_mut(global)[slot]
            .components
            .push(ComponentSaveData {
                custom,
                ..Default::default()
            });
    }

    fn add_attached_children(&mut self, world: &dyn HostWorld, actor: ObjectId, actor_tag: Option<&str>) {
        for child in world.attached_actors(actor) {
            let Some(traits) = world.save_traits(child) else {
                continue;
            };
            if !traits.should_save || world.is_pending_kill(child) {
                continue;
            }
            let child_tag = actor_tag.and_then(|tag| match world.attached_tag_name(actor, child) {
                Some(suffix) => Some(format!("{tag}.{suffix}")),
                None => {
                    warn!("No attached tag for {}", tag);
                    None
                }
            });
            self.add_actor(world, child, true, child_tag);
        }
    }

    /// Register `object` as a dynamic object, registering its outer chain
    /// first. `None` when the object (or an untracked outer) is ineligible.
    fn track_dynamic(&mut self, world: &dyn HostWorld, object: ObjectId, depth: usize) -> Option<IndexRef> {
        if let Some(at) = self.registry.find(object) {
            return Some(at);
        }
        if depth > MAX_OUTER_DEPTH || !is_valid_dynamic_object(world, object) {
            return None;
        }
        let outer = world.outer_of(object)?;
        let outer_at = self.track_dynamic(world, outer, depth + 1)?;
        let global = self.level_name.is_none() || outer_at.global;
        Some(self.add_object(world, object, global, None))
    }
}

/// Whether `object` can be saved as a standalone record and recreated from
/// its class and outer at restore.
pub fn is_valid_dynamic_object(world: &dyn HostWorld, object: ObjectId) -> bool {
    if !world.is_valid(object) || world.is_standalone(object) || world.is_pending_kill(object) {
        return false;
    }
    match world.class_of(object) {
        Some(class) => world.schema().kind_of(&class).is_dynamic_candidate(),
        None => false,
    }
}

impl ReferenceEncoder for SaveGraph {
    fn encode_reference(&mut self, world: &dyn HostWorld, object: ObjectId) -> Option<RefToken> {
        if !world.is_valid(object) {
            return None;
        }
        let class = world.class_of(object)?;
        let kind = world.schema().kind_of(&class);
        if kind.is_preload_asset() {
            self.add_asset(world.object_path(object));
        }
        if let Some(at) = self.registry.find(object) {
            return Some(self.token(at));
        }
        if kind.forces_soft_reference() {
            return None;
        }
        let at = self.track_dynamic(world, object, 0)?;
        Some(self.token(at))
    }
}
