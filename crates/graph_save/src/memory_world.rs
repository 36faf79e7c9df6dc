// ---------------------------------------------------------------------------
// MemoryWorld: an in-memory host implementing every collaborator interface
// ---------------------------------------------------------------------------
//
// Objects live in one id-ordered map. Actors own components; the first
// component of an actor is its root. Opening a level is two-phase like a
// real engine: `open_level` only records the request, and
// `activate_pending_level` tears down every non-persistent object so the
// caller can populate the new level before restoring.
//
// Hook calls on save-capable objects are appended to `hook_log` as
// `"<hook> <object name>"` so tests can assert on ordering.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use crate::host_world::{HostWorld, ObjectId, SaveTraits};
use crate::reflect::{ClassKind, FieldValue, SchemaRegistry};
use crate::save_types::SavedTransform;

/// One live object.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryObject {
    pub class: String,
    pub name: String,
    pub outer: Option<ObjectId>,
    pub path: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// `Some` when the object implements the save capability.
    pub traits: Option<SaveTraits>,
    pub standalone: bool,
    pub pending_kill: bool,
    /// Survives `activate_pending_level`.
    pub persistent: bool,
    /// World transform for actors, relative transform for components.
    pub transform: SavedTransform,
    pub components: Vec<ObjectId>,
    pub root: Option<ObjectId>,
    pub owner: Option<ObjectId>,
    pub movable: bool,
    pub tags: Vec<String>,
    /// Parent component and socket of an actor's root.
    pub attach: Option<(ObjectId, Option<String>)>,
    /// Suffix used when this actor is saved as an attached child.
    pub attached_tag: Option<String>,
    /// Position tag this actor accepts as level-change handoff.
    pub level_change_target: Option<String>,
    pub custom_assets: Vec<ObjectId>,
}

impl MemoryObject {
    fn new(class: &str, name: &str, outer: Option<ObjectId>, path: String) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            outer,
            path,
            fields: BTreeMap::new(),
            traits: None,
            standalone: false,
            pending_kill: false,
            persistent: false,
            transform: SavedTransform::IDENTITY,
            components: Vec::new(),
            root: None,
            owner: None,
            movable: true,
            tags: Vec::new(),
            attach: None,
            attached_tag: None,
            level_change_target: None,
            custom_assets: Vec::new(),
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct MemoryWorld {
    schema: SchemaRegistry,
    objects: BTreeMap<ObjectId, MemoryObject>,
    next_id: u64,
    level: String,
    pending_level: Option<String>,
    elapsed: f64,
    session: Option<ObjectId>,
    controller: Option<ObjectId>,
    avatar: Option<ObjectId>,
    game_state: Option<ObjectId>,
    global_tags: Vec<(String, ObjectId)>,
    local_tags: Vec<(String, ObjectId)>,
    /// Components created with every actor of a class: (name, class).
    templates: HashMap<String, Vec<(String, String)>>,
    /// Save traits every new actor of a class starts with.
    class_traits: HashMap<String, SaveTraits>,
    pub hook_log: Vec<String>,
}

impl MemoryWorld {
    pub fn new(schema: SchemaRegistry, level: &str) -> Self {
        Self {
            schema,
            objects: BTreeMap::new(),
            next_id: 1,
            level: level.to_string(),
            pending_level: None,
            elapsed: 0.0,
            session: None,
            controller: None,
            avatar: None,
            game_state: None,
            global_tags: Vec::new(),
            local_tags: Vec::new(),
            templates: HashMap::new(),
            class_traits: HashMap::new(),
            hook_log: Vec::new(),
        }
    }

    // -- Setup ------------------------------------------------------------------

    /// Components every spawned actor of `class` gets; the first is the root.
    pub fn set_actor_template(&mut self, class: &str, components: &[(&str, &str)]) {
        self.templates.insert(
            class.to_string(),
            components
                .iter()
                .map(|(name, class)| (name.to_string(), class.to_string()))
                .collect(),
        );
    }

    /// Save traits given to every actor of `class` created from now on,
    /// including actors spawned by a restore.
    pub fn set_class_traits(&mut self, class: &str, traits: SaveTraits) {
        self.class_traits.insert(class.to_string(), traits);
    }

    fn insert(&mut self, object: MemoryObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let mut object = object;
        for field in self.schema.all_fields(&object.class) {
            object
                .fields
                .entry(field.name.clone())
                .or_insert_with(|| field.ty.default_value());
        }
        self.objects.insert(id, object);
        id
    }

    fn child_path(&self, outer: Option<ObjectId>, name: &str) -> String {
        match outer.and_then(|o| self.objects.get(&o)) {
            Some(parent) => format!("{}.{}", parent.path, name),
            None => format!("/Game/Maps/{}.{}", self.level, name),
        }
    }

    /// Create a plain object.
    pub fn add_object(&mut self, class: &str, name: &str, outer: Option<ObjectId>) -> ObjectId {
        let path = self.child_path(outer, name);
        self.insert(MemoryObject::new(class, name, outer, path))
    }

    /// Create a standalone asset at `path`. Assets survive level changes.
    pub fn add_asset(&mut self, class: &str, path: &str) -> ObjectId {
        let name = path.rsplit(['/', '.']).next().unwrap_or(path).to_string();
        let mut object = MemoryObject::new(class, &name, None, path.to_string());
        object.standalone = true;
        object.persistent = true;
        self.insert(object)
    }

    /// Create an actor with its template components.
    pub fn add_actor(&mut self, class: &str, name: &str, transform: SavedTransform) -> ObjectId {
        let path = self.child_path(None, name);
        let mut object = MemoryObject::new(class, name, None, path);
        object.transform = transform;
        object.traits = self.class_traits.get(class).cloned();
        let actor = self.insert(object);

        let template = self.templates.get(class).cloned().unwrap_or_default();
        for (component_name, component_class) in template {
            self.add_component(actor, &component_class, &component_name);
        }
        actor
    }

    /// Add a component to `actor`. The first component becomes the root.
    pub fn add_component(&mut self, actor: ObjectId, class: &str, name: &str) -> ObjectId {
        let path = self.child_path(Some(actor), name);
        let mut object = MemoryObject::new(class, name, Some(actor), path);
        object.owner = Some(actor);
        let component = self.insert(object);
        if let Some(owner) = self.objects.get_mut(&actor) {
            owner.components.push(component);
            if owner.root.is_none() {
                owner.root = Some(component);
            }
        }
        component
    }

    pub fn set_roots(&mut self, session: ObjectId, controller: ObjectId, avatar: ObjectId, game_state: ObjectId) {
        self.session = Some(session);
        self.controller = Some(controller);
        self.avatar = Some(avatar);
        self.game_state = Some(game_state);
    }

    pub fn add_global_tag(&mut self, tag: &str, actor: ObjectId) {
        self.global_tags.push((tag.to_string(), actor));
    }

    pub fn add_local_tag(&mut self, tag: &str, actor: ObjectId) {
        self.local_tags.push((tag.to_string(), actor));
    }

    pub fn object(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut MemoryObject> {
        self.objects.get_mut(&id)
    }

    pub fn set_traits(&mut self, id: ObjectId, traits: SaveTraits) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.traits = Some(traits);
        }
    }

    pub fn field(&self, id: ObjectId, name: &str) -> Option<&FieldValue> {
        self.objects.get(&id).and_then(|o| o.fields.get(name))
    }

    /// Set a field directly, bypassing the schema check.
    pub fn put_field(&mut self, id: ObjectId, name: &str, value: FieldValue) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.fields.insert(name.to_string(), value);
        }
    }

    /// First live object with `name`.
    pub fn find_named(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name && !o.pending_kill)
            .map(|(id, _)| *id)
    }

    /// Ids of live objects of exactly `class`, in creation order.
    pub fn objects_of_class(&self, class: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.class == class)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every object, including pending-kill ones, in id order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &MemoryObject)> + '_ {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // -- Clock and levels -------------------------------------------------------

    pub fn set_elapsed(&mut self, elapsed: f64) {
        self.elapsed = elapsed;
    }

    pub fn advance(&mut self, seconds: f64) {
        self.elapsed += seconds;
    }

    pub fn pending_level(&self) -> Option<&str> {
        self.pending_level.as_deref()
    }

    /// Finish a requested level open: drop every non-persistent object, the
    /// non-session roots and the custom tags, reset the clock and switch to
    /// the new level. Returns the activated level.
    pub fn activate_pending_level(&mut self) -> Option<String> {
        let level = self.pending_level.take()?;
        self.objects.retain(|_, o| o.persistent);
        self.controller = None;
        self.avatar = None;
        self.game_state = None;
        if self.session.is_some_and(|s| !self.objects.contains_key(&s)) {
            self.session = None;
        }
        self.global_tags.clear();
        self.local_tags.clear();
        self.elapsed = 0.0;
        self.level = level.clone();
        Some(level)
    }

    fn log_hook(&mut self, hook: &str, id: ObjectId) {
        if let Some(object) = self.objects.get(&id) {
            if object.traits.is_some() {
                let line = format!("{} {}", hook, object.name);
                self.hook_log.push(line);
            }
        }
    }

    fn live(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.get(&id).filter(|o| !o.pending_kill)
    }

    fn is_actor(&self, object: &MemoryObject) -> bool {
        self.schema.kind_of(&object.class) == ClassKind::Actor
    }
}

impl HostWorld for MemoryWorld {
    fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    fn session_object(&self) -> Option<ObjectId> {
        self.session
    }

    fn controller(&self) -> Option<ObjectId> {
        self.controller
    }

    fn avatar(&self) -> Option<ObjectId> {
        self.avatar
    }

    fn game_state(&self) -> Option<ObjectId> {
        self.game_state
    }

    fn custom_global_tags(&self, _controller: ObjectId, _avatar: ObjectId) -> Vec<(String, ObjectId)> {
        self.global_tags.clone()
    }

    fn custom_local_tags(&self, _controller: ObjectId, _avatar: ObjectId) -> Vec<(String, ObjectId)> {
        self.local_tags.clone()
    }

    fn current_level_name(&self) -> String {
        format!("/Game/Maps/{0}.{0}", self.level)
    }

    fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    fn open_level(&mut self, level: &str) {
        self.pending_level = Some(level.to_string());
    }

    fn is_valid(&self, id: ObjectId) -> bool {
        self.live(id).is_some()
    }

    fn class_of(&self, id: ObjectId) -> Option<String> {
        self.objects.get(&id).map(|o| o.class.clone())
    }

    fn name_of(&self, id: ObjectId) -> String {
        self.objects
            .get(&id)
            .map(|o| o.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn outer_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.outer)
    }

    fn object_path(&self, id: ObjectId) -> String {
        self.objects
            .get(&id)
            .map(|o| o.path.clone())
            .unwrap_or_default()
    }

    fn find_by_path(&self, path: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.path == path && !o.pending_kill)
            .map(|(id, _)| *id)
    }

    fn is_standalone(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.standalone)
    }

    fn is_pending_kill(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|o| o.pending_kill)
    }

    fn save_capable_actors(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.traits.is_some() && !o.pending_kill && self.is_actor(o))
            .map(|(id, _)| *id)
            .collect()
    }

    fn actors_of_class(&self, class: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| !o.pending_kill && self.is_actor(o) && self.schema.is_a(&o.class, class))
            .map(|(id, _)| *id)
            .collect()
    }

    fn components_of(&self, actor: ObjectId) -> Vec<ObjectId> {
        self.live(actor)
            .map(|o| o.components.clone())
            .unwrap_or_default()
    }

    fn attached_actors(&self, actor: ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| {
                !o.pending_kill
                    && o.attach
                        .as_ref()
                        .and_then(|(parent, _)| self.objects.get(parent))
                        .is_some_and(|p| p.owner == Some(actor))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn component_tags(&self, component: ObjectId) -> Vec<String> {
        self.objects
            .get(&component)
            .map(|o| o.tags.clone())
            .unwrap_or_default()
    }

    fn root_component(&self, actor: ObjectId) -> Option<ObjectId> {
        self.live(actor).and_then(|o| o.root)
    }

    fn owner_of(&self, component: ObjectId) -> Option<ObjectId> {
        self.objects.get(&component).and_then(|o| o.owner)
    }

    fn is_movable(&self, component: ObjectId) -> bool {
        self.objects.get(&component).is_some_and(|o| o.movable)
    }

    fn actor_transform(&self, actor: ObjectId) -> SavedTransform {
        self.objects
            .get(&actor)
            .map(|o| o.transform)
            .unwrap_or_default()
    }

    fn set_actor_transform(&mut self, actor: ObjectId, transform: &SavedTransform) {
        if let Some(object) = self.objects.get_mut(&actor) {
            object.transform = *transform;
        }
    }

    fn relative_transform(&self, component: ObjectId) -> SavedTransform {
        self.actor_transform(component)
    }

    fn set_relative_transform(&mut self, component: ObjectId, transform: &SavedTransform) {
        self.set_actor_transform(component, transform);
    }

    fn attach_parent(&self, actor: ObjectId) -> Option<(ObjectId, Option<String>)> {
        self.live(actor).and_then(|o| o.attach.clone())
    }

    fn attach_to_component(&mut self, actor: ObjectId, parent: ObjectId, socket: Option<&str>) {
        if let Some(object) = self.objects.get_mut(&actor) {
            object.attach = Some((parent, socket.map(str::to_string)));
        }
    }

    fn spawn_actor(&mut self, class: &str, transform: &SavedTransform) -> Option<ObjectId> {
        if self.schema.kind_of(class) != ClassKind::Actor {
            return None;
        }
        let name = format!("{}_{}", class, self.next_id);
        Some(self.add_actor(class, &name, *transform))
    }

    fn destroy_actor(&mut self, actor: ObjectId) {
        let components = self.components_of(actor);
        for id in components.into_iter().chain(std::iter::once(actor)) {
            if let Some(object) = self.objects.get_mut(&id) {
                object.pending_kill = true;
            }
        }
        let dead: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.pending_kill)
            .map(|(id, _)| *id)
            .collect();
        for object in self.objects.values_mut() {
            if object.attach.as_ref().is_some_and(|(p, _)| dead.contains(p)) {
                object.attach = None;
            }
        }
    }

    fn create_object(&mut self, class: &str, outer: ObjectId) -> Option<ObjectId> {
        if !self.schema.contains(class) || !self.is_valid(outer) {
            return None;
        }
        let name = format!("{}_{}", class, self.next_id);
        Some(self.add_object(class, &name, Some(outer)))
    }

    fn get_field(&self, id: ObjectId, field: &str) -> Option<FieldValue> {
        self.live(id).and_then(|o| o.fields.get(field).cloned())
    }

    fn set_field(&mut self, id: ObjectId, field: &str, value: FieldValue) -> bool {
        let Some(class) = self.live(id).map(|o| o.class.clone()) else {
            return false;
        };
        if self.schema.find_field(&class, field).is_none() {
            return false;
        }
        self.put_field(id, field, value);
        true
    }

    fn save_traits(&self, id: ObjectId) -> Option<SaveTraits> {
        self.live(id).and_then(|o| o.traits.clone())
    }

    fn attached_tag_name(&self, _parent: ObjectId, child: ObjectId) -> Option<String> {
        self.objects.get(&child).and_then(|o| o.attached_tag.clone())
    }

    fn custom_assets_to_load(&self, id: ObjectId) -> Vec<ObjectId> {
        self.objects
            .get(&id)
            .map(|o| o.custom_assets.clone())
            .unwrap_or_default()
    }

    fn pre_save(&mut self, id: ObjectId) {
        self.log_hook("pre_save", id);
    }

    fn post_save(&mut self, id: ObjectId) {
        self.log_hook("post_save", id);
    }

    fn pre_restore(&mut self, id: ObjectId) {
        self.log_hook("pre_restore", id);
    }

    fn on_restore(&mut self, id: ObjectId, _session: ObjectId, _controller: ObjectId) {
        self.log_hook("on_restore", id);
    }

    fn level_change_actors(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, o)| o.level_change_target.is_some() && !o.pending_kill)
            .map(|(id, _)| *id)
            .collect()
    }

    fn on_level_change(
        &mut self,
        actor: ObjectId,
        _controller: ObjectId,
        _avatar: ObjectId,
        position_tag: &str,
    ) -> bool {
        let accepts = self
            .objects
            .get(&actor)
            .and_then(|o| o.level_change_target.as_deref())
            .is_some_and(|t| t == position_tag);
        if accepts {
            let line = format!("on_level_change {}", self.name_of(actor));
            self.hook_log.push(line);
        }
        accepts
    }

    fn post_level_change(&mut self, actor: ObjectId, _controller: ObjectId, _avatar: ObjectId) -> bool {
        let line = format!("post_level_change {}", self.name_of(actor));
        self.hook_log.push(line);
        true
    }
}
