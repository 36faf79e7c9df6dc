// ---------------------------------------------------------------------------
// HostWorld: the narrow interface between the save engine and the live world
// ---------------------------------------------------------------------------
//
// The engine never owns host objects. Everything it knows about the world is
// an `ObjectId` plus whatever this trait answers. Capability hooks default to
// no-ops so a host only overrides what its objects actually implement.

use std::fmt;

use bevy::prelude::*;

use crate::reflect::{FieldValue, SchemaRegistry};
use crate::save_types::SavedTransform;

/// Opaque handle to a host object (actor, component, or plain object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Component categories the graph assembler filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentCategory {
    /// Positional component with no special handling.
    #[default]
    Scene,
    /// Non-scene logic component.
    Logic,
    Mesh,
    Fx,
    Audio,
    Shape,
    Arrow,
    Frustum,
    Timeline,
}

impl ComponentCategory {
    /// Visual, physics, audio and timeline components are skipped unless
    /// tagged `ForceSave`.
    pub fn excluded_by_default(self) -> bool {
        matches!(
            self,
            ComponentCategory::Mesh
                | ComponentCategory::Fx
                | ComponentCategory::Audio
                | ComponentCategory::Shape
                | ComponentCategory::Arrow
                | ComponentCategory::Frustum
                | ComponentCategory::Timeline
        )
    }
}

/// Component tag that removes a component from the save set.
pub const TAG_DONT_SAVE: &str = "DontSave";
/// Component tag that saves a component regardless of its category.
pub const TAG_FORCE_SAVE: &str = "ForceSave";

/// Answers of an object implementing the save capability.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTraits {
    /// Stable cross-session identity.
    pub saving_tag: Option<String>,
    pub block_saving: bool,
    pub block_reason: String,
    /// Destroy-and-respawn at restore instead of matching a live instance.
    pub delete_on_restore: bool,
    pub respawn_on_level_change: bool,
    pub should_save: bool,
}

impl Default for SaveTraits {
    fn default() -> Self {
        Self {
            saving_tag: None,
            block_saving: false,
            block_reason: "None".to_string(),
            delete_on_restore: false,
            respawn_on_level_change: false,
            should_save: true,
        }
    }
}

/// Single-slot status text for loading UI.
pub trait StatusSink {
    fn set_status(&mut self, text: &str);
}

/// Discards status text.
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn set_status(&mut self, _text: &str) {}
}

impl StatusSink for Vec<String> {
    fn set_status(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Everything the save engine needs from the host world.
pub trait HostWorld {
    /// Reflection data for every class the world can contain.
    fn schema(&self) -> &SchemaRegistry;

    // -- Well-known roots ---------------------------------------------------

    fn session_object(&self) -> Option<ObjectId>;
    fn controller(&self) -> Option<ObjectId>;
    fn avatar(&self) -> Option<ObjectId>;
    fn game_state(&self) -> Option<ObjectId>;

    /// Extra actors saved under a fixed tag in the global list.
    fn custom_global_tags(&self, _controller: ObjectId, _avatar: ObjectId) -> Vec<(String, ObjectId)> {
        Vec::new()
    }

    /// Extra actors saved under a fixed tag in the current level.
    fn custom_local_tags(&self, _controller: ObjectId, _avatar: ObjectId) -> Vec<(String, ObjectId)> {
        Vec::new()
    }

    // -- Level and clock ----------------------------------------------------

    fn current_level_name(&self) -> String;
    /// Seconds since the current level started.
    fn elapsed_time(&self) -> f64;
    /// Begin loading a level. Completion is reported back through
    /// `SaveSession::on_level_activated`.
    fn open_level(&mut self, level: &str);

    // -- Identity -----------------------------------------------------------

    fn is_valid(&self, id: ObjectId) -> bool;
    fn class_of(&self, id: ObjectId) -> Option<String>;
    fn name_of(&self, id: ObjectId) -> String;
    fn outer_of(&self, id: ObjectId) -> Option<ObjectId>;
    /// Native path text, used when an object is referenced but not tracked.
    fn object_path(&self, id: ObjectId) -> String;
    fn find_by_path(&self, path: &str) -> Option<ObjectId>;
    fn is_standalone(&self, _id: ObjectId) -> bool {
        false
    }
    fn is_pending_kill(&self, _id: ObjectId) -> bool {
        false
    }

    // -- Actors and components ----------------------------------------------

    /// Live actors implementing the save capability.
    fn save_capable_actors(&self) -> Vec<ObjectId>;
    fn actors_of_class(&self, class: &str) -> Vec<ObjectId>;
    fn components_of(&self, actor: ObjectId) -> Vec<ObjectId>;
    fn find_component(&self, actor: ObjectId, name: &str) -> Option<ObjectId> {
        self.components_of(actor)
            .into_iter()
            .find(|c| self.name_of(*c) == name)
    }
    fn attached_actors(&self, actor: ObjectId) -> Vec<ObjectId>;
    fn component_tags(&self, _component: ObjectId) -> Vec<String> {
        Vec::new()
    }
    fn root_component(&self, actor: ObjectId) -> Option<ObjectId>;
    fn owner_of(&self, component: ObjectId) -> Option<ObjectId>;
    fn is_movable(&self, component: ObjectId) -> bool;

    // -- Transforms and attachment ------------------------------------------

    fn actor_transform(&self, actor: ObjectId) -> SavedTransform;
    fn set_actor_transform(&mut self, actor: ObjectId, transform: &SavedTransform);
    fn relative_transform(&self, component: ObjectId) -> SavedTransform;
    fn set_relative_transform(&mut self, component: ObjectId, transform: &SavedTransform);
    /// Parent component and socket of the actor's root, if attached.
    fn attach_parent(&self, actor: ObjectId) -> Option<(ObjectId, Option<String>)>;
    fn attach_to_component(&mut self, actor: ObjectId, parent: ObjectId, socket: Option<&str>);

    // -- Lifecycle ----------------------------------------------------------

    fn spawn_actor(&mut self, class: &str, transform: &SavedTransform) -> Option<ObjectId>;
    fn destroy_actor(&mut self, actor: ObjectId);
    fn create_object(&mut self, class: &str, outer: ObjectId) -> Option<ObjectId>;

    // -- Field access -------------------------------------------------------

    fn get_field(&self, id: ObjectId, field: &str) -> Option<FieldValue>;
    /// Returns false when the object has no such live property.
    fn set_field(&mut self, id: ObjectId, field: &str, value: FieldValue) -> bool;

    // -- Save capability ----------------------------------------------------

    /// `None` when the object does not implement the save capability.
    fn save_traits(&self, _id: ObjectId) -> Option<SaveTraits> {
        None
    }
    /// Tag suffix for an attached child of a tagged actor.
    fn attached_tag_name(&self, _parent: ObjectId, _child: ObjectId) -> Option<String> {
        None
    }
    fn custom_assets_to_load(&self, _id: ObjectId) -> Vec<ObjectId> {
        Vec::new()
    }
    fn pre_save(&mut self, _id: ObjectId) {}
    fn post_save(&mut self, _id: ObjectId) {}
    fn pre_restore(&mut self, _id: ObjectId) {}
    fn on_restore(&mut self, _id: ObjectId, _session: ObjectId, _controller: ObjectId) {}

    /// Re-attach a restored actor to its saved parent.
    fn handle_reattach(
        &mut self,
        actor: ObjectId,
        parent: ObjectId,
        socket: Option<&str>,
        relative: &SavedTransform,
    ) {
        self.attach_to_component(actor, parent, socket);
        match self.root_component(actor) {
            Some(root) => self.set_relative_transform(root, relative),
            None => warn!("Actor {} has no root component to place", self.name_of(actor)),
        }
    }

    // -- Level change -------------------------------------------------------

    /// Live actors implementing the level-change capability.
    fn level_change_actors(&self) -> Vec<ObjectId> {
        Vec::new()
    }
    /// Returns true when `actor` is the handoff target for `position_tag`.
    fn on_level_change(
        &mut self,
        _actor: ObjectId,
        _controller: ObjectId,
        _avatar: ObjectId,
        _position_tag: &str,
    ) -> bool {
        false
    }
    fn post_level_change(&mut self, _actor: ObjectId, _controller: ObjectId, _avatar: ObjectId) -> bool {
        false
    }
}
