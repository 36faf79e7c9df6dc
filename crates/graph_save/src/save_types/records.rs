// ---------------------------------------------------------------------------
// Per-object records
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use bevy::math::{Quat, Vec3};
use bevy::prelude::Transform;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Encoded field values of one object, split so array and map delimiters
/// never collide with scalar text.
#[derive(Serialize, Deserialize, Encode, Decode, Default, Clone, Debug, PartialEq)]
pub struct PropertyMaps {
    pub singles: BTreeMap<String, String>,
    pub arrays: BTreeMap<String, Vec<String>>,
    pub maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl PropertyMaps {
    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.arrays.is_empty() && self.maps.is_empty()
    }

    pub fn clear(&mut self) {
        self.singles.clear();
        self.arrays.clear();
        self.maps.clear();
    }

    /// True when any encoded value equals `text` exactly.
    pub fn contains_text(&self, text: &str) -> bool {
        self.singles.values().any(|v| v == text)
            || self.arrays.values().flatten().any(|v| v == text)
            || self
                .maps
                .values()
                .flat_map(|m| m.iter())
                .any(|(k, v)| k == text || v == text)
    }
}

/// Serialized state of one object plus its identity in the index lists.
#[derive(Serialize, Deserialize, Encode, Decode, Default, Clone, Debug, PartialEq)]
pub struct CustomSaveData {
    pub class: String,
    pub name: String,
    /// Stable cross-session identity.
    pub tag: Option<String>,
    /// Position in the global or local index list.
    pub object_index: u32,
    /// Outer (dynamic objects) or attach parent component (actors).
    pub outer_object_index: Option<u32>,
    pub outer_is_global: bool,
    /// Destroy and respawn at restore instead of matching a live instance.
    pub recreate: bool,
    pub properties: PropertyMaps,
}

impl CustomSaveData {
    pub fn new(class: impl Into<String>, name: impl Into<String>, object_index: u32) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            object_index,
            ..Default::default()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// A saved component: relative transform plus its own custom data.
#[derive(Serialize, Deserialize, Encode, Decode, Default, Clone, Debug, PartialEq)]
pub struct ComponentSaveData {
    pub transform: SavedTransform,
    pub custom: CustomSaveData,
}

/// A saved actor with its attachment and saved components.
#[derive(Serialize, Deserialize, Encode, Decode, Default, Clone, Debug, PartialEq)]
pub struct ActorSaveData {
    pub custom: CustomSaveData,
    /// World transform.
    pub transform: SavedTransform,
    /// Transform relative to the attach parent; identity when unattached.
    pub relative_transform: SavedTransform,
    pub attach_socket: Option<String>,
    pub components: Vec<ComponentSaveData>,
}

impl ActorSaveData {
    pub fn component(&self, name: &str) -> Option<&ComponentSaveData> {
        self.components.iter().find(|c| c.custom.name == name)
    }

    /// The actor record itself or one of its component records.
    pub fn record_with_index(&self, index: u32) -> Option<&CustomSaveData> {
        if self.custom.object_index == index {
            return Some(&self.custom);
        }
        self.components
            .iter()
            .map(|c| &c.custom)
            .find(|c| c.object_index == index)
    }
}

/// Plain-array transform so the snapshot stays independent of math crate layout.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct SavedTransform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for SavedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SavedTransform {
    pub const IDENTITY: SavedTransform = SavedTransform {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: [x, y, z],
            ..Self::IDENTITY
        }
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &SavedTransform, eps: f32) -> bool {
        let close = |a: &[f32], b: &[f32]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= eps);
        close(&self.translation, &other.translation)
            && close(&self.rotation, &other.rotation)
            && close(&self.scale, &other.scale)
    }
}

impl From<Transform> for SavedTransform {
    fn from(t: Transform) -> Self {
        Self {
            translation: t.translation.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
        }
    }
}

impl From<SavedTransform> for Transform {
    fn from(t: SavedTransform) -> Self {
        Transform {
            translation: Vec3::from_array(t.translation),
            rotation: Quat::from_array(t.rotation),
            scale: Vec3::from_array(t.scale),
        }
    }
}
