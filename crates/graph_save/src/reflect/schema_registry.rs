use std::collections::HashMap;

use bevy::prelude::*;

use super::FieldDescriptor;
use crate::host_world::ComponentCategory;

/// Broad kind of a class, as far as the graph assembler cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassKind {
    /// Plain object: the only kind eligible for dynamic discovery.
    #[default]
    Object,
    Actor,
    Component,
    World,
    BlueprintClass,
    DataTable,
    StreamableAsset,
    AnimInstance,
    DataAsset,
    Visual,
    Class,
}

impl ClassKind {
    /// Referenced objects of these kinds are never registered as dynamic
    /// objects; they are written as path references instead.
    pub fn forces_soft_reference(self) -> bool {
        matches!(
            self,
            ClassKind::Component
                | ClassKind::Actor
                | ClassKind::Visual
                | ClassKind::DataAsset
                | ClassKind::StreamableAsset
                | ClassKind::DataTable
                | ClassKind::Class
        )
    }

    /// Hard references to these kinds are collected into the preload list.
    pub fn is_preload_asset(self) -> bool {
        matches!(
            self,
            ClassKind::DataAsset
                | ClassKind::Visual
                | ClassKind::StreamableAsset
                | ClassKind::DataTable
                | ClassKind::AnimInstance
        )
    }

    /// Whether an object of this kind can be recreated from a record.
    pub fn is_dynamic_candidate(self) -> bool {
        !self.forces_soft_reference()
            && !matches!(
                self,
                ClassKind::World | ClassKind::BlueprintClass | ClassKind::AnimInstance
            )
    }
}

/// Reflected description of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSchema {
    pub name: String,
    pub parent: Option<String>,
    pub kind: ClassKind,
    /// Only meaningful for components.
    pub category: ComponentCategory,
    /// Fields declared by this class (parents contribute their own).
    pub fields: Vec<FieldDescriptor>,
}

impl ClassSchema {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            kind,
            category: ComponentCategory::default(),
            fields: Vec::new(),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Object)
    }

    pub fn actor(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Actor)
    }

    pub fn component(name: impl Into<String>, category: ComponentCategory) -> Self {
        Self::new(name, ClassKind::Component).with_category(category)
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_category(mut self, category: ComponentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Explicitly registered class table standing in for runtime reflection.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    classes: HashMap<String, ClassSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. A second registration under the same name is
    /// ignored with a warning.
    pub fn register(&mut self, schema: ClassSchema) {
        if self.classes.contains_key(&schema.name) {
            warn!(
                "SchemaRegistry: duplicate class '{}', ignoring second registration",
                schema.name
            );
            return;
        }
        self.classes.insert(schema.name.clone(), schema);
    }

    pub fn class(&self, name: &str) -> Option<&ClassSchema> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Walks the parent chain. Unknown classes are only `is_a` themselves.
    pub fn is_a(&self, class: &str, base: &str) -> bool {
        let mut current = Some(class);
        // Guards against a parent cycle in a malformed registry.
        let mut depth = 0;
        while let Some(name) = current {
            if name == base {
                return true;
            }
            depth += 1;
            if depth > 64 {
                return false;
            }
            current = self.classes.get(name).and_then(|c| c.parent.as_deref());
        }
        false
    }

    /// Declared kind of the class. Unknown classes are plain objects.
    pub fn kind_of(&self, class: &str) -> ClassKind {
        self.classes
            .get(class)
            .map(|c| c.kind)
            .unwrap_or_default()
    }

    pub fn category_of(&self, class: &str) -> ComponentCategory {
        self.classes
            .get(class)
            .map(|c| c.category)
            .unwrap_or_default()
    }

    /// Every field of `class` including inherited ones, parent fields first.
    pub fn all_fields(&self, class: &str) -> Vec<&FieldDescriptor> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(class);
        while let Some(schema) = current {
            if chain.len() > 64 {
                break;
            }
            chain.push(schema);
            current = schema.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|schema| schema.fields.iter())
            .collect()
    }

    /// Fields flagged for saving, parent fields first.
    pub fn save_eligible_fields(&self, class: &str) -> Vec<&FieldDescriptor> {
        self.all_fields(class)
            .into_iter()
            .filter(|f| f.save_game)
            .collect()
    }

    /// Look up a field by name anywhere in the class chain.
    pub fn find_field(&self, class: &str, field: &str) -> Option<&FieldDescriptor> {
        self.all_fields(class).into_iter().find(|f| f.name == field)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
