//! # Prefabs
//!
//! A prefab is a named, immutable template of starter components. Entities
//! created from a prefab receive deep copies of those components, so editing
//! an instance never reaches back into the template.

use std::{collections::HashMap, sync::Arc};

use super::{Component, ComponentTypeId};

/// Named template of starter components.
#[derive(Debug)]
pub struct Prefab {
    name: String,
    components: Vec<Box<dyn Component>>,
    persisted: bool,
    always_relevant: bool,
}

impl Prefab {
    /// Starts building a prefab called `name`.
    pub fn builder(name: impl Into<String>) -> PrefabBuilder {
        PrefabBuilder {
            prefab: Prefab {
                name: name.into(),
                components: Vec::new(),
                persisted: true,
                always_relevant: false,
            },
        }
    }

    /// The prefab's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances are written to storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Whether instances ignore relevance regions.
    pub fn is_always_relevant(&self) -> bool {
        self.always_relevant
    }

    /// The template components.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.components.iter().map(|c| c.as_ref())
    }

    /// The template component `T`, if present.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// True if the template has a component of type `type_id`.
    pub fn has(&self, type_id: ComponentTypeId) -> bool {
        self.components().any(|c| c.component_type() == type_id)
    }
}

/// Builder for [`Prefab`].
#[derive(Debug)]
pub struct PrefabBuilder {
    prefab: Prefab,
}

impl PrefabBuilder {
    /// Adds a component, replacing one of the same type.
    pub fn with<T: Component>(mut self, component: T) -> Self {
        let type_id = ComponentTypeId::of::<T>();
        self.prefab.components.retain(|c| c.component_type() != type_id);
        self.prefab.components.push(Box::new(component));
        self
    }

    /// Sets the persisted flag.
    pub fn persisted(mut self, persisted: bool) -> Self {
        self.prefab.persisted = persisted;
        self
    }

    /// Sets the always-relevant flag.
    pub fn always_relevant(mut self, always_relevant: bool) -> Self {
        self.prefab.always_relevant = always_relevant;
        self
    }

    /// Finishes the prefab.
    pub fn build(self) -> Prefab {
        self.prefab
    }
}

/// Registry of prefabs by name.
#[derive(Debug, Default)]
pub struct PrefabManager {
    prefabs: HashMap<String, Arc<Prefab>>,
}

impl PrefabManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefab, replacing any prefab with the same name.
    pub fn register(&mut self, prefab: Prefab) -> Arc<Prefab> {
        let prefab = Arc::new(prefab);
        if self
            .prefabs
            .insert(prefab.name().to_string(), prefab.clone())
            .is_some()
        {
            log::debug!("Replaced prefab \"{}\"", prefab.name());
        }
        prefab
    }

    /// Looks up a prefab by name.
    pub fn get(&self, name: &str) -> Option<Arc<Prefab>> {
        self.prefabs.get(name).cloned()
    }

    /// Number of registered prefabs.
    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    /// True when no prefab is registered.
    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }
}
