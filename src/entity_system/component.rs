//! # Components
//!
//! A component is a plain value attached to one entity. Component types are
//! identified by [`ComponentTypeId`] and must be registered with the
//! [`ComponentLibrary`] before prefabs or entity copies can duplicate them.
//!
//! ## Defining a Component
//!
//! ```
//! use voxel_world::entity_system::{Component, ComponentLibrary};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Health(u32);
//! impl Component for Health {}
//!
//! let mut library = ComponentLibrary::new();
//! library.register::<Health>();
//! let copy = library.copy(&Health(5)).unwrap();
//! assert_eq!(copy.as_any().downcast_ref::<Health>(), Some(&Health(5)));
//! ```

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
};

use crate::error::{Error, Result};

/// Marker trait for values that can be stored on an entity.
///
/// Implementors get [`ComponentAny`] for free, which provides the downcasting
/// used by the component table.
pub trait Component: ComponentAny + Send + Sync + fmt::Debug + 'static {}

/// Type erasure helpers shared by all components.
pub trait ComponentAny {
    /// Borrows the component as `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrows the component as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Converts a boxed component into a boxed `Any`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// The type identifier of the concrete component.
    fn component_type(&self) -> ComponentTypeId;
}

impl<T: Component> ComponentAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn component_type(&self) -> ComponentTypeId {
        ComponentTypeId::of::<T>()
    }
}

/// Downcasts a boxed component to its concrete type.
pub fn downcast_component<T: Component>(component: Box<dyn Component>) -> Option<Box<T>> {
    component.into_any().downcast::<T>().ok()
}

/// Stable identifier of a component type.
///
/// Carries the type name for diagnostics; equality and hashing only use the
/// underlying `TypeId`.
#[derive(Clone, Copy)]
pub struct ComponentTypeId {
    id: TypeId,
    name: &'static str,
}

impl ComponentTypeId {
    /// Identifier of the component type `T`.
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ComponentTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentTypeId {}

impl Hash for ComponentTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

type CopyFn = fn(&dyn Component) -> Option<Box<dyn Component>>;

fn copy_as<T: Component + Clone>(component: &dyn Component) -> Option<Box<dyn Component>> {
    component
        .as_any()
        .downcast_ref::<T>()
        .map(|c| Box::new(c.clone()) as Box<dyn Component>)
}

/// Metadata kept for each registered component type.
#[derive(Clone, Copy)]
pub struct ComponentMetadata {
    /// Type identifier.
    pub type_id: ComponentTypeId,
    copy: CopyFn,
}

impl fmt::Debug for ComponentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMetadata")
            .field("type_id", &self.type_id)
            .finish()
    }
}

/// Registry of component types and their copy functions.
///
/// Every component type that is copied (prefab instancing, [`copy`] of an
/// entity) registers itself here at startup. Copies are deep because each type
/// supplies its own `Clone`.
///
/// [`copy`]: crate::entity_system::EntityManager::copy
#[derive(Debug, Default)]
pub struct ComponentLibrary {
    metadata: HashMap<ComponentTypeId, ComponentMetadata>,
}

impl ComponentLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, replacing any previous registration.
    pub fn register<T: Component + Clone>(&mut self) {
        let type_id = ComponentTypeId::of::<T>();
        self.metadata.insert(
            type_id,
            ComponentMetadata {
                type_id,
                copy: copy_as::<T>,
            },
        );
    }

    /// Returns true if `type_id` has been registered.
    pub fn is_registered(&self, type_id: ComponentTypeId) -> bool {
        self.metadata.contains_key(&type_id)
    }

    /// Metadata for a registered type.
    pub fn metadata(&self, type_id: ComponentTypeId) -> Option<&ComponentMetadata> {
        self.metadata.get(&type_id)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Deep copies a component through its registered copy function.
    pub fn copy(&self, component: &dyn Component) -> Result<Box<dyn Component>> {
        let type_id = component.component_type();
        let metadata = self
            .metadata
            .get(&type_id)
            .ok_or_else(|| Error::unregistered_component(type_id.name()))?;
        (metadata.copy)(component).ok_or_else(|| Error::unregistered_component(type_id.name()))
    }
}
