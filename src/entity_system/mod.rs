//! # Entity System
//!
//! Entities are plain ids with components attached. This module holds the
//! storage side (component table, pools), the identity side (ids and cached
//! references) and the coordination side (the [`EntityManager`], lifecycle
//! events and structural subscribers).
//!
//! ## Architecture
//!
//! - [`ComponentTable`] stores components per type and entity
//! - [`EntityPool`] wraps a table with a reference cache and an active set
//! - [`EntityManager`] allocates ids, routes entities to pools and dispatches
//!
//! ## Threading
//!
//! The manager is owned by the main thread. Components are `Send + Sync` so a
//! pool can be wrapped in an [`MtResource`](crate::core::MtResource) and
//! handed to workers when needed.
//!
//! ## Usage
//!
//! ```
//! use voxel_world::entity_system::{Component, ComponentTypeId, EntityManager};
//!
//! #[derive(Debug, Clone)]
//! struct Burning;
//! impl Component for Burning {}
//!
//! let mut manager = EntityManager::new();
//! let torch = manager.create(vec![Box::new(Burning)]);
//! assert_eq!(manager.entities_with(&[ComponentTypeId::of::<Burning>()]), vec![torch.clone()]);
//!
//! manager.destroy(torch.id());
//! assert!(!torch.is_valid());
//! ```

mod component;
mod component_table;
mod components;
mod entity_ref;
mod events;
mod manager;
mod pool;
mod prefab;
mod subscribers;

pub use component::{downcast_component, Component, ComponentAny, ComponentLibrary, ComponentMetadata, ComponentTypeId};
pub use component_table::ComponentTable;
pub use components::{EntityInfoComponent, LocationComponent};
pub use entity_ref::EntityRef;
pub use events::{BeforeEntityCreated, EventBus, EventKind, EventSystem, LifecycleEvent};
pub use manager::EntityManager;
pub use pool::{EntityPool, PoolId, PoolKind};
pub use prefab::{Prefab, PrefabBuilder, PrefabManager};
pub use subscribers::{EntityChangeSubscriber, EntityDestroySubscriber, SubscriberId, SubscriptionQueue};

pub(crate) use subscribers::SubscriberRegistry;

/// Identifier of an entity. Ids are issued from 1 upwards and never reused.
pub type EntityId = u64;

/// The id of the null entity.
pub const NULL_ID: EntityId = 0;
