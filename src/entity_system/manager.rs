//! # Entity Manager
//!
//! Issues entity ids, routes entities to pools, dispatches lifecycle events
//! and notifies structural subscribers.
//!
//! ## Leniency
//!
//! Misuse that content code commonly triggers (unknown prefab names, adding a
//! component twice, acting on an entity that is not active) is logged and
//! resolved with a null reference or a no-op. Acting through a reference that
//! was invalidated by a destroy is different: it returns
//! [`ErrorKind::StaleEntity`](crate::error::ErrorKind::StaleEntity).
//!
//! ## Event Order
//!
//! | operation | events | subscriber calls |
//! |-----------|--------|------------------|
//! | create | `BeforeEntityCreated`, `OnAddedComponent`, `OnActivatedComponent` | added, per type |
//! | create with id | `OnActivatedComponent` | added, per type |
//! | add (new type) | `OnAddedComponent`, `OnActivatedComponent` | added |
//! | add (existing type) | `OnChangedComponent` | change |
//! | remove | `BeforeDeactivateComponent`, `BeforeRemoveComponent` | removed |
//! | destroy | `BeforeDeactivateComponent`, `BeforeRemoveComponent` | removed per type, destroyed |
//! | deactivate | `BeforeDeactivateComponent` | before deactivation |
//! | reactivate | `OnActivatedComponent` | reactivation |

use std::collections::{HashMap, HashSet};

use cgmath::{Quaternion, Vector3};
use log::{debug, error, warn};

use crate::error::{Error, Result};

use super::{
    events::BeforeEntityCreated, Component, ComponentLibrary, ComponentTypeId,
    EntityChangeSubscriber, EntityDestroySubscriber, EntityId, EntityInfoComponent, EntityPool,
    EntityRef, EventSystem, LifecycleEvent, LocationComponent, PoolId, PoolKind, Prefab,
    PrefabManager, SubscriberId, SubscriberRegistry, SubscriptionQueue, NULL_ID,
};

/// Coordinates entity pools, ids, lifecycle events and subscribers.
pub struct EntityManager {
    next_entity_id: EntityId,
    loaded_ids: HashSet<EntityId>,
    pools: Vec<EntityPool>,
    pool_map: HashMap<EntityId, PoolId>,
    component_library: ComponentLibrary,
    prefab_manager: PrefabManager,
    event_system: Option<Box<dyn EventSystem>>,
    subscribers: SubscriberRegistry,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Creates a manager with an empty global pool and the built-in
    /// components registered.
    pub fn new() -> Self {
        let mut component_library = ComponentLibrary::new();
        component_library.register::<EntityInfoComponent>();
        component_library.register::<LocationComponent>();
        Self {
            next_entity_id: 1,
            loaded_ids: HashSet::new(),
            pools: vec![EntityPool::new(PoolId::GLOBAL, PoolKind::Global)],
            pool_map: HashMap::new(),
            component_library,
            prefab_manager: PrefabManager::new(),
            event_system: None,
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// Attaches the event system lifecycle events are sent to.
    pub fn set_event_system(&mut self, event_system: Box<dyn EventSystem>) {
        self.event_system = Some(event_system);
    }

    /// Detaches the event system; lifecycle events are no longer sent.
    pub fn clear_event_system(&mut self) -> Option<Box<dyn EventSystem>> {
        self.event_system.take()
    }

    /// The component library used for copies.
    pub fn component_library(&self) -> &ComponentLibrary {
        &self.component_library
    }

    /// Mutable access to the component library, for registering types.
    pub fn component_library_mut(&mut self) -> &mut ComponentLibrary {
        &mut self.component_library
    }

    /// The prefab registry.
    pub fn prefab_manager(&self) -> &PrefabManager {
        &self.prefab_manager
    }

    /// Mutable access to the prefab registry.
    pub fn prefab_manager_mut(&mut self) -> &mut PrefabManager {
        &mut self.prefab_manager
    }

    // ---------------------------------------------------------------------
    // Subscribers

    /// A handle for subscribing, also usable from inside a notification.
    pub fn subscription_queue(&self) -> SubscriptionQueue {
        self.subscribers.queue()
    }

    /// Subscribes to structural changes.
    pub fn subscribe_change(&mut self, subscriber: Box<dyn EntityChangeSubscriber>) -> SubscriberId {
        self.subscribers.queue().subscribe_change(subscriber)
    }

    /// Subscribes to entity destruction.
    pub fn subscribe_destroy(&mut self, subscriber: Box<dyn EntityDestroySubscriber>) -> SubscriberId {
        self.subscribers.queue().subscribe_destroy(subscriber)
    }

    /// Removes a subscriber of either kind.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.queue().unsubscribe(id);
    }

    /// Number of change subscribers, counting queued (un)subscriptions.
    pub fn change_subscriber_count(&mut self) -> usize {
        self.subscribers.change_subscriber_count()
    }

    /// Number of destroy subscribers, counting queued (un)subscriptions.
    pub fn destroy_subscriber_count(&mut self) -> usize {
        self.subscribers.destroy_subscriber_count()
    }

    // ---------------------------------------------------------------------
    // Pools and ids

    /// Adds a pool and returns its id.
    pub fn add_pool(&mut self, kind: PoolKind) -> PoolId {
        let id = PoolId(self.pools.len() as u32);
        self.pools.push(EntityPool::new(id, kind));
        id
    }

    /// Looks up a pool.
    pub fn pool(&self, id: PoolId) -> Option<&EntityPool> {
        self.pools.get(id.0 as usize)
    }

    /// The global pool.
    pub fn global_pool(&self) -> &EntityPool {
        &self.pools[PoolId::GLOBAL.0 as usize]
    }

    /// The pool `entity` currently lives in.
    pub fn pool_of(&self, entity: EntityId) -> Option<PoolId> {
        self.pool_map.get(&entity).copied()
    }

    /// True if `id` has been issued, whether or not it is still active.
    pub fn is_existing_entity(&self, id: EntityId) -> bool {
        id != NULL_ID && id < self.next_entity_id
    }

    /// True if `id` is active.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.loaded_ids.contains(&id)
    }

    /// Number of active entities over all pools.
    pub fn active_entity_count(&self) -> usize {
        self.loaded_ids.len()
    }

    /// The cached reference of an active or deactivated entity, or the null reference.
    pub fn existing_entity(&self, id: EntityId) -> EntityRef {
        self.pool_of(id)
            .and_then(|pool| self.pools[pool.0 as usize].existing_ref(id))
            .unwrap_or_else(EntityRef::null)
    }

    /// A reference for an issued id.
    ///
    /// Known ids hand out their cached reference. An issued id that no pool
    /// knows any more gets a fresh, uncached reference to an inactive entity.
    /// Ids never issued give the null reference.
    pub fn create_entity_ref_with_id(&self, id: EntityId) -> EntityRef {
        if !self.is_existing_entity(id) {
            return EntityRef::null();
        }
        let existing = self.existing_entity(id);
        if existing.is_null() {
            EntityRef::new(id)
        } else {
            existing
        }
    }

    fn allocate_id(&mut self, pool: PoolId) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.loaded_ids.insert(id);
        self.pool_map.insert(id, pool);
        id
    }

    /// Reserves an already issued id for re-creation.
    fn register_id(&mut self, id: EntityId, pool: PoolId) -> bool {
        if id == NULL_ID || id >= self.next_entity_id {
            error!(
                "Prevented attempt to create entity with an invalid id ({id}), next id is {}",
                self.next_entity_id
            );
            return false;
        }
        if self.loaded_ids.contains(&id) {
            error!("Prevented attempt to create entity {id}, it is already active");
            return false;
        }
        self.loaded_ids.insert(id);
        self.pool_map.insert(id, pool);
        true
    }

    fn pool_index(&self, pool: PoolId) -> Option<usize> {
        let index = pool.0 as usize;
        (index < self.pools.len()).then_some(index)
    }

    /// Resolves a reference to an id. `Ok(None)` for the null reference.
    fn resolve(&self, entity: &EntityRef) -> Result<Option<EntityId>> {
        if entity.is_null() {
            return Ok(None);
        }
        if !entity.is_valid() {
            return Err(Error::stale_entity(entity.id()));
        }
        Ok(Some(entity.id()))
    }

    /// Resolves a reference to an active entity and its pool index.
    fn resolve_active(&self, entity: &EntityRef) -> Result<Option<(EntityId, usize)>> {
        let Some(id) = self.resolve(entity)? else {
            return Ok(None);
        };
        if !self.loaded_ids.contains(&id) {
            return Ok(None);
        }
        Ok(self
            .pool_of(id)
            .and_then(|pool| self.pool_index(pool))
            .map(|index| (id, index)))
    }

    // ---------------------------------------------------------------------
    // Dispatch helpers

    fn send_event(
        &mut self,
        entity: &EntityRef,
        mut event: LifecycleEvent,
        scope: &[ComponentTypeId],
    ) -> LifecycleEvent {
        if let Some(event_system) = self.event_system.as_mut() {
            event_system.send(entity, &mut event, scope);
        }
        event
    }

    fn notify_added(&mut self, entity: &EntityRef, types: &[ComponentTypeId]) {
        self.subscribers.begin_dispatch();
        for component in types {
            self.subscribers
                .each_change(|s| s.on_entity_component_added(entity, *component));
        }
    }

    fn notify_changed(&mut self, entity: &EntityRef, component: ComponentTypeId) {
        self.subscribers.begin_dispatch();
        self.subscribers
            .each_change(|s| s.on_entity_component_change(entity, component));
    }

    fn notify_removal_and_destruction(&mut self, entity: &EntityRef, types: &[ComponentTypeId]) {
        self.subscribers.begin_dispatch();
        for component in types {
            self.subscribers
                .each_change(|s| s.on_entity_component_removed(entity, *component));
        }
        self.subscribers.each_destroy(|s| s.on_entity_destroyed(entity));
    }

    // ---------------------------------------------------------------------
    // Creation

    /// Creates an entity in the global pool.
    pub fn create(&mut self, components: Vec<Box<dyn Component>>) -> EntityRef {
        self.create_in(PoolId::GLOBAL, components)
    }

    /// Creates an entity in `pool`, or returns the null reference if the pool
    /// does not exist.
    pub fn create_in(&mut self, pool: PoolId, components: Vec<Box<dyn Component>>) -> EntityRef {
        self.create_entity(pool, components, true)
    }

    /// Creates an entity without `BeforeEntityCreated`, `OnAddedComponent`
    /// or `OnActivatedComponent`. Structural subscribers are still notified.
    pub fn create_without_lifecycle_events(&mut self, components: Vec<Box<dyn Component>>) -> EntityRef {
        self.create_entity(PoolId::GLOBAL, components, false)
    }

    /// Instantiates the named prefab without lifecycle events.
    pub fn create_from_prefab_without_lifecycle_events(&mut self, name: &str) -> EntityRef {
        let Some(prefab) = self.prefab_manager.get(name) else {
            warn!("Unable to instantiate unknown prefab: \"{name}\"");
            return EntityRef::null();
        };
        let components = self.prefab_components(&prefab, None, None);
        self.create_entity(PoolId::GLOBAL, components, false)
    }

    fn create_entity(
        &mut self,
        pool: PoolId,
        mut components: Vec<Box<dyn Component>>,
        lifecycle_events: bool,
    ) -> EntityRef {
        let Some(pool_index) = self.pool_index(pool) else {
            error!("Unable to create entity in unknown pool {pool:?}");
            return EntityRef::null();
        };
        let id = self.allocate_id(pool);

        if !components
            .iter()
            .any(|c| c.as_any().is::<EntityInfoComponent>())
        {
            components.push(Box::new(EntityInfoComponent::default()));
        }
        let prefab = components
            .iter()
            .find_map(|c| c.as_any().downcast_ref::<EntityInfoComponent>())
            .and_then(|info| info.parent_prefab.clone());

        let components = if lifecycle_events && self.event_system.is_some() {
            let scope: Vec<_> = components.iter().map(|c| c.component_type()).collect();
            let temp = EntityRef::new(id);
            let event = self.send_event(
                &temp,
                LifecycleEvent::BeforeEntityCreated(BeforeEntityCreated::new(prefab, components)),
                &scope,
            );
            temp.invalidate();
            match event {
                LifecycleEvent::BeforeEntityCreated(event) => event.into_components(),
                _ => Vec::new(),
            }
        } else {
            components
        };

        let types: Vec<_> = components.iter().map(|c| c.component_type()).collect();
        let entity = self.pools[pool_index].insert(id, components);

        if lifecycle_events {
            self.send_event(&entity, LifecycleEvent::OnAddedComponent, &types);
            self.send_event(&entity, LifecycleEvent::OnActivatedComponent, &types);
        }
        self.notify_added(&entity, &types);
        entity
    }

    /// Re-creates an entity under an id issued earlier (e.g. when loading).
    ///
    /// Ids that were never issued, or that are active, are rejected with an
    /// error log and the null reference.
    pub fn create_with_id(&mut self, id: EntityId, components: Vec<Box<dyn Component>>) -> EntityRef {
        if !self.register_id(id, PoolId::GLOBAL) {
            return EntityRef::null();
        }
        let types: Vec<_> = components.iter().map(|c| c.component_type()).collect();
        let entity = self.pools[PoolId::GLOBAL.0 as usize].insert(id, components);
        self.send_event(&entity, LifecycleEvent::OnActivatedComponent, &types);
        self.notify_added(&entity, &types);
        entity
    }

    /// Instantiates the named prefab. An empty name creates a bare entity.
    pub fn create_from_prefab(&mut self, name: &str) -> EntityRef {
        self.create_from_named_prefab(name, None, None)
    }

    /// Instantiates the named prefab at `position`.
    pub fn create_from_prefab_at(&mut self, name: &str, position: Vector3<f32>) -> EntityRef {
        self.create_from_named_prefab(name, Some(position), None)
    }

    /// Instantiates the named prefab at `position` with `rotation`.
    pub fn create_from_prefab_at_rotated(
        &mut self,
        name: &str,
        position: Vector3<f32>,
        rotation: Quaternion<f32>,
    ) -> EntityRef {
        self.create_from_named_prefab(name, Some(position), Some(rotation))
    }

    fn create_from_named_prefab(
        &mut self,
        name: &str,
        position: Option<Vector3<f32>>,
        rotation: Option<Quaternion<f32>>,
    ) -> EntityRef {
        if name.is_empty() {
            return self.create(Vec::new());
        }
        match self.prefab_manager.get(name) {
            Some(prefab) => self.instantiate(&prefab, position, rotation),
            None => {
                warn!("Unable to instantiate unknown prefab: \"{name}\"");
                EntityRef::null()
            }
        }
    }

    /// Instantiates `prefab`, overriding the location when given.
    pub fn instantiate(
        &mut self,
        prefab: &Prefab,
        position: Option<Vector3<f32>>,
        rotation: Option<Quaternion<f32>>,
    ) -> EntityRef {
        let components = self.prefab_components(prefab, position, rotation);
        self.create(components)
    }

    fn prefab_components(
        &self,
        prefab: &Prefab,
        position: Option<Vector3<f32>>,
        rotation: Option<Quaternion<f32>>,
    ) -> Vec<Box<dyn Component>> {
        let mut components: Vec<Box<dyn Component>> = prefab
            .components()
            .filter(|c| !c.as_any().is::<EntityInfoComponent>())
            .filter_map(|c| match self.component_library.copy(c) {
                Ok(copy) => Some(copy),
                Err(e) => {
                    error!("Dropping component of prefab \"{}\": {e}", prefab.name());
                    None
                }
            })
            .collect();
        for component in &mut components {
            if let Some(location) = component.as_any_mut().downcast_mut::<LocationComponent>() {
                if let Some(position) = position {
                    location.world_position = position;
                }
                if let Some(rotation) = rotation {
                    location.world_rotation = rotation;
                }
            }
        }
        components.push(Box::new(EntityInfoComponent::from_prefab(
            prefab.name(),
            prefab.is_persisted(),
            prefab.is_always_relevant(),
        )));
        components
    }

    /// Creates a new entity holding deep copies of `other`'s components.
    ///
    /// Returns the null reference when `other` is not active.
    pub fn copy(&mut self, other: &EntityRef) -> Result<EntityRef> {
        let Some((id, pool_index)) = self.resolve_active(other)? else {
            return Ok(EntityRef::null());
        };
        let components: Vec<Box<dyn Component>> = self.pools[pool_index]
            .component_store()
            .components_of(id)
            .into_iter()
            .filter_map(|c| match self.component_library.copy(c) {
                Ok(copy) => Some(copy),
                Err(e) => {
                    error!("Unable to copy component of entity {id}: {e}");
                    None
                }
            })
            .collect();
        Ok(self.create(components))
    }

    // ---------------------------------------------------------------------
    // Destruction and storage

    /// Destroys the entity with `id`.
    ///
    /// No-op for ids that were never issued or were already destroyed. A
    /// deactivated entity is forgotten and its reference invalidated.
    pub fn destroy(&mut self, id: EntityId) {
        if !self.loaded_ids.contains(&id) {
            self.forget_deactivated(id);
            return;
        }
        let Some(pool_index) = self.pool_of(id).and_then(|pool| self.pool_index(pool)) else {
            return;
        };
        let entity = self.pools[pool_index].entity_ref(id);
        let types = self.pools[pool_index].component_store().component_types_of(id);
        self.send_event(&entity, LifecycleEvent::BeforeDeactivateComponent, &types);
        self.send_event(&entity, LifecycleEvent::BeforeRemoveComponent, &types);
        self.notify_removal_and_destruction(&entity, &types);
        self.teardown(id, pool_index);
    }

    /// Destroys the entity behind `entity`.
    pub fn destroy_entity(&mut self, entity: &EntityRef) -> Result<()> {
        if let Some(id) = self.resolve(entity)? {
            self.destroy(id);
        }
        Ok(())
    }

    /// Destroys an entity without sending `Before*` events. Structural
    /// subscribers are still notified.
    pub fn destroy_without_events(&mut self, entity: &EntityRef) -> Result<()> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            return Ok(());
        };
        let entity = self.pools[pool_index].entity_ref(id);
        let types = self.pools[pool_index].component_store().component_types_of(id);
        self.notify_removal_and_destruction(&entity, &types);
        self.teardown(id, pool_index);
        Ok(())
    }

    fn teardown(&mut self, id: EntityId, pool_index: usize) {
        if let Some(entity) = self.pools[pool_index].remove(id) {
            entity.invalidate();
        }
        self.loaded_ids.remove(&id);
        self.pool_map.remove(&id);
    }

    fn forget_deactivated(&mut self, id: EntityId) {
        let Some(pool_index) = self.pool_of(id).and_then(|pool| self.pool_index(pool)) else {
            return;
        };
        if self.pools[pool_index].is_deactivated(id) {
            debug!("Forgetting deactivated entity {id}");
            if let Some(entity) = self.pools[pool_index].remove(id) {
                entity.invalidate();
            }
            self.pool_map.remove(&id);
        }
    }

    /// Takes an entity out of live storage so it can be persisted.
    ///
    /// The returned components are the entity's state at deactivation. The id
    /// and the reference stay reserved for [`reactivate`](Self::reactivate).
    pub fn deactivate_for_storage(&mut self, entity: &EntityRef) -> Result<Vec<Box<dyn Component>>> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            return Ok(Vec::new());
        };
        let entity = self.pools[pool_index].entity_ref(id);
        let types = self.pools[pool_index].component_store().component_types_of(id);
        self.send_event(&entity, LifecycleEvent::BeforeDeactivateComponent, &types);
        self.subscribers.begin_dispatch();
        self.subscribers
            .each_change(|s| s.on_before_deactivation(&entity, &types));
        let components = self.pools[pool_index].deactivate(id);
        self.loaded_ids.remove(&id);
        Ok(components)
    }

    /// Brings a deactivated entity back with `components`.
    ///
    /// Returns the null reference, with an error log, if `id` is active or
    /// was never issued.
    pub fn reactivate(&mut self, id: EntityId, components: Vec<Box<dyn Component>>) -> EntityRef {
        if !self.is_existing_entity(id) || self.loaded_ids.contains(&id) {
            error!("Cannot reactivate entity {id}: it is active or was never issued");
            return EntityRef::null();
        }
        let pool = self.pool_of(id).unwrap_or(PoolId::GLOBAL);
        let Some(pool_index) = self.pool_index(pool) else {
            return EntityRef::null();
        };
        let types: Vec<_> = components.iter().map(|c| c.component_type()).collect();
        let entity = self.pools[pool_index].insert(id, components);
        self.loaded_ids.insert(id);
        self.pool_map.insert(id, pool);
        self.send_event(&entity, LifecycleEvent::OnActivatedComponent, &types);
        self.subscribers.begin_dispatch();
        self.subscribers.each_change(|s| s.on_reactivation(&entity, &types));
        entity
    }

    /// Moves an active entity to another pool without any event or notification.
    pub fn move_to_pool(&mut self, id: EntityId, target: PoolId) -> bool {
        if !self.loaded_ids.contains(&id) {
            return false;
        }
        let (Some(source), Some(target_index)) = (
            self.pool_of(id).and_then(|pool| self.pool_index(pool)),
            self.pool_index(target),
        ) else {
            return false;
        };
        if source == target_index {
            return true;
        }
        let Some((entity, components)) = self.pools[source].extract(id) else {
            return false;
        };
        self.pools[target_index].insert_ref(entity, components);
        self.pool_map.insert(id, target);
        true
    }

    /// Destroys every entity without events or notifications.
    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
        self.loaded_ids.clear();
        self.pool_map.clear();
    }

    // ---------------------------------------------------------------------
    // Components

    /// Adds `component` to `entity`.
    ///
    /// Adding over an existing component of the same type logs an error and
    /// replaces it, firing a change instead of an addition.
    pub fn add_component<T: Component>(&mut self, entity: &EntityRef, component: T) -> Result<()> {
        self.add_component_boxed(entity, Box::new(component))
    }

    /// Boxed variant of [`add_component`](Self::add_component).
    pub fn add_component_boxed(&mut self, entity: &EntityRef, component: Box<dyn Component>) -> Result<()> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            warn!("Ignoring component added to inactive entity {}", entity.id());
            return Ok(());
        };
        let type_id = component.component_type();
        let entity = self.pools[pool_index].entity_ref(id);
        let previous = self.pools[pool_index].component_store_mut().put(id, component);
        if previous.is_some() {
            error!(
                "Adding a component ({}) over an existing component for entity {id}",
                type_id.short_name()
            );
            self.notify_changed(&entity, type_id);
            self.send_event(&entity, LifecycleEvent::OnChangedComponent, &[type_id]);
        } else {
            self.notify_added(&entity, &[type_id]);
            self.send_event(&entity, LifecycleEvent::OnAddedComponent, &[type_id]);
            self.send_event(&entity, LifecycleEvent::OnActivatedComponent, &[type_id]);
        }
        Ok(())
    }

    /// Stores a changed `component` on `entity`, firing a change.
    ///
    /// Saving a component the entity did not have logs an error and adds it.
    pub fn save_component<T: Component>(&mut self, entity: &EntityRef, component: T) -> Result<()> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            warn!("Ignoring component saved to inactive entity {}", entity.id());
            return Ok(());
        };
        let type_id = ComponentTypeId::of::<T>();
        let entity = self.pools[pool_index].entity_ref(id);
        let previous = self.pools[pool_index]
            .component_store_mut()
            .put(id, Box::new(component));
        if previous.is_none() {
            error!(
                "Saving a component ({}) that doesn't belong to this entity {id}",
                type_id.short_name()
            );
            self.notify_added(&entity, &[type_id]);
            self.send_event(&entity, LifecycleEvent::OnAddedComponent, &[type_id]);
            self.send_event(&entity, LifecycleEvent::OnActivatedComponent, &[type_id]);
        } else {
            self.notify_changed(&entity, type_id);
            self.send_event(&entity, LifecycleEvent::OnChangedComponent, &[type_id]);
        }
        Ok(())
    }

    /// Removes the component `T` from `entity`, returning it.
    pub fn remove_component<T: Component>(&mut self, entity: &EntityRef) -> Result<Option<Box<T>>> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            return Ok(None);
        };
        let type_id = ComponentTypeId::of::<T>();
        if !self.pools[pool_index].component_store().has(id, type_id) {
            return Ok(None);
        }
        let entity = self.pools[pool_index].entity_ref(id);
        self.send_event(&entity, LifecycleEvent::BeforeDeactivateComponent, &[type_id]);
        self.send_event(&entity, LifecycleEvent::BeforeRemoveComponent, &[type_id]);
        self.subscribers.begin_dispatch();
        self.subscribers
            .each_change(|s| s.on_entity_component_removed(&entity, type_id));
        Ok(self.pools[pool_index]
            .component_store_mut()
            .remove_typed::<T>(id))
    }

    /// Borrows the component `T` of an active entity.
    pub fn get_component<T: Component>(&self, entity: &EntityRef) -> Result<Option<&T>> {
        Ok(self
            .resolve_active(entity)?
            .and_then(|(id, pool_index)| self.pools[pool_index].component_store().get::<T>(id)))
    }

    /// Mutably borrows the component `T` of an active entity.
    ///
    /// Edits made this way are silent; call [`save_component`](Self::save_component)
    /// to announce them.
    pub fn get_component_mut<T: Component>(&mut self, entity: &EntityRef) -> Result<Option<&mut T>> {
        let Some((id, pool_index)) = self.resolve_active(entity)? else {
            return Ok(None);
        };
        Ok(self.pools[pool_index].component_store_mut().get_mut::<T>(id))
    }

    /// True if the active entity `entity` has a component of type `type_id`.
    pub fn has_component(&self, entity: &EntityRef, type_id: ComponentTypeId) -> Result<bool> {
        Ok(self
            .resolve_active(entity)?
            .is_some_and(|(id, pool_index)| self.pools[pool_index].component_store().has(id, type_id)))
    }

    /// The component types of an active entity.
    pub fn component_types(&self, entity: &EntityRef) -> Result<Vec<ComponentTypeId>> {
        Ok(self
            .resolve_active(entity)?
            .map(|(id, pool_index)| self.pools[pool_index].component_store().component_types_of(id))
            .unwrap_or_default())
    }

    // ---------------------------------------------------------------------
    // Queries

    /// Active entities having every type in `types`, over all pools.
    ///
    /// No types returns every active entity. See
    /// [`EntityPool::entities_with`] for the join strategy.
    pub fn entities_with(&self, types: &[ComponentTypeId]) -> Vec<EntityRef> {
        self.pools
            .iter()
            .flat_map(|pool| {
                pool.entities_with(types)
                    .into_iter()
                    .filter_map(move |id| pool.existing_ref(id))
            })
            .collect()
    }

    /// Number of active entities having every type in `types`.
    pub fn count_of_entities_with(&self, types: &[ComponentTypeId]) -> usize {
        self.pools
            .iter()
            .map(|pool| pool.entities_with(types).len())
            .sum()
    }

    /// Every active entity.
    pub fn all_entities(&self) -> Vec<EntityRef> {
        self.entities_with(&[])
    }
}
