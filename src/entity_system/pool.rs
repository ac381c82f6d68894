//! # Entity Pool
//!
//! A pool owns the component storage and the reference cache for a group of
//! entities. The manager decides which pool an entity lives in; the pool
//! itself never allocates ids or dispatches events, it only stores.
//!
//! ## States
//!
//! An id known to a pool is either active (components live, reference cached)
//! or deactivated for storage (components handed out, reference still cached
//! so a later reactivation hands back the same slot).

use std::collections::{BTreeSet, HashMap};

use super::{Component, ComponentTable, ComponentTypeId, EntityId, EntityRef};

/// Identifier of a pool inside an [`EntityManager`](super::EntityManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub(crate) u32);

impl PoolId {
    /// The global pool, which always exists.
    pub const GLOBAL: PoolId = PoolId(0);
}

/// What a pool is used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolKind {
    /// Always relevant entities.
    Global,
    /// Entities scoped to a sector of the world.
    Sector,
}

/// Component storage plus the reference cache of a group of entities.
#[derive(Debug)]
pub struct EntityPool {
    id: PoolId,
    kind: PoolKind,
    component_store: ComponentTable,
    entity_store: HashMap<EntityId, EntityRef>,
    active: BTreeSet<EntityId>,
}

impl EntityPool {
    pub(crate) fn new(id: PoolId, kind: PoolKind) -> Self {
        Self {
            id,
            kind,
            component_store: ComponentTable::new(),
            entity_store: HashMap::new(),
            active: BTreeSet::new(),
        }
    }

    /// The pool's identifier.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// What the pool holds.
    pub fn kind(&self) -> &PoolKind {
        &self.kind
    }

    /// The pool's component storage.
    pub fn component_store(&self) -> &ComponentTable {
        &self.component_store
    }

    pub(crate) fn component_store_mut(&mut self) -> &mut ComponentTable {
        &mut self.component_store
    }

    /// True if `id` is active in this pool.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.active.contains(&id)
    }

    /// True if `id` has a cached reference here but no live components.
    pub fn is_deactivated(&self, id: EntityId) -> bool {
        self.entity_store.contains_key(&id) && !self.active.contains(&id)
    }

    /// Number of active entities.
    pub fn active_entity_count(&self) -> usize {
        self.active.len()
    }

    /// Active entity ids in ascending order.
    pub fn active_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.active.iter().copied()
    }

    /// The cached reference for `id`, if the pool knows it.
    pub fn existing_ref(&self, id: EntityId) -> Option<EntityRef> {
        self.entity_store.get(&id).cloned()
    }

    pub(crate) fn entity_ref(&mut self, id: EntityId) -> EntityRef {
        self.entity_store
            .entry(id)
            .or_insert_with(|| EntityRef::new(id))
            .clone()
    }

    /// Stores `components` under `id` and marks it active.
    pub(crate) fn insert(&mut self, id: EntityId, components: Vec<Box<dyn Component>>) -> EntityRef {
        for component in components {
            self.component_store.put(id, component);
        }
        self.active.insert(id);
        self.entity_ref(id)
    }

    /// Adopts an entity moved from another pool, keeping its reference slot.
    pub(crate) fn insert_ref(&mut self, entity: EntityRef, components: Vec<Box<dyn Component>>) {
        let id = entity.id();
        for component in components {
            self.component_store.put(id, component);
        }
        self.active.insert(id);
        self.entity_store.insert(id, entity);
    }

    /// Takes an entity out of the pool without invalidating its reference.
    pub(crate) fn extract(&mut self, id: EntityId) -> Option<(EntityRef, Vec<Box<dyn Component>>)> {
        let entity = self.entity_store.remove(&id)?;
        self.active.remove(&id);
        Some((entity, self.component_store.remove_all(id)))
    }

    /// Forgets `id` entirely, returning its reference so the caller can invalidate it.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityRef> {
        self.active.remove(&id);
        self.component_store.remove_entity(id);
        self.entity_store.remove(&id)
    }

    /// Strips the live components of `id` but keeps its reference cached.
    pub(crate) fn deactivate(&mut self, id: EntityId) -> Vec<Box<dyn Component>> {
        self.active.remove(&id);
        self.component_store.remove_all(id)
    }

    /// Active entities having every type in `types`.
    ///
    /// No types means every active entity. Otherwise the first type is
    /// scanned and the remaining types are checked per candidate; the join
    /// order is not chosen by bucket size.
    pub fn entities_with(&self, types: &[ComponentTypeId]) -> Vec<EntityId> {
        let Some((primary, rest)) = types.split_first() else {
            return self.active.iter().copied().collect();
        };
        self.component_store
            .iter_type(*primary)
            .map(|(id, _)| id)
            .filter(|id| self.active.contains(id))
            .filter(|id| rest.iter().all(|t| self.component_store.has(*id, *t)))
            .collect()
    }

    /// Drops every entity, invalidating all cached references.
    pub(crate) fn clear(&mut self) {
        for entity in self.entity_store.values() {
            entity.invalidate();
        }
        self.entity_store.clear();
        self.active.clear();
        self.component_store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Tag;
    impl Component for Tag {}

    #[derive(Debug, Clone)]
    struct Other;
    impl Component for Other {}

    #[test]
    fn references_are_cached() {
        let mut pool = EntityPool::new(PoolId::GLOBAL, PoolKind::Global);
        let first = pool.insert(1, vec![Box::new(Tag)]);
        let second = pool.entity_ref(1);
        assert!(first.same_slot(&second));
    }

    #[test]
    fn deactivate_keeps_reference() {
        let mut pool = EntityPool::new(PoolId::GLOBAL, PoolKind::Global);
        let entity = pool.insert(1, vec![Box::new(Tag), Box::new(Other)]);
        assert_eq!(pool.deactivate(1).len(), 2);
        assert!(pool.is_deactivated(1));
        assert!(pool.existing_ref(1).unwrap().same_slot(&entity));
        assert!(entity.is_valid());
    }

    #[test]
    fn entities_with_filters_by_every_type() {
        let mut pool = EntityPool::new(PoolId::GLOBAL, PoolKind::Global);
        pool.insert(1, vec![Box::new(Tag)]);
        pool.insert(2, vec![Box::new(Tag), Box::new(Other)]);
        pool.insert(3, vec![Box::new(Other)]);
        let tag = ComponentTypeId::of::<Tag>();
        let other = ComponentTypeId::of::<Other>();
        assert_eq!(pool.entities_with(&[tag]), vec![1, 2]);
        assert_eq!(pool.entities_with(&[tag, other]), vec![2]);
        assert_eq!(pool.entities_with(&[]), vec![1, 2, 3]);
    }

    #[test]
    fn clear_invalidates() {
        let mut pool = EntityPool::new(PoolId::GLOBAL, PoolKind::Global);
        let entity = pool.insert(5, vec![Box::new(Tag)]);
        pool.clear();
        assert!(!entity.is_valid());
        assert!(pool.existing_ref(5).is_none());
        assert_eq!(pool.active_entity_count(), 0);
    }
}
