//! # Component Table
//!
//! Storage of component values keyed by entity id and component type.
//!
//! ## Layout
//!
//! One bucket per component type, each bucket an ordered map from entity id to
//! the boxed component. Type buckets are created on first use. Ordering the
//! buckets by id keeps iteration deterministic.
//!
//! ## Concurrency
//!
//! Mutation takes `&mut self`, so the table is mutated by its owner only;
//! sharing it between threads means wrapping it (e.g. in an
//! [`MtResource`](crate::core::MtResource)). Iterating one type while
//! mutating that same type is ruled out by the borrow checker; callers that
//! need a stable view take a materialized list with [`components_of`].
//!
//! [`components_of`]: ComponentTable::components_of

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{downcast_component, Component, ComponentTypeId, EntityId};

/// Per-entity storage of typed component values.
#[derive(Debug, Default)]
pub struct ComponentTable {
    store: HashMap<ComponentTypeId, BTreeMap<EntityId, Box<dyn Component>>>,
}

impl ComponentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the component of type `type_id` on `entity`.
    pub fn get_dyn(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&dyn Component> {
        self.store
            .get(&type_id)
            .and_then(|bucket| bucket.get(&entity))
            .map(|c| c.as_ref())
    }

    /// Borrows the component `T` on `entity`.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.get_dyn(entity, ComponentTypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// Mutably borrows the component `T` on `entity`.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.store
            .get_mut(&ComponentTypeId::of::<T>())
            .and_then(|bucket| bucket.get_mut(&entity))
            .and_then(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Returns true if `entity` has a component of type `type_id`.
    pub fn has(&self, entity: EntityId, type_id: ComponentTypeId) -> bool {
        self.store
            .get(&type_id)
            .is_some_and(|bucket| bucket.contains_key(&entity))
    }

    /// Stores `component` on `entity`, returning the component it replaced.
    pub fn put(&mut self, entity: EntityId, component: Box<dyn Component>) -> Option<Box<dyn Component>> {
        let type_id = component.component_type();
        self.store.entry(type_id).or_default().insert(entity, component)
    }

    /// Removes the component of type `type_id` from `entity`.
    pub fn remove(&mut self, entity: EntityId, type_id: ComponentTypeId) -> Option<Box<dyn Component>> {
        self.store.get_mut(&type_id).and_then(|bucket| bucket.remove(&entity))
    }

    /// Removes and returns the component `T` from `entity`.
    pub fn remove_typed<T: Component>(&mut self, entity: EntityId) -> Option<Box<T>> {
        self.remove(entity, ComponentTypeId::of::<T>())
            .and_then(downcast_component::<T>)
    }

    /// Removes every component of `entity`, returning them.
    pub fn remove_all(&mut self, entity: EntityId) -> Vec<Box<dyn Component>> {
        self.store
            .values_mut()
            .filter_map(|bucket| bucket.remove(&entity))
            .collect()
    }

    /// Removes every component of `entity`.
    pub fn remove_entity(&mut self, entity: EntityId) {
        for bucket in self.store.values_mut() {
            bucket.remove(&entity);
        }
    }

    /// Number of entities carrying a component of type `type_id`.
    pub fn component_count(&self, type_id: ComponentTypeId) -> usize {
        self.store.get(&type_id).map_or(0, BTreeMap::len)
    }

    /// Number of distinct entities with at least one component.
    ///
    /// Walks every stored component, so it is meant for diagnostics and tests.
    pub fn num_entities(&self) -> usize {
        self.entity_ids().len()
    }

    /// Distinct ids of every entity with at least one component, ascending.
    pub fn entity_ids(&self) -> BTreeSet<EntityId> {
        self.store
            .values()
            .flat_map(|bucket| bucket.keys().copied())
            .collect()
    }

    /// Iterates the components of one type. An unknown type yields nothing.
    pub fn iter_type(
        &self,
        type_id: ComponentTypeId,
    ) -> impl Iterator<Item = (EntityId, &dyn Component)> + '_ {
        self.store
            .get(&type_id)
            .into_iter()
            .flat_map(|bucket| bucket.iter().map(|(id, c)| (*id, c.as_ref())))
    }

    /// A freshly collected list of the components on `entity`.
    pub fn components_of(&self, entity: EntityId) -> Vec<&dyn Component> {
        self.store
            .values()
            .filter_map(|bucket| bucket.get(&entity).map(|c| c.as_ref()))
            .collect()
    }

    /// The component types present on `entity`.
    pub fn component_types_of(&self, entity: EntityId) -> Vec<ComponentTypeId> {
        self.store
            .iter()
            .filter(|(_, bucket)| bucket.contains_key(&entity))
            .map(|(type_id, _)| *type_id)
            .collect()
    }

    /// Drops every stored component.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Mass(f32);
    impl Component for Mass {}

    #[derive(Debug, Clone, PartialEq)]
    struct Label(&'static str);
    impl Component for Label {}

    #[test]
    fn put_replaces_and_returns_previous() {
        let mut table = ComponentTable::new();
        assert!(table.put(1, Box::new(Mass(1.0))).is_none());
        let previous = table.put(1, Box::new(Mass(2.0))).unwrap();
        assert_eq!(previous.as_any().downcast_ref::<Mass>(), Some(&Mass(1.0)));
        assert_eq!(table.get::<Mass>(1), Some(&Mass(2.0)));
        assert_eq!(table.component_count(ComponentTypeId::of::<Mass>()), 1);
    }

    #[test]
    fn remove_all_empties_entity() {
        let mut table = ComponentTable::new();
        table.put(3, Box::new(Mass(1.0)));
        table.put(3, Box::new(Label("rock")));
        table.put(4, Box::new(Label("tree")));
        assert_eq!(table.num_entities(), 2);
        assert_eq!(table.remove_all(3).len(), 2);
        assert!(table.components_of(3).is_empty());
        assert_eq!(table.num_entities(), 1);
    }

    #[test]
    fn unknown_type_iterates_empty() {
        let table = ComponentTable::new();
        assert_eq!(table.iter_type(ComponentTypeId::of::<Mass>()).count(), 0);
        assert_eq!(table.component_count(ComponentTypeId::of::<Mass>()), 0);
    }

    #[test]
    fn iteration_is_ordered_by_id() {
        let mut table = ComponentTable::new();
        for id in [9, 2, 5] {
            table.put(id, Box::new(Label("x")));
        }
        let ids: Vec<_> = table
            .iter_type(ComponentTypeId::of::<Label>())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut table = ComponentTable::new();
        table.put(1, Box::new(Mass(1.0)));
        table.get_mut::<Mass>(1).unwrap().0 = 8.0;
        assert_eq!(table.remove_typed::<Mass>(1).map(|m| *m), Some(Mass(8.0)));
        assert!(!table.has(1, ComponentTypeId::of::<Mass>()));
    }
}
