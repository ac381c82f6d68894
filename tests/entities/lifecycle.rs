use std::{cell::RefCell, rc::Rc};

use voxel_world::{
    entity_system::{
        ComponentTypeId, EntityChangeSubscriber, EntityDestroySubscriber, EntityManager, EntityRef,
        SubscriberId, SubscriptionQueue, NULL_ID,
    },
    error::ErrorKind,
};

use crate::{Health, Name};

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Added(ComponentTypeId),
    Changed(ComponentTypeId),
    Removed(ComponentTypeId),
    Destroyed,
}

struct Recorder(Rc<RefCell<Vec<Seen>>>);

impl EntityChangeSubscriber for Recorder {
    fn on_entity_component_added(&mut self, _: &EntityRef, component: ComponentTypeId) {
        self.0.borrow_mut().push(Seen::Added(component));
    }

    fn on_entity_component_change(&mut self, _: &EntityRef, component: ComponentTypeId) {
        self.0.borrow_mut().push(Seen::Changed(component));
    }

    fn on_entity_component_removed(&mut self, _: &EntityRef, component: ComponentTypeId) {
        self.0.borrow_mut().push(Seen::Removed(component));
    }
}

impl EntityDestroySubscriber for Recorder {
    fn on_entity_destroyed(&mut self, _: &EntityRef) {
        self.0.borrow_mut().push(Seen::Destroyed);
    }
}

/// Subscribes a [`Recorder`] the first time it hears an addition.
struct LateSubscriber {
    queue: SubscriptionQueue,
    late: Rc<RefCell<Vec<Seen>>>,
    done: bool,
}

impl EntityChangeSubscriber for LateSubscriber {
    fn on_entity_component_added(&mut self, _: &EntityRef, _: ComponentTypeId) {
        if !self.done {
            self.done = true;
            self.queue.subscribe_change(Box::new(Recorder(self.late.clone())));
        }
    }
}

/// Records additions and unsubscribes itself on the first one.
struct SelfRemoving {
    queue: SubscriptionQueue,
    id: Rc<RefCell<Option<SubscriberId>>>,
    seen: Rc<RefCell<Vec<Seen>>>,
}

impl EntityChangeSubscriber for SelfRemoving {
    fn on_entity_component_added(&mut self, _: &EntityRef, component: ComponentTypeId) {
        self.seen.borrow_mut().push(Seen::Added(component));
        if let Some(id) = self.id.borrow_mut().take() {
            self.queue.unsubscribe(id);
        }
    }
}

fn recording_manager() -> (EntityManager, Rc<RefCell<Vec<Seen>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut manager = EntityManager::new();
    manager.subscribe_change(Box::new(Recorder(seen.clone())));
    manager.subscribe_destroy(Box::new(Recorder(seen.clone())));
    (manager, seen)
}

#[test]
fn null_reference_never_exists() {
    let manager = EntityManager::new();
    let null = EntityRef::null();
    assert!(null.is_null());
    assert!(!null.is_valid());
    assert!(!manager.is_existing_entity(NULL_ID));
    assert!(!manager.is_active(NULL_ID));
    assert!(manager.get_component::<Health>(&null).unwrap().is_none());
}

#[test]
fn destroying_twice_is_a_no_op() {
    let (mut manager, seen) = recording_manager();
    let entity = manager.create(vec![Box::new(Health(3))]);
    let id = entity.id();

    manager.destroy(id);
    let after_first = seen.borrow().len();
    manager.destroy(id);
    manager.destroy(9_999);

    assert_eq!(seen.borrow().len(), after_first);
    assert!(!manager.is_active(id));
    assert_eq!(manager.active_entity_count(), 0);
}

#[test]
fn destroyed_reference_is_stale() {
    let mut manager = EntityManager::new();
    let entity = manager.create(vec![Box::new(Health(3))]);
    let copy = entity.clone();
    manager.destroy_entity(&entity).unwrap();

    let error = manager.get_component::<Health>(&copy).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::StaleEntity(id) if id == entity.id()));
    assert!(manager.add_component(&copy, Name("x".into())).is_err());
}

#[test]
fn adding_an_existing_type_replaces_and_fires_one_change() {
    let (mut manager, seen) = recording_manager();
    let entity = manager.create(vec![Box::new(Health(3))]);
    seen.borrow_mut().clear();

    manager.add_component(&entity, Health(7)).unwrap();

    let health = ComponentTypeId::of::<Health>();
    assert_eq!(*seen.borrow(), vec![Seen::Changed(health)]);
    assert_eq!(manager.get_component::<Health>(&entity).unwrap(), Some(&Health(7)));
}

#[test]
fn destroy_reports_every_component_then_destruction() {
    let (mut manager, seen) = recording_manager();
    let entity = manager.create(vec![Box::new(Health(1)), Box::new(Name("a".into()))]);
    let types = manager.component_types(&entity).unwrap();
    seen.borrow_mut().clear();

    manager.destroy(entity.id());

    let seen = seen.borrow();
    assert_eq!(seen.len(), types.len() + 1);
    assert_eq!(seen.last(), Some(&Seen::Destroyed));
    for component in types {
        assert!(seen.contains(&Seen::Removed(component)));
    }
}

#[test]
fn entities_with_joins_component_types() {
    let mut manager = EntityManager::new();
    let both = manager.create(vec![Box::new(Health(1)), Box::new(Name("both".into()))]);
    manager.create(vec![Box::new(Health(2))]);
    manager.create(vec![Box::new(Name("name".into()))]);

    let found = manager.entities_with(&[ComponentTypeId::of::<Health>(), ComponentTypeId::of::<Name>()]);
    assert_eq!(found, vec![both]);
    assert_eq!(manager.count_of_entities_with(&[ComponentTypeId::of::<Health>()]), 2);
    assert_eq!(manager.all_entities().len(), 3);
}

#[test]
fn subscribing_during_a_notification_starts_with_the_next_operation() {
    let mut manager = EntityManager::new();
    let late = Rc::new(RefCell::new(Vec::new()));
    manager.subscribe_change(Box::new(LateSubscriber {
        queue: manager.subscription_queue(),
        late: late.clone(),
        done: false,
    }));

    manager.create(vec![Box::new(Health(1)), Box::new(Name("a".into()))]);
    assert!(late.borrow().is_empty());
    assert_eq!(manager.change_subscriber_count(), 2);

    let entity = manager.create(vec![Box::new(Health(2))]);
    let types = manager.component_types(&entity).unwrap();
    assert_eq!(late.borrow().len(), types.len());
    assert!(late.borrow().contains(&Seen::Added(ComponentTypeId::of::<Health>())));
}

#[test]
fn unsubscribing_during_a_notification_finishes_the_operation() {
    let mut manager = EntityManager::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let own_id = Rc::new(RefCell::new(None));
    let id = manager.subscribe_change(Box::new(SelfRemoving {
        queue: manager.subscription_queue(),
        id: own_id.clone(),
        seen: seen.clone(),
    }));
    *own_id.borrow_mut() = Some(id);

    let entity = manager.create(vec![Box::new(Health(1)), Box::new(Name("a".into()))]);
    let types = manager.component_types(&entity).unwrap();
    assert_eq!(seen.borrow().len(), types.len());

    manager.create(vec![Box::new(Health(2))]);
    assert_eq!(seen.borrow().len(), types.len());
    assert_eq!(manager.change_subscriber_count(), 0);
}
