//! # Lifecycle Events
//!
//! The entity manager announces lifecycle transitions through an injected
//! [`EventSystem`]. Each dispatch names the entity, the event, and the
//! component types the event is about; handlers can require a set of
//! component types and only see events whose scope covers all of them.
//!
//! [`EventBus`] is a small in-process implementation that resolves handler
//! lists per event kind at registration time.

use std::collections::HashMap;

use super::{Component, ComponentTypeId, EntityRef};

/// Tag of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Sent before an entity's components are stored.
    BeforeEntityCreated,
    /// Components were added.
    OnAddedComponent,
    /// Components became active.
    OnActivatedComponent,
    /// An existing component was replaced or saved.
    OnChangedComponent,
    /// Components are about to stop being live.
    BeforeDeactivateComponent,
    /// Components are about to be removed for good.
    BeforeRemoveComponent,
}

/// Payload of [`EventKind::BeforeEntityCreated`].
///
/// Handlers may add, replace, or remove components; whatever is left when the
/// dispatch returns is what gets stored.
#[derive(Debug)]
pub struct BeforeEntityCreated {
    prefab: Option<String>,
    components: Vec<Box<dyn Component>>,
}

impl BeforeEntityCreated {
    pub(crate) fn new(prefab: Option<String>, components: Vec<Box<dyn Component>>) -> Self {
        Self { prefab, components }
    }

    /// Name of the prefab the entity comes from.
    pub fn prefab(&self) -> Option<&str> {
        self.prefab.as_deref()
    }

    /// Components that will be stored.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.components.iter().map(|c| c.as_ref())
    }

    /// Adds a component, replacing one of the same type.
    pub fn add_component(&mut self, component: Box<dyn Component>) {
        let type_id = component.component_type();
        self.components.retain(|c| c.component_type() != type_id);
        self.components.push(component);
    }

    /// Drops the component of type `type_id` from the pending set.
    pub fn remove_component(&mut self, type_id: ComponentTypeId) -> Option<Box<dyn Component>> {
        let index = self
            .components
            .iter()
            .position(|c| c.component_type() == type_id)?;
        Some(self.components.remove(index))
    }

    pub(crate) fn into_components(self) -> Vec<Box<dyn Component>> {
        self.components
    }
}

/// A lifecycle event.
#[derive(Debug)]
pub enum LifecycleEvent {
    /// See [`BeforeEntityCreated`].
    BeforeEntityCreated(BeforeEntityCreated),
    /// Components were added.
    OnAddedComponent,
    /// Components became active.
    OnActivatedComponent,
    /// A component was changed.
    OnChangedComponent,
    /// Components are about to stop being live.
    BeforeDeactivateComponent,
    /// Components are about to be removed.
    BeforeRemoveComponent,
}

impl LifecycleEvent {
    /// The event's tag.
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::BeforeEntityCreated(_) => EventKind::BeforeEntityCreated,
            LifecycleEvent::OnAddedComponent => EventKind::OnAddedComponent,
            LifecycleEvent::OnActivatedComponent => EventKind::OnActivatedComponent,
            LifecycleEvent::OnChangedComponent => EventKind::OnChangedComponent,
            LifecycleEvent::BeforeDeactivateComponent => EventKind::BeforeDeactivateComponent,
            LifecycleEvent::BeforeRemoveComponent => EventKind::BeforeRemoveComponent,
        }
    }
}

/// Event dispatch capability injected into the entity manager.
pub trait EventSystem {
    /// Delivers `event` about `entity`. `scope` lists the component types the
    /// event concerns; handlers requiring types outside it are skipped.
    fn send(&mut self, entity: &EntityRef, event: &mut LifecycleEvent, scope: &[ComponentTypeId]);
}

type Handler = Box<dyn FnMut(&EntityRef, &mut LifecycleEvent)>;

struct Registration {
    required: Vec<ComponentTypeId>,
    handler: Handler,
}

/// In-process [`EventSystem`] with handlers keyed by event kind.
///
/// ```
/// use voxel_world::entity_system::{EventBus, EventKind, EventSystem, EntityRef, LifecycleEvent};
///
/// let mut bus = EventBus::new();
/// bus.subscribe(EventKind::OnAddedComponent, &[], |entity, _| {
///     log::info!("components added to {:?}", entity);
/// });
/// assert_eq!(bus.handler_count(EventKind::OnAddedComponent), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Registration>>,
}

impl EventBus {
    /// Creates a bus without handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, restricted to events whose scope
    /// contains every type in `required`.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        required: &[ComponentTypeId],
        handler: impl FnMut(&EntityRef, &mut LifecycleEvent) + 'static,
    ) {
        self.handlers.entry(kind).or_default().push(Registration {
            required: required.to_vec(),
            handler: Box::new(handler),
        });
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl EventSystem for EventBus {
    fn send(&mut self, entity: &EntityRef, event: &mut LifecycleEvent, scope: &[ComponentTypeId]) {
        let Some(registrations) = self.handlers.get_mut(&event.kind()) else {
            return;
        };
        for registration in registrations {
            if registration.required.iter().all(|t| scope.contains(t)) {
                (registration.handler)(entity, event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Debug, Clone)]
    struct Door;
    impl Component for Door {}

    #[derive(Debug, Clone)]
    struct Lock;
    impl Component for Lock {}

    #[test]
    fn handlers_respect_required_types() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let door_hits = hits.clone();
        bus.subscribe(
            EventKind::OnAddedComponent,
            &[ComponentTypeId::of::<Door>()],
            move |_, _| door_hits.borrow_mut().push("door"),
        );
        let any_hits = hits.clone();
        bus.subscribe(EventKind::OnAddedComponent, &[], move |_, _| {
            any_hits.borrow_mut().push("any")
        });

        let entity = EntityRef::new(1);
        bus.send(
            &entity,
            &mut LifecycleEvent::OnAddedComponent,
            &[ComponentTypeId::of::<Lock>()],
        );
        bus.send(
            &entity,
            &mut LifecycleEvent::OnAddedComponent,
            &[ComponentTypeId::of::<Door>(), ComponentTypeId::of::<Lock>()],
        );
        assert_eq!(*hits.borrow(), vec!["any", "door", "any"]);
    }

    #[test]
    fn before_entity_created_is_mutable() {
        let mut event = BeforeEntityCreated::new(None, vec![Box::new(Door)]);
        event.add_component(Box::new(Lock));
        assert!(event.remove_component(ComponentTypeId::of::<Door>()).is_some());
        let types: Vec<_> = event.components().map(|c| c.component_type()).collect();
        assert_eq!(types, vec![ComponentTypeId::of::<Lock>()]);
    }
}
