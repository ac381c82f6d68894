//! # Structural Subscribers
//!
//! Subscribers hear about component additions, removals and changes, about
//! entities being deactivated or reactivated, and about entities being
//! destroyed. Notifications are synchronous and follow subscription order.
//!
//! ## Subscribing During a Notification
//!
//! Subscriptions go through a [`SubscriptionQueue`]. The manager drains the
//! queue once at the start of every operation that notifies, so a subscriber
//! that (un)subscribes while being notified changes nothing for the rest of
//! that operation; the change takes effect from the next operation on.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::StResource;

use super::{ComponentTypeId, EntityRef};

/// Receives structural changes of entities.
#[allow(unused_variables)]
pub trait EntityChangeSubscriber {
    /// A component of type `component` was added to `entity`.
    fn on_entity_component_added(&mut self, entity: &EntityRef, component: ComponentTypeId) {}

    /// The component of type `component` was changed on `entity`.
    fn on_entity_component_change(&mut self, entity: &EntityRef, component: ComponentTypeId) {}

    /// The component of type `component` was removed from `entity`.
    fn on_entity_component_removed(&mut self, entity: &EntityRef, component: ComponentTypeId) {}

    /// `entity` came back from storage with `components`.
    fn on_reactivation(&mut self, entity: &EntityRef, components: &[ComponentTypeId]) {}

    /// `entity` is about to be deactivated for storage with `components`.
    fn on_before_deactivation(&mut self, entity: &EntityRef, components: &[ComponentTypeId]) {}
}

/// Receives entity destruction.
pub trait EntityDestroySubscriber {
    /// `entity` was destroyed. The reference is still valid during the call.
    fn on_entity_destroyed(&mut self, entity: &EntityRef);
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

enum PendingOp {
    SubscribeChange(SubscriberId, Box<dyn EntityChangeSubscriber>),
    SubscribeDestroy(SubscriberId, Box<dyn EntityDestroySubscriber>),
    Unsubscribe(SubscriberId),
}

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

fn next_subscriber_id() -> SubscriberId {
    SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Cloneable handle for (un)subscribing, usable from inside a notification.
#[derive(Clone)]
pub struct SubscriptionQueue {
    pending: StResource<Vec<PendingOp>>,
}

impl SubscriptionQueue {
    fn new() -> Self {
        Self {
            pending: StResource::new(Vec::new()),
        }
    }

    /// Queues a change subscriber.
    pub fn subscribe_change(&self, subscriber: Box<dyn EntityChangeSubscriber>) -> SubscriberId {
        let id = next_subscriber_id();
        self.pending
            .get_mut()
            .push(PendingOp::SubscribeChange(id, subscriber));
        id
    }

    /// Queues a destroy subscriber.
    pub fn subscribe_destroy(&self, subscriber: Box<dyn EntityDestroySubscriber>) -> SubscriberId {
        let id = next_subscriber_id();
        self.pending
            .get_mut()
            .push(PendingOp::SubscribeDestroy(id, subscriber));
        id
    }

    /// Queues removal of a subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.pending.get_mut().push(PendingOp::Unsubscribe(id));
    }

    fn drain(&self) -> Vec<PendingOp> {
        std::mem::take(&mut *self.pending.get_mut())
    }
}

/// Insertion-ordered subscriber lists owned by the entity manager.
pub(crate) struct SubscriberRegistry {
    queue: SubscriptionQueue,
    change: Vec<(SubscriberId, Box<dyn EntityChangeSubscriber>)>,
    destroy: Vec<(SubscriberId, Box<dyn EntityDestroySubscriber>)>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self {
            queue: SubscriptionQueue::new(),
            change: Vec::new(),
            destroy: Vec::new(),
        }
    }

    pub(crate) fn queue(&self) -> SubscriptionQueue {
        self.queue.clone()
    }

    pub(crate) fn change_subscriber_count(&mut self) -> usize {
        self.begin_dispatch();
        self.change.len()
    }

    pub(crate) fn destroy_subscriber_count(&mut self) -> usize {
        self.begin_dispatch();
        self.destroy.len()
    }

    /// Applies queued (un)subscriptions. Called once per notifying operation.
    pub(crate) fn begin_dispatch(&mut self) {
        for op in self.queue.drain() {
            match op {
                PendingOp::SubscribeChange(id, subscriber) => self.change.push((id, subscriber)),
                PendingOp::SubscribeDestroy(id, subscriber) => self.destroy.push((id, subscriber)),
                PendingOp::Unsubscribe(id) => {
                    self.change.retain(|(existing, _)| *existing != id);
                    self.destroy.retain(|(existing, _)| *existing != id);
                }
            }
        }
    }

    pub(crate) fn each_change(&mut self, mut notify: impl FnMut(&mut dyn EntityChangeSubscriber)) {
        for (_, subscriber) in &mut self.change {
            notify(subscriber.as_mut());
        }
    }

    pub(crate) fn each_destroy(&mut self, mut notify: impl FnMut(&mut dyn EntityDestroySubscriber)) {
        for (_, subscriber) in &mut self.destroy {
            notify(subscriber.as_mut());
        }
    }
}
