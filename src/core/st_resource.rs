use std::{
    rc::Rc,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A single-threaded, reference-counted resource container.
///
/// The main-thread counterpart of [`MtResource`](super::MtResource): the
/// value is shared between owners on one thread, for example the entity
/// manager and the subscribers holding a handle to its subscription queue.
///
/// # Examples
///
/// ```
/// use voxel_world::core::StResource;
///
/// let pending = StResource::new(Vec::<u32>::new());
/// let writer = pending.clone();
/// writer.get_mut().push(3);
/// assert_eq!(*pending.get(), vec![3]);
/// ```
pub struct StResource<T> {
    resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard for the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a mutable guard for the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
