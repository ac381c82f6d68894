//! # Task System Core Traits
//!
//! This module defines the two halves of a unit of background work.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the owning thread with the
//!    manager's context
//! 5. The result can spawn follow-up tasks
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to a worker
//! - `TaskResult` must be `Send` to be transferred back
//! - The context `C` never leaves the owning thread

/// A unit of work executed on a worker thread.
///
/// Tasks own everything they need; shared state travels as
/// [`MtResource`](crate::core::MtResource) handles.
pub trait Task<C>: Send {
    /// Performs the work and returns a result for the owning thread.
    fn process(&self) -> Box<dyn TaskResult<C> + Send>;
}

/// The outcome of a [`Task`], handled on the owning thread.
pub trait TaskResult<C>: Send {
    /// Applies the outcome to `context`.
    ///
    /// # Returns
    /// Follow-up tasks to publish (may be empty).
    fn handle_result(self: Box<Self>, context: &mut C) -> Vec<Box<dyn Task<C> + Send>>;
}
