//! # Chunk Update Manager
//!
//! Dispatches chunk updates to worker threads and tracks which chunks are
//! being processed.
//!
//! ## Admission
//!
//! A chunk is never updated twice at the same time. Ordinary updates are also
//! refused once `max_threads` updates are in flight; player triggered updates
//! are always admitted and simply queue behind the running ones.
//!
//! ## Completion
//!
//! Workers report back through the task manager. The in-flight entry is only
//! cleared when [`ChunkUpdateManager::process_completed_updates`] runs on the
//! owning thread, which also returns the chunks that finished since the last
//! call.

use std::{collections::HashSet, time::Duration};

use cgmath::Point3;
use log::trace;

use crate::{
    config::ChunkUpdateConfig,
    core::MtResource,
    engine_state::task_management::TaskManager,
};

use super::{
    chunk::{chunk_id, ChunkId},
    tasks::chunk_update_task::ChunkUpdateTask,
    world::WorldProvider,
};

/// Kinds of chunk updates.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkUpdateType {
    /// Background update, subject to the in-flight bound.
    DEFAULT,
    /// Update caused by a player edit, always admitted.
    PLAYER_TRIGGERED,
}

/// Owning-thread bookkeeping handed to finished update results.
#[derive(Debug, Default)]
pub struct UpdateLedger {
    /// Chunks currently being processed.
    pub in_flight: HashSet<ChunkId>,
    /// Chunks finished since the last drain.
    pub completed: Vec<Point3<i32>>,
}

/// Schedules chunk update pipelines on worker threads.
pub struct ChunkUpdateManager {
    world: MtResource<WorldProvider>,
    task_manager: TaskManager<UpdateLedger>,
    ledger: UpdateLedger,
    max_threads: usize,
}

impl ChunkUpdateManager {
    /// Creates a manager with `config.workers` worker threads.
    pub fn new(world: MtResource<WorldProvider>, config: &ChunkUpdateConfig) -> Self {
        ChunkUpdateManager {
            world,
            task_manager: TaskManager::new(config.workers.max(1)),
            ledger: UpdateLedger::default(),
            max_threads: config.max_threads,
        }
    }

    /// Requests an update of the chunk at chunk coordinates `(x, z)`.
    ///
    /// # Returns
    /// `false` if the chunk is already being updated, or if the update is
    /// [`ChunkUpdateType::DEFAULT`] and the in-flight bound is reached.
    pub fn queue_chunk_update(&mut self, x: i32, z: i32, update_type: ChunkUpdateType) -> bool {
        let id = chunk_id(x, z);
        if self.ledger.in_flight.contains(&id) {
            return false;
        }
        if update_type != ChunkUpdateType::PLAYER_TRIGGERED
            && self.ledger.in_flight.len() >= self.max_threads
        {
            return false;
        }

        self.ledger.in_flight.insert(id);
        let position = Point3::new(x, 0, z);
        trace!("Queueing {update_type:?} update of chunk {position:?}");
        self.task_manager
            .publish_task(Box::new(ChunkUpdateTask::new(self.world.clone(), position)));
        true
    }

    /// Handles finished updates.
    ///
    /// # Returns
    /// Chunk coordinates of the chunks updated since the last call.
    pub fn process_completed_updates(&mut self) -> Vec<Point3<i32>> {
        self.task_manager.process_completed_tasks(&mut self.ledger);
        std::mem::take(&mut self.ledger.completed)
    }

    /// Blocks until every update finished or `timeout` passed, without
    /// draining the finished chunks.
    ///
    /// # Returns
    /// `true` if nothing is in flight anymore.
    pub fn wait_for_updates(&mut self, timeout: Duration) -> bool {
        self.task_manager.wait_for_tasks(&mut self.ledger, timeout)
    }

    /// True if the chunk at `(x, z)` is being updated.
    pub fn is_processing(&self, x: i32, z: i32) -> bool {
        self.ledger.in_flight.contains(&chunk_id(x, z))
    }

    /// Number of updates in flight.
    pub fn in_flight_count(&self) -> usize {
        self.ledger.in_flight.len()
    }

    /// The in-flight bound for ordinary updates.
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine_state::voxels::{
        chunk::{FlatTerrainGenerator, GenerationContext},
        chunk_provider::ChunkProvider,
    };

    fn manager(max_threads: usize) -> (MtResource<WorldProvider>, ChunkUpdateManager) {
        let context = GenerationContext::new(1).with_generator(FlatTerrainGenerator::new(4));
        let provider = ChunkProvider::in_memory(128, Arc::new(context));
        let world = MtResource::new(WorldProvider::new("updates", provider, 4).unwrap());
        let config = ChunkUpdateConfig {
            max_threads,
            workers: 2,
        };
        let manager = ChunkUpdateManager::new(world.clone(), &config);
        (world, manager)
    }

    #[test]
    fn duplicate_updates_are_rejected() {
        let (_, mut manager) = manager(4);
        assert!(manager.queue_chunk_update(0, 0, ChunkUpdateType::DEFAULT));
        assert!(!manager.queue_chunk_update(0, 0, ChunkUpdateType::PLAYER_TRIGGERED));
        assert!(manager.is_processing(0, 0));
        assert!(manager.wait_for_updates(Duration::from_secs(30)));
        assert_eq!(manager.process_completed_updates(), vec![Point3::new(0, 0, 0)]);
        assert!(!manager.is_processing(0, 0));
    }

    #[test]
    fn bound_applies_to_default_updates_only() {
        let (_, mut manager) = manager(2);
        assert!(manager.queue_chunk_update(0, 0, ChunkUpdateType::DEFAULT));
        assert!(manager.queue_chunk_update(3, 0, ChunkUpdateType::DEFAULT));
        assert!(!manager.queue_chunk_update(6, 0, ChunkUpdateType::DEFAULT));
        assert!(manager.queue_chunk_update(9, 0, ChunkUpdateType::PLAYER_TRIGGERED));
        assert_eq!(manager.in_flight_count(), 3);
        assert!(manager.wait_for_updates(Duration::from_secs(30)));
        assert_eq!(manager.process_completed_updates().len(), 3);
        assert_eq!(manager.in_flight_count(), 0);
    }

    #[test]
    fn updated_chunk_is_ready() {
        let (world, mut manager) = manager(2);
        manager.queue_chunk_update(-2, 5, ChunkUpdateType::DEFAULT);
        assert!(manager.wait_for_updates(Duration::from_secs(30)));
        let chunk = world.get().loaded_chunk(-2, 5).unwrap();
        assert!(chunk.get().is_ready());
        assert!(chunk.get().has_pending_mesh());
    }
}
