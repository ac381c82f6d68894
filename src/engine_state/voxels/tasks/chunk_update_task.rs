//! # Chunk Update Task
//!
//! This module defines the `ChunkUpdateTask`, which runs the full update
//! pipeline of one chunk (generation of it and its neighbors, light
//! propagation, mesh rebuild) on a worker thread.

use cgmath::Point3;
use log::error;

use crate::{
    core::MtResource,
    engine_state::{
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::chunk_id,
            chunk_update_manager::UpdateLedger,
            world::WorldProvider,
        },
    },
    error::Result,
};

/// Brings one chunk up to date on a worker thread.
pub struct ChunkUpdateTask {
    /// The world owning the chunk
    world: MtResource<WorldProvider>,
    /// Chunk coordinates of the chunk to update
    position: Point3<i32>,
}

impl ChunkUpdateTask {
    /// Creates a new chunk update task.
    ///
    /// # Arguments
    /// * `world` - A thread-safe reference to the world
    /// * `position` - The chunk coordinates of the chunk to update
    pub fn new(world: MtResource<WorldProvider>, position: Point3<i32>) -> Self {
        ChunkUpdateTask { world, position }
    }
}

impl Task<UpdateLedger> for ChunkUpdateTask {
    fn process(&self) -> Box<dyn TaskResult<UpdateLedger> + Send> {
        let outcome = self
            .world
            .get_mut()
            .process_chunk(self.position.x, self.position.z);
        Box::new(ChunkUpdateTaskResult {
            position: self.position,
            outcome,
        })
    }
}

/// The outcome of a [`ChunkUpdateTask`].
pub struct ChunkUpdateTaskResult {
    position: Point3<i32>,
    outcome: Result<()>,
}

impl TaskResult<UpdateLedger> for ChunkUpdateTaskResult {
    /// Clears the chunk's in-flight entry and records it as updated.
    fn handle_result(self: Box<Self>, ledger: &mut UpdateLedger) -> Vec<Box<dyn Task<UpdateLedger> + Send>> {
        ledger
            .in_flight
            .remove(&chunk_id(self.position.x, self.position.z));
        match self.outcome {
            Ok(()) => ledger.completed.push(self.position),
            Err(e) => error!("Update of chunk {:?} failed: {e}", self.position),
        }
        Vec::new()
    }
}
