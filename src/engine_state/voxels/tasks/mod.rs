//! # Voxel Task System
//!
//! Tasks related to world processing, run on the workers of the chunk update
//! manager.

pub mod chunk_update_task;
