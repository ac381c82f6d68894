//! # Voxel World
//!
//! This module contains the voxel world: block definitions, chunk storage,
//! light propagation, the two-tier chunk cache and the background update
//! pipeline.
//!
//! ## Architecture
//!
//! * **Block**: Defines voxel types and their light and shape properties
//! * **Chunk**: Dense 16x256x16 columns of blocks, light and state
//! * **Light**: Queue based flood fill and retraction across chunk borders
//! * **Chunk Provider**: Near tier of live chunks, far tier of compressed records
//! * **World**: Global coordinate access and block edits with light repair
//! * **Chunk Update Manager**: Bounded dispatch of chunk updates to workers
//! * **Tasks**: The worker side of a chunk update
//!
//! ## Data Flow
//!
//! 1. The world receives a block edit and writes it into the owning chunk
//! 2. Light is repaired synchronously before the edit returns
//! 3. The edited chunk and dirty neighbors are queued for an update
//! 4. A worker generates, lights and meshes the chunk
//! 5. The owning thread collects the finished chunks
//!
//! ## Thread Safety
//!
//! Chunks and the world are shared as [`MtResource`](crate::core::MtResource)
//! handles. Workers take the world's write lock for a whole update, so at most
//! one thread mutates chunk arrays at a time.

pub mod block;
pub mod chunk;
pub mod chunk_provider;
pub mod chunk_update_manager;
pub mod light;
pub mod region;
pub mod tasks;
pub mod world;
