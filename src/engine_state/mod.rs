//! # Engine State Module
//!
//! The core engine module that ties the world, the entity system and the
//! background chunk updates together.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `relevance` - Regions pinned loaded, with completion futures
//! * `task_management` - Manages worker threads and task results
//! * `voxels` - Handles voxel data, chunks, light and the chunk cache
//!
//! ## Architecture
//!
//! `EngineState` lives on one owning thread. It holds the world behind an
//! [`MtResource`] so chunk update workers can lock it, while the entity
//! manager and the relevance bookkeeping never leave the owning thread.
//!
//! A typical loop calls [`EngineState::update`] once per tick with the player
//! position; edits go through [`EngineState::place_block`] and
//! [`EngineState::remove_block`], which repair light immediately and schedule
//! the mesh rebuilds.
//!
//! ```no_run
//! use cgmath::{Point3, Vector3};
//! use voxel_world::{
//!     config::EngineConfig,
//!     engine_state::{voxels::{block::block_type::BlockType, region::BlockRegion}, EngineState},
//! };
//!
//! let mut engine = EngineState::new(EngineConfig::default())?;
//! let spawn = BlockRegion::new(Point3::new(-8, 0, -8), Point3::new(8, 128, 8));
//! let ready = engine.make_blocks_relevant(spawn)?;
//! while !ready.is_complete() {
//!     engine.update(Vector3::new(0.0, 80.0, 0.0));
//! }
//! engine.place_block(0, 100, 0, BlockType::TORCH)?;
//! engine.dispose()?;
//! # Ok::<(), voxel_world::error::Error>(())
//! ```

pub mod relevance;
pub mod task_management;
pub mod voxels;

use std::time::Duration;

use cgmath::Vector3;
use log::{debug, info};

use crate::{
    config::EngineConfig,
    core::MtResource,
    entity_system::EntityManager,
    error::Result,
};

use relevance::{RegionFuture, RelevanceSystem};
use voxels::{
    block::block_type::BlockType,
    chunk::{calc_chunk_pos_x, calc_chunk_pos_z, NEIGHBOR_OFFSETS},
    chunk_update_manager::{ChunkUpdateManager, ChunkUpdateType},
    region::BlockRegion,
    world::WorldProvider,
};

/// How long [`EngineState::dispose`] waits for running chunk updates.
pub const DISPOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// The main engine state.
pub struct EngineState {
    /// Engine configuration
    config: EngineConfig,
    /// The voxel world containing all chunk data
    world: MtResource<WorldProvider>,
    /// Background chunk updates
    chunk_updates: ChunkUpdateManager,
    /// Entities and their components
    entity_manager: EntityManager,
    /// Regions pinned loaded
    relevance: RelevanceSystem,
    /// Forced updates that could not be queued yet, in chunk coordinates
    pending_updates: Vec<(i32, i32)>,
    /// Player position as of the last update
    player_position: Vector3<f32>,
}

impl EngineState {
    /// Creates a new engine state, opening the configured world.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration
    ///
    /// # Returns
    ///
    /// A fully initialized `EngineState`, or the error that kept the world
    /// from opening.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let world = MtResource::new(WorldProvider::open(&config)?);
        let chunk_updates = ChunkUpdateManager::new(world.clone(), &config.updates);
        let relevance = RelevanceSystem::new(config.relevance.chunks_per_update);
        info!("Engine state ready for world '{}'", config.world.title);

        Ok(Self {
            config,
            world,
            chunk_updates,
            entity_manager: EntityManager::new(),
            relevance,
            pending_updates: Vec::new(),
            player_position: Vector3::new(0.0, 0.0, 0.0),
        })
    }

    /// The configuration the engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the world.
    pub fn world(&self) -> &MtResource<WorldProvider> {
        &self.world
    }

    /// The entity manager.
    pub fn entity_manager(&self) -> &EntityManager {
        &self.entity_manager
    }

    /// The entity manager, mutably.
    pub fn entity_manager_mut(&mut self) -> &mut EntityManager {
        &mut self.entity_manager
    }

    /// The chunk update manager.
    pub fn chunk_updates(&self) -> &ChunkUpdateManager {
        &self.chunk_updates
    }

    /// The chunk update manager, mutably.
    pub fn chunk_updates_mut(&mut self) -> &mut ChunkUpdateManager {
        &mut self.chunk_updates
    }

    /// The relevance regions.
    pub fn relevance(&self) -> &RelevanceSystem {
        &self.relevance
    }

    /// Player position as of the last update.
    pub fn player_position(&self) -> Vector3<f32> {
        self.player_position
    }

    /// Places `block` at global `(x, y, z)` if the cell is air.
    ///
    /// Light is repaired before this returns; the mesh rebuild of the chunk
    /// and its dirty neighbors is scheduled as a player triggered update.
    ///
    /// # Returns
    /// `Ok(true)` if the block was placed.
    pub fn place_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> Result<bool> {
        let placed = self.world.get_mut().set_block(x, y, z, block, true, false)?;
        if placed {
            self.schedule_edit_updates(x, z);
        }
        Ok(placed)
    }

    /// Removes the block at global `(x, y, z)`, leaving air.
    ///
    /// # Returns
    /// `Ok(true)` if a block was removed.
    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> Result<bool> {
        let removed = {
            let mut world = self.world.get_mut();
            if world.get_block(x, y, z) == BlockType::AIR {
                false
            } else {
                world.set_block(x, y, z, BlockType::AIR, true, true)?
            }
        };
        if removed {
            self.schedule_edit_updates(x, z);
        }
        Ok(removed)
    }

    fn schedule_edit_updates(&mut self, x: i32, z: i32) {
        let (cx, cz) = (calc_chunk_pos_x(x), calc_chunk_pos_z(z));
        let mut chunks = vec![(cx, cz)];
        {
            let world = self.world.get();
            for offset in NEIGHBOR_OFFSETS {
                let (nx, nz) = (cx + offset.x, cz + offset.y);
                let dirty = world
                    .loaded_chunk(nx, nz)
                    .is_some_and(|chunk| chunk.get().is_dirty());
                if dirty {
                    chunks.push((nx, nz));
                }
            }
        }
        for (x, z) in chunks {
            self.force_update(x, z);
        }
    }

    fn force_update(&mut self, x: i32, z: i32) {
        if !self
            .chunk_updates
            .queue_chunk_update(x, z, ChunkUpdateType::PLAYER_TRIGGERED)
            && !self.pending_updates.contains(&(x, z))
        {
            debug!("Chunk ({x}, {z}) is busy, retrying its update later");
            self.pending_updates.push((x, z));
        }
    }

    /// Advances the engine by one tick.
    ///
    /// Collects finished chunk updates, retries deferred edits, advances the
    /// relevance regions, and lets the chunk cache evict one chunk if it is
    /// over its bound.
    ///
    /// # Arguments
    ///
    /// * `player` - Current player position; eviction starts farthest from it
    pub fn update(&mut self, player: Vector3<f32>) {
        self.player_position = player;

        for chunk in self.chunk_updates.process_completed_updates() {
            self.relevance.chunk_ready(chunk);
        }

        for (x, z) in std::mem::take(&mut self.pending_updates) {
            self.force_update(x, z);
        }

        {
            let world = self.world.get();
            self.relevance
                .update(&world, &mut self.chunk_updates, &mut self.entity_manager);
        }

        let pinned = self.relevance.pinned_chunks();
        self.world
            .get_mut()
            .chunk_provider_mut()
            .flush_cache(player, &pinned);
    }

    /// Makes the blocks of `region` relevant.
    ///
    /// # Returns
    /// A future that completes once every chunk touching `region` is
    /// generated and lit. Drop or cancel it to release the region.
    pub fn make_blocks_relevant(&mut self, region: BlockRegion) -> Result<RegionFuture> {
        self.relevance
            .make_blocks_relevant(&mut self.entity_manager, region)
    }

    /// Blocks until running chunk updates finished or `timeout` passed.
    ///
    /// # Returns
    /// `true` if no update is in flight anymore.
    pub fn wait_for_updates(&mut self, timeout: Duration) -> bool {
        self.chunk_updates.wait_for_updates(timeout)
    }

    /// Waits for running updates, then disposes the world, persisting it
    /// when configured to.
    pub fn dispose(&mut self) -> Result<()> {
        if !self.chunk_updates.wait_for_updates(DISPOSE_TIMEOUT) {
            log::warn!("Disposing with chunk updates still running");
        }
        self.entity_manager.clear();
        self.world.get_mut().dispose()
    }
}
