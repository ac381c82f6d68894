//! # World Provider
//!
//! The `WorldProvider` owns the chunk provider of one world and exposes the
//! world in global block coordinates: block, light and state access, block
//! edits with light repair, and the per-chunk update pipeline run by the chunk
//! update workers.
//!
//! ## Coordinates
//!
//! Global `x`/`z` map onto a chunk with [`calc_chunk_pos_x`] and a cell with
//! [`calc_block_pos_x`] (and the `z` variants); `y` is used as is. Any `y`
//! outside the world height reads as the sentinels (air, full light, state 0)
//! and is never written.
//!
//! ## Light Repair
//!
//! A block edit first recomputes the sunlight of its column, then the light of
//! the edited cell on both channels. Cells that got darker are retracted,
//! cells that got brighter are spread from. Propagation only reaches chunks
//! that are loaded and generated; everything else is left alone until its own
//! update runs.
//!
//! ## Persistence
//!
//! World metadata (title, seed, time) lives in `world.json` next to the chunk
//! index. Time is counted in days of the configured day/night length.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use cgmath::Point3;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::{
    config::EngineConfig,
    core::MtResource,
    error::{Error, Result},
};

use super::{
    block::block_type::BlockType,
    chunk::{
        calc_block_pos_x, calc_block_pos_z, calc_chunk_pos_x, calc_chunk_pos_z,
        is_valid_segment_count, Chunk, GenerationContext, LightType, NeighborMask,
        CHUNK_DIMENSION_Y, MAX_LIGHT, NEIGHBOR_OFFSETS,
    },
    chunk_provider::ChunkProvider,
    light::{spread_light, unspread_light, LightAccess, LIGHT_DIRECTIONS},
};

/// File name of the world metadata inside the world directory.
pub const WORLD_INFO_FILE: &str = "world.json";

/// Persisted world metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldInfo {
    /// World title.
    pub title: String,
    /// World seed.
    pub seed: u64,
    /// Elapsed time in days.
    pub time: f64,
}

impl WorldInfo {
    /// Reads `world.json` from `world_path`. A missing file is `Ok(None)`.
    pub fn load(world_path: &Path) -> Result<Option<Self>> {
        let path = world_path.join(WORLD_INFO_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::serialization(e.to_string()).with_context(path.display().to_string()))
    }

    /// Writes `world.json` into `world_path`, creating the directory.
    pub fn save(&self, world_path: &Path) -> Result<()> {
        fs::create_dir_all(world_path)?;
        let text =
            serde_json::to_string_pretty(self).map_err(|e| Error::serialization(e.to_string()))?;
        fs::write(world_path.join(WORLD_INFO_FILE), text)?;
        Ok(())
    }
}

/// A world: its chunks plus identity and clock.
pub struct WorldProvider {
    title: String,
    seed: u64,
    time_offset: f64,
    session_start: Instant,
    day_night_length_ms: u64,
    chunk_provider: ChunkProvider,
    vertical_segments: i32,
    persist: bool,
    world_path: PathBuf,
}

impl std::fmt::Debug for WorldProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldProvider")
            .field("title", &self.title)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl WorldProvider {
    /// Opens the world described by `config`, restoring its metadata and
    /// chunk index when persistence is enabled and they exist.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let world = &config.world;
        let world_path = world.world_path();
        let persist = world.persist_chunks;

        let info = if persist {
            match WorldInfo::load(&world_path) {
                Ok(info) => info,
                Err(e) => {
                    warn!("Ignoring unreadable world metadata: {e}");
                    None
                }
            }
        } else {
            None
        };
        let seed = info.as_ref().map_or_else(|| world.resolve_seed(), |info| info.seed);
        let time_offset = info.as_ref().map_or(0.0, |info| info.time);

        if !is_valid_segment_count(config.meshing.vertical_segments) {
            return Err(Error::config(format!(
                "vertical_segments must divide the chunk height, got {}",
                config.meshing.vertical_segments
            )));
        }
        let context = Arc::new(GenerationContext::from_config(&world.generator, seed));
        let near_cache_size = config.chunk_cache.near_cache_size;
        let chunk_provider = if persist {
            let index_path = world_path.join(format!("{}.chunks", world.title));
            ChunkProvider::open(near_cache_size, context, index_path)
        } else {
            ChunkProvider::in_memory(near_cache_size, context)
        };

        info!(
            "Opened world '{}' (seed {seed}, {} stored chunks)",
            world.title,
            chunk_provider.far_len()
        );

        Ok(WorldProvider {
            title: world.title.clone(),
            seed,
            time_offset,
            session_start: Instant::now(),
            day_night_length_ms: world.day_night_length_ms.max(1),
            chunk_provider,
            vertical_segments: config.meshing.vertical_segments,
            persist,
            world_path,
        })
    }

    /// A world that lives only in memory.
    ///
    /// # Arguments
    /// * `title` - World title
    /// * `chunk_provider` - Chunk storage, usually [`ChunkProvider::in_memory`]
    /// * `vertical_segments` - Mesh segments per chunk, a divisor of the chunk height
    pub fn new(
        title: impl Into<String>,
        chunk_provider: ChunkProvider,
        vertical_segments: i32,
    ) -> Result<Self> {
        if !is_valid_segment_count(vertical_segments) {
            return Err(Error::config(format!(
                "vertical_segments must divide the chunk height, got {vertical_segments}"
            )));
        }
        Ok(WorldProvider {
            title: title.into(),
            seed: chunk_provider.context().seed(),
            time_offset: 0.0,
            session_start: Instant::now(),
            day_night_length_ms: crate::config::DEFAULT_DAY_NIGHT_LENGTH_MS,
            chunk_provider,
            vertical_segments,
            persist: false,
            world_path: PathBuf::new(),
        })
    }

    /// The world title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The world seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Elapsed world time in days.
    pub fn time(&self) -> f64 {
        let elapsed = self.session_start.elapsed().as_millis() as f64;
        self.time_offset + elapsed / self.day_night_length_ms as f64
    }

    /// Sets the elapsed world time in days.
    pub fn set_time(&mut self, days: f64) {
        self.time_offset = days;
        self.session_start = Instant::now();
    }

    /// The metadata as it would be saved now.
    pub fn info(&self) -> WorldInfo {
        WorldInfo {
            title: self.title.clone(),
            seed: self.seed,
            time: self.time(),
        }
    }

    /// Directory of this world's files.
    pub fn world_path(&self) -> &Path {
        &self.world_path
    }

    /// The chunk storage.
    pub fn chunk_provider(&self) -> &ChunkProvider {
        &self.chunk_provider
    }

    /// The chunk storage, mutably.
    pub fn chunk_provider_mut(&mut self) -> &mut ChunkProvider {
        &mut self.chunk_provider
    }

    /// Mesh segments per chunk.
    pub fn vertical_segments(&self) -> i32 {
        self.vertical_segments
    }

    /// Returns the chunk at chunk coordinates `(x, z)`, loading or creating it.
    pub fn get_chunk(&mut self, x: i32, z: i32) -> MtResource<Chunk> {
        self.chunk_provider.get_chunk(x, z)
    }

    /// The chunk at chunk coordinates `(x, z)` if it is loaded.
    pub fn loaded_chunk(&self, x: i32, z: i32) -> Option<MtResource<Chunk>> {
        self.chunk_provider.loaded_chunk(x, z)
    }

    fn chunk_of(&self, x: i32, z: i32) -> Option<MtResource<Chunk>> {
        self.loaded_chunk(calc_chunk_pos_x(x), calc_chunk_pos_z(z))
    }

    // ---------------------------------------------------------------------
    // Global cell access

    /// Runs `f` on the loaded chunk holding global column `(x, z)`, passing the
    /// local column coordinates.
    fn with_chunk<T>(&self, x: i32, z: i32, f: impl FnOnce(&Chunk, i32, i32) -> T) -> Option<T> {
        let chunk = self.chunk_of(x, z)?;
        let guard = chunk.get();
        let value = f(&guard, calc_block_pos_x(x), calc_block_pos_z(z));
        Some(value)
    }

    /// The block at global `(x, y, z)`. Unloaded cells read as air.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockType {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return BlockType::AIR;
        }
        self.with_chunk(x, z, |chunk, bx, bz| chunk.get_block(bx, y, bz))
            .unwrap_or(BlockType::AIR)
    }

    /// The light at global `(x, y, z)`. Unloaded cells read as full light.
    pub fn get_light(&self, x: i32, y: i32, z: i32, light_type: LightType) -> i8 {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return MAX_LIGHT;
        }
        self.with_chunk(x, z, |chunk, bx, bz| chunk.get_light(bx, y, bz, light_type))
            .unwrap_or(MAX_LIGHT)
    }

    /// The state byte at global `(x, y, z)`. Unloaded cells read as 0.
    pub fn get_state(&self, x: i32, y: i32, z: i32) -> u8 {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return 0;
        }
        self.with_chunk(x, z, |chunk, bx, bz| chunk.get_state(bx, y, bz))
            .unwrap_or(0)
    }

    /// Writes a light value at global `(x, y, z)` without propagating it.
    pub fn set_light(&mut self, x: i32, y: i32, z: i32, value: i8, light_type: LightType) -> Result<()> {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return Ok(());
        }
        let (cx, cz) = (calc_chunk_pos_x(x), calc_chunk_pos_z(z));
        let mask = self.get_chunk(cx, cz).get_mut().set_light(
            calc_block_pos_x(x),
            y,
            calc_block_pos_z(z),
            value,
            light_type,
        )?;
        self.mark_neighbors_dirty(cx, cz, mask);
        Ok(())
    }

    /// Writes a state byte at global `(x, y, z)`.
    pub fn set_state(&mut self, x: i32, y: i32, z: i32, state: u8) -> Result<()> {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return Ok(());
        }
        let (cx, cz) = (calc_chunk_pos_x(x), calc_chunk_pos_z(z));
        self.get_chunk(cx, cz)
            .get_mut()
            .set_state(calc_block_pos_x(x), y, calc_block_pos_z(z), state)
    }

    /// True if every block above global `(x, y, z)` lets light through.
    pub fn can_block_see_the_sky(&self, x: i32, y: i32, z: i32) -> bool {
        self.with_chunk(x, z, |chunk, bx, bz| chunk.can_block_see_the_sky(bx, y, bz))
            .unwrap_or(true)
    }

    /// Marks the loaded neighbors of chunk `(x, z)` named by `mask` dirty.
    pub fn mark_neighbors_dirty(&self, x: i32, z: i32, mask: NeighborMask) {
        for offset in mask.offsets() {
            if let Some(neighbor) = self.loaded_chunk(x + offset.x, z + offset.y) {
                neighbor.get_mut().set_dirty(true);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Edits

    /// Places `block` at global `(x, y, z)`.
    ///
    /// # Arguments
    /// * `update_light` - Repair sunlight and block light around the cell
    /// * `overwrite` - Replace a non-air block; otherwise only air is written
    ///
    /// # Returns
    /// `Ok(true)` if the block was written.
    pub fn set_block(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        block: BlockType,
        update_light: bool,
        overwrite: bool,
    ) -> Result<bool> {
        if !(0..CHUNK_DIMENSION_Y).contains(&y) {
            return Ok(false);
        }
        let (cx, cz) = (calc_chunk_pos_x(x), calc_chunk_pos_z(z));
        let (bx, bz) = (calc_block_pos_x(x), calc_block_pos_z(z));
        let mask = {
            let chunk = self.get_chunk(cx, cz);
            let mut chunk = chunk.get_mut();
            chunk.generate()?;
            if !overwrite && chunk.get_block(bx, y, bz) != BlockType::AIR {
                return Ok(false);
            }
            chunk.set_block(bx, y, bz, block)?
        };
        self.mark_neighbors_dirty(cx, cz, mask);

        if update_light {
            let pos = Point3::new(x, y, z);
            self.refresh_sunlight_column(x, z, true, true);
            self.relight(pos, LightType::SUN, 0);
            self.relight(pos, LightType::BLOCK, block.luminance());
        }
        Ok(true)
    }

    /// Resets the edited cell to `own` light, raises it from its neighbors,
    /// then spreads or retracts depending on how it changed.
    fn relight(&mut self, pos: Point3<i32>, light_type: LightType, own: i8) {
        let Some(previous) = self.light_at(pos, light_type) else {
            return;
        };
        let previous = match light_type {
            LightType::BLOCK => {
                self.set_light_at(pos, own, light_type);
                previous
            }
            // The column pass already settled sunlight from above.
            LightType::SUN => previous,
        };
        let current = self.refresh_light_at(pos, light_type);
        if current > previous {
            spread_light(self, pos, current, 0, light_type);
        } else if current < previous {
            unspread_light(self, pos, previous, light_type);
        }
    }

    /// Recomputes the sunlight of the column at global `(x, z)` from the top.
    ///
    /// Cells are lit while no sky-covering block has been seen above them.
    /// With `refresh`, covered cells are raised from their neighbors instead of
    /// going dark. With `spread`, every changed cell spreads (brighter) or
    /// retracts (darker) afterwards.
    pub fn refresh_sunlight_column(&mut self, x: i32, z: i32, spread: bool, refresh: bool) {
        let mut covered = false;
        let mut changes = Vec::new();
        for y in (0..CHUNK_DIMENSION_Y).rev() {
            let pos = Point3::new(x, y, z);
            let (Some(block), Some(old)) = (self.block_at(pos), self.light_at(pos, LightType::SUN))
            else {
                return;
            };
            if block.covers_sky() {
                covered = true;
            }
            let mut new = if covered { 0 } else { MAX_LIGHT };
            if new != old {
                self.set_light_at(pos, new, LightType::SUN);
            }
            if covered && refresh {
                new = self.refresh_light_at(pos, LightType::SUN);
            }
            if new != old {
                changes.push((pos, old, new));
            }
        }
        if !spread {
            return;
        }
        for (pos, old, new) in changes {
            if new > old {
                spread_light(self, pos, new, 0, LightType::SUN);
            } else {
                unspread_light(self, pos, old, LightType::SUN);
            }
        }
    }

    /// Raises the light at `pos` to what its brightest neighbor passes on.
    ///
    /// Opaque cells are not raised. Unreachable neighbors count as dark.
    ///
    /// # Returns
    /// The light at `pos` afterwards, 0 if `pos` is unreachable.
    pub fn refresh_light_at(&mut self, pos: Point3<i32>, light_type: LightType) -> i8 {
        let (Some(block), Some(current)) = (self.block_at(pos), self.light_at(pos, light_type)) else {
            return 0;
        };
        if !block.is_translucent() {
            return current;
        }
        let brightest = LIGHT_DIRECTIONS
            .iter()
            .filter_map(|direction| self.light_at(pos + *direction, light_type))
            .max()
            .unwrap_or(0);
        let raised = (brightest - 1).max(current);
        if raised > current {
            self.set_light_at(pos, raised, light_type);
        }
        raised
    }

    // ---------------------------------------------------------------------
    // Chunk pipeline

    /// Seeds light propagation from the sources of chunk `(x, z)` and clears
    /// its light-dirty flag.
    ///
    /// # Returns
    /// `false` if the chunk is not loaded, not generated or already lit.
    pub fn update_light(&mut self, x: i32, z: i32) -> bool {
        let Some(chunk) = self.loaded_chunk(x, z) else {
            return false;
        };
        let sources = {
            let chunk = chunk.get();
            if chunk.is_fresh() || !chunk.is_light_dirty() {
                return false;
            }
            let sources: Vec<_> = chunk
                .light_sources()
                .into_iter()
                .map(|(local, value, light_type)| {
                    (chunk.to_global(local.x, local.y, local.z), value, light_type)
                })
                .collect();
            sources
        };
        for (pos, value, light_type) in sources {
            spread_light(self, pos, value, 0, light_type);
        }
        chunk.get_mut().set_light_dirty(false);
        true
    }

    /// Brings chunk `(x, z)` up to date: generates it and its eight
    /// neighbors, propagates its light, and rebuilds its meshes.
    pub fn process_chunk(&mut self, x: i32, z: i32) -> Result<()> {
        let chunk = self.get_chunk(x, z);
        chunk.get_mut().generate()?;
        for offset in NEIGHBOR_OFFSETS {
            self.get_chunk(x + offset.x, z + offset.y)
                .get_mut()
                .generate()?;
        }
        self.update_light(x, z);
        chunk.get_mut().generate_meshes(self.vertical_segments);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Persistence

    /// Writes `world.json`.
    pub fn save_metadata(&self) -> Result<()> {
        self.info().save(&self.world_path)
    }

    /// Disposes all chunks and, when persisting, writes the chunk index and
    /// the world metadata.
    pub fn dispose(&mut self) -> Result<()> {
        self.chunk_provider.dispose()?;
        if self.persist {
            self.save_metadata()?;
            info!("Saved world '{}' to {}", self.title, self.world_path.display());
        }
        Ok(())
    }
}

impl LightAccess for WorldProvider {
    fn block_at(&self, pos: Point3<i32>) -> Option<BlockType> {
        let chunk = self.reachable_chunk(pos)?;
        let block = chunk
            .get()
            .get_block(calc_block_pos_x(pos.x), pos.y, calc_block_pos_z(pos.z));
        Some(block)
    }

    fn light_at(&self, pos: Point3<i32>, light_type: LightType) -> Option<i8> {
        let chunk = self.reachable_chunk(pos)?;
        let light = chunk.get().get_light(
            calc_block_pos_x(pos.x),
            pos.y,
            calc_block_pos_z(pos.z),
            light_type,
        );
        Some(light)
    }

    fn set_light_at(&mut self, pos: Point3<i32>, value: i8, light_type: LightType) {
        let Some(chunk) = self.reachable_chunk(pos) else {
            return;
        };
        let result = chunk.get_mut().set_light(
            calc_block_pos_x(pos.x),
            pos.y,
            calc_block_pos_z(pos.z),
            value,
            light_type,
        );
        match result {
            Ok(mask) => self.mark_neighbors_dirty(
                calc_chunk_pos_x(pos.x),
                calc_chunk_pos_z(pos.z),
                mask,
            ),
            Err(e) => warn!("Light write at {pos:?} dropped: {e}"),
        }
    }
}

impl WorldProvider {
    /// The chunk holding `pos` if light may flow into it.
    fn reachable_chunk(&self, pos: Point3<i32>) -> Option<MtResource<Chunk>> {
        if !(0..CHUNK_DIMENSION_Y).contains(&pos.y) {
            return None;
        }
        let chunk = self.chunk_of(pos.x, pos.z)?;
        let generated = !chunk.get().is_fresh();
        generated.then_some(chunk)
    }
}
