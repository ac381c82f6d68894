//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x256x16 column of the world
//! holding four parallel dense arrays over the same extent (block ids,
//! sunlight, block light and a per-voxel state byte).
//!
//! ## Flags
//!
//! Three independent flags describe what a chunk still needs:
//! - `fresh`: terrain has not been generated yet
//! - `light_dirty`: light values are stale and need a propagation pass
//! - `dirty`: content changed since the last mesh build
//!
//! A new chunk starts with all three set. Generation clears `fresh`, the light
//! pass clears `light_dirty`, and a successful mesh build clears `dirty`.
//!
//! ## Boundary Edits
//!
//! Meshes of the neighboring chunks look at this chunk's outer cells, so a
//! changed cell on the outer faces invalidates up to three of the eight
//! neighbors. Setters return a [`NeighborMask`] naming them; the world applies
//! it to whatever neighbors are loaded.
//!
//! ## Light Storage
//!
//! Light is stored as signed bytes. A negative raw value means "never lit" and
//! reads as full light (15), so an unlit chunk never shows spurious darkness.

use std::sync::Arc;

use cgmath::{InnerSpace, Point3, Vector2, Vector3};

use crate::error::{Error, ErrorKind, Result};

use super::block::{block_type::BlockType, BlockTypeSize};

mod generation;
pub mod mesh;
mod record;

pub use generation::{
    ChunkGenerator, FlatTerrainGenerator, GenerationContext, PerlinTerrainGenerator,
};
pub use mesh::{ChunkMesh, MeshFace};
pub use record::ChunkRecord;

use mesh::MeshSlot;

/// Width of a chunk along x, in blocks.
pub const CHUNK_DIMENSION_X: i32 = 16;
/// Height of a chunk along y, in blocks.
pub const CHUNK_DIMENSION_Y: i32 = 256;
/// Depth of a chunk along z, in blocks.
pub const CHUNK_DIMENSION_Z: i32 = 16;
/// The number of cells in one horizontal layer.
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION_X * CHUNK_DIMENSION_Z;
/// The total number of cells in a chunk.
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION_Y;

/// Full light intensity.
pub const MAX_LIGHT: i8 = 15;

/// Integer key of a chunk position, see [`chunk_id`].
pub type ChunkId = i64;

/// Which of the two light channels an operation addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Light coming down from the sky.
    SUN,
    /// Light emitted by luminous blocks.
    BLOCK,
}

/// Chunk offsets (x, z) of the eight horizontal neighbors, indexed as in
/// [`NeighborMask`].
pub const NEIGHBOR_OFFSETS: [Vector2<i32>; 8] = [
    Vector2::new(1, 0),
    Vector2::new(-1, 0),
    Vector2::new(0, 1),
    Vector2::new(0, -1),
    Vector2::new(1, 1),
    Vector2::new(-1, -1),
    Vector2::new(-1, 1),
    Vector2::new(1, -1),
];

/// Set of neighboring chunks, by index into [`NEIGHBOR_OFFSETS`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborMask(u8);

impl NeighborMask {
    /// No neighbors.
    pub const NONE: NeighborMask = NeighborMask(0);

    /// The neighbors whose meshes depend on the local cell column `(x, z)`.
    pub fn for_boundary_cell(x: i32, z: i32) -> Self {
        let max_x = CHUNK_DIMENSION_X - 1;
        let max_z = CHUNK_DIMENSION_Z - 1;
        let mut mask = 0u8;
        if x == 0 {
            mask |= 1 << 1;
        }
        if x == max_x {
            mask |= 1 << 0;
        }
        if z == 0 {
            mask |= 1 << 3;
        }
        if z == max_z {
            mask |= 1 << 2;
        }
        if x == max_x && z == 0 {
            mask |= 1 << 7;
        }
        if x == 0 && z == max_z {
            mask |= 1 << 6;
        }
        if x == 0 && z == 0 {
            mask |= 1 << 5;
        }
        if x == max_x && z == max_z {
            mask |= 1 << 4;
        }
        NeighborMask(mask)
    }

    /// True if neighbor `index` is in the set.
    pub fn contains(self, index: usize) -> bool {
        index < 8 && self.0 & (1 << index) != 0
    }

    /// True if the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of neighbors in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Chunk offsets of the neighbors in the set.
    pub fn offsets(self) -> impl Iterator<Item = Vector2<i32>> {
        (0..8)
            .filter(move |i| self.contains(*i))
            .map(|i| NEIGHBOR_OFFSETS[i])
    }
}

/// Folds an integer onto the naturals: 0, -1, 1, -2, 2 map to 0, 1, 2, 3, 4.
pub fn map_to_positive(value: i64) -> i64 {
    if value >= 0 {
        2 * value
    } else {
        -2 * value - 1
    }
}

/// Cantor pairing of two naturals.
pub fn cantorize(a: i64, b: i64) -> i64 {
    (a + b) * (a + b + 1) / 2 + b
}

/// True if `segments` splits the chunk height into equal mesh segments.
pub fn is_valid_segment_count(segments: i32) -> bool {
    segments > 0 && CHUNK_DIMENSION_Y % segments == 0
}

/// Smallest chunk coordinate a global `i32` coordinate falls into.
pub const MIN_CHUNK_COORD: i32 = i32::MIN / CHUNK_DIMENSION_X;
/// Largest chunk coordinate a global `i32` coordinate falls into.
pub const MAX_CHUNK_COORD: i32 = i32::MAX / CHUNK_DIMENSION_X;

/// Clamps a chunk coordinate into the range global coordinates can reach.
pub fn clamp_chunk_coord(value: i32) -> i32 {
    value.clamp(MIN_CHUNK_COORD, MAX_CHUNK_COORD)
}

/// The cache key of the chunk at chunk coordinates `(x, z)`.
///
/// Coordinates are clamped with [`clamp_chunk_coord`] first, which keeps the
/// pairing inside `i64`.
pub fn chunk_id(x: i32, z: i32) -> ChunkId {
    cantorize(
        map_to_positive(clamp_chunk_coord(x) as i64),
        map_to_positive(clamp_chunk_coord(z) as i64),
    )
}

/// Chunk coordinate holding the global x coordinate `x`.
pub fn calc_chunk_pos_x(x: i32) -> i32 {
    x.div_euclid(CHUNK_DIMENSION_X)
}

/// Chunk coordinate holding the global z coordinate `z`.
pub fn calc_chunk_pos_z(z: i32) -> i32 {
    z.div_euclid(CHUNK_DIMENSION_Z)
}

/// Local x coordinate of the global x coordinate `x` inside its chunk.
pub fn calc_block_pos_x(x: i32) -> i32 {
    x.rem_euclid(CHUNK_DIMENSION_X)
}

/// Local z coordinate of the global z coordinate `z` inside its chunk.
pub fn calc_block_pos_z(z: i32) -> i32 {
    z.rem_euclid(CHUNK_DIMENSION_Z)
}

/// A 16x256x16 column of the voxel world.
pub struct Chunk {
    /// Chunk coordinates. `y` is always 0; chunks span the full world height.
    position: Point3<i32>,
    blocks: Vec<BlockTypeSize>,
    sunlight: Vec<i8>,
    light: Vec<i8>,
    states: Vec<u8>,
    dirty: bool,
    light_dirty: bool,
    fresh: bool,
    context: Option<Arc<GenerationContext>>,
    meshes: MeshSlot,
    /// Bumped by every write to persisted state.
    revision: u64,
}

impl Chunk {
    /// Creates a new, ungenerated chunk.
    ///
    /// # Arguments
    /// * `x` - Chunk x coordinate
    /// * `z` - Chunk z coordinate
    ///
    /// # Returns
    /// A fresh, dirty, light-dirty chunk of air with unset sunlight.
    pub fn new(x: i32, z: i32) -> Self {
        let size = CHUNK_SIZE as usize;
        Chunk {
            position: Point3::new(x, 0, z),
            blocks: vec![BlockType::AIR.id(); size],
            sunlight: vec![-1; size],
            light: vec![0; size],
            states: vec![0; size],
            dirty: true,
            light_dirty: true,
            fresh: true,
            context: None,
            meshes: MeshSlot::default(),
            revision: 0,
        }
    }

    /// The chunk coordinates of this chunk.
    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    /// The cache key of this chunk.
    pub fn id(&self) -> ChunkId {
        chunk_id(self.position.x, self.position.z)
    }

    /// Global coordinates of the local cell `(x, y, z)`.
    pub fn to_global(&self, x: i32, y: i32, z: i32) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_DIMENSION_X + x,
            y,
            self.position.z * CHUNK_DIMENSION_Z + z,
        )
    }

    /// True if `(x, y, z)` addresses a cell of this chunk.
    pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        (0..CHUNK_DIMENSION_X).contains(&x)
            && (0..CHUNK_DIMENSION_Y).contains(&y)
            && (0..CHUNK_DIMENSION_Z).contains(&z)
    }

    fn index(x: i32, y: i32, z: i32) -> Option<usize> {
        Self::in_bounds(x, y, z)
            .then(|| (x + CHUNK_DIMENSION_X * (z + CHUNK_DIMENSION_Z * y)) as usize)
    }

    fn checked_index(x: i32, y: i32, z: i32) -> Result<usize> {
        Self::index(x, y, z).ok_or_else(|| Error::out_of_chunk_bounds(x, y, z))
    }

    // ---------------------------------------------------------------------
    // Flags

    /// Counter of writes to persisted state (cells, light and the
    /// generation flags). Mesh dirtiness does not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True if the mesh is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the mesh stale or current.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// True if light values need a propagation pass.
    pub fn is_light_dirty(&self) -> bool {
        self.light_dirty
    }

    /// Marks the light stale or current.
    pub fn set_light_dirty(&mut self, light_dirty: bool) {
        self.light_dirty = light_dirty;
        self.revision += 1;
    }

    /// True if terrain has not been generated yet.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Marks the chunk as generated or not.
    pub fn set_fresh(&mut self, fresh: bool) {
        self.fresh = fresh;
        self.revision += 1;
    }

    /// True once generated and lit, i.e. ready for meshing and relevance.
    pub fn is_ready(&self) -> bool {
        !self.fresh && !self.light_dirty
    }

    // ---------------------------------------------------------------------
    // Cells

    /// The block at local `(x, y, z)`. Cells outside the chunk read as `AIR`.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockType {
        Self::index(x, y, z)
            .map(|i| BlockType::get_block_type_from_int(self.blocks[i]))
            .unwrap_or(BlockType::AIR)
    }

    /// Writes a block. If the cell changed, the chunk becomes dirty and the
    /// returned mask names the neighbors that must become dirty too.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> Result<NeighborMask> {
        let i = Self::checked_index(x, y, z)?;
        if self.blocks[i] == block.id() {
            return Ok(NeighborMask::NONE);
        }
        self.blocks[i] = block.id();
        self.dirty = true;
        self.revision += 1;
        Ok(NeighborMask::for_boundary_cell(x, z))
    }

    /// The state byte at local `(x, y, z)`. Cells outside the chunk read as 0.
    pub fn get_state(&self, x: i32, y: i32, z: i32) -> u8 {
        Self::index(x, y, z).map(|i| self.states[i]).unwrap_or(0)
    }

    /// Writes a state byte. States are not visual, so nothing becomes dirty.
    pub fn set_state(&mut self, x: i32, y: i32, z: i32, state: u8) -> Result<()> {
        let i = Self::checked_index(x, y, z)?;
        self.states[i] = state;
        self.revision += 1;
        Ok(())
    }

    /// The light at local `(x, y, z)` on channel `light_type`.
    ///
    /// Cells outside the chunk and unset (negative) values read as
    /// [`MAX_LIGHT`].
    pub fn get_light(&self, x: i32, y: i32, z: i32, light_type: LightType) -> i8 {
        let Some(i) = Self::index(x, y, z) else {
            return MAX_LIGHT;
        };
        let raw = match light_type {
            LightType::SUN => self.sunlight[i],
            LightType::BLOCK => self.light[i],
        };
        if raw < 0 {
            MAX_LIGHT
        } else {
            raw
        }
    }

    /// Writes a light value in `0..=15`. Same dirty contract as [`set_block`](Self::set_block).
    pub fn set_light(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        value: i8,
        light_type: LightType,
    ) -> Result<NeighborMask> {
        if !(0..=MAX_LIGHT).contains(&value) {
            return Err(Error::light_out_of_range(value as i32));
        }
        let i = Self::checked_index(x, y, z)?;
        let cell = match light_type {
            LightType::SUN => &mut self.sunlight[i],
            LightType::BLOCK => &mut self.light[i],
        };
        if *cell == value {
            return Ok(NeighborMask::NONE);
        }
        *cell = value;
        self.dirty = true;
        self.revision += 1;
        Ok(NeighborMask::for_boundary_cell(x, z))
    }

    /// True if every block above local `(x, y, z)` lets light through.
    pub fn can_block_see_the_sky(&self, x: i32, y: i32, z: i32) -> bool {
        ((y + 1)..CHUNK_DIMENSION_Y).all(|above| self.get_block(x, above, z).is_translucent())
    }

    // ---------------------------------------------------------------------
    // Generation

    /// Re-attaches the provider context needed for generation.
    pub fn attach_context(&mut self, context: Arc<GenerationContext>) {
        self.context = Some(context);
    }

    /// True if a provider context is attached.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Runs the terrain generators and the initial sunlight pass.
    ///
    /// # Returns
    /// `Ok(true)` if terrain was generated, `Ok(false)` if the chunk was not
    /// fresh, or [`ErrorKind::DetachedChunk`] if no context is attached.
    pub fn generate(&mut self) -> Result<bool> {
        if !self.fresh {
            return Ok(false);
        }
        let context = self
            .context
            .clone()
            .ok_or_else(|| Error::new(ErrorKind::DetachedChunk(self.id())))?;
        for generator in context.generators() {
            generator.generate(self, context.seed())?;
        }
        self.generate_sunlight();
        self.fresh = false;
        self.revision += 1;
        log::trace!("Generated chunk {:?}", self.position);
        Ok(true)
    }

    /// Initial sunlight for every column.
    ///
    /// Scanning down, cells get full sunlight while the column is uncovered
    /// and the cell is invisible or a billboard; everything else gets 0 and
    /// waits for propagation from the neighbors.
    pub fn generate_sunlight(&mut self) {
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                let mut covered = false;
                for y in (0..CHUNK_DIMENSION_Y).rev() {
                    let block = self.get_block(x, y, z);
                    let value = if !covered && !block.covers_sky() { MAX_LIGHT } else { 0 };
                    if block.covers_sky() {
                        covered = true;
                    }
                    if let Some(i) = Self::index(x, y, z) {
                        self.sunlight[i] = value;
                    }
                }
            }
        }
        self.revision += 1;
    }

    /// Local cells to seed the light pass from.
    ///
    /// Returns `(x, y, z, value, type)` for every translucent sunlit cell and
    /// every luminous cell. Cells whose in-chunk neighbors are all already
    /// bright enough are skipped, they would not spread anywhere.
    pub fn light_sources(&self) -> Vec<(Point3<i32>, i8, LightType)> {
        let mut sources = Vec::new();
        for y in 0..CHUNK_DIMENSION_Y {
            for z in 0..CHUNK_DIMENSION_Z {
                for x in 0..CHUNK_DIMENSION_X {
                    let block = self.get_block(x, y, z);
                    let luminance = block.luminance();
                    if luminance > 0 {
                        sources.push((Point3::new(x, y, z), luminance, LightType::BLOCK));
                    }
                    if !block.is_translucent() {
                        continue;
                    }
                    let sun = self.get_light(x, y, z, LightType::SUN);
                    if sun > 1 && self.may_spread(x, y, z, sun, LightType::SUN) {
                        sources.push((Point3::new(x, y, z), sun, LightType::SUN));
                    }
                }
            }
        }
        sources
    }

    fn may_spread(&self, x: i32, y: i32, z: i32, value: i8, light_type: LightType) -> bool {
        super::light::LIGHT_DIRECTIONS.iter().any(|d| {
            let (nx, ny, nz) = (x + d.x, y + d.y, z + d.z);
            if !(0..CHUNK_DIMENSION_Y).contains(&ny) {
                return false;
            }
            if !Self::in_bounds(nx, ny, nz) {
                return true;
            }
            self.get_block(nx, ny, nz).is_translucent()
                && self.get_light(nx, ny, nz, light_type) < value - 1
        })
    }

    // ---------------------------------------------------------------------
    // Meshes

    /// Builds one mesh per vertical segment and hands them to the mesh slot.
    ///
    /// No-op unless the chunk is dirty, generated and lit. Clears `dirty` once
    /// the new meshes are accepted; if the slot is busy the chunk stays dirty
    /// and the next update retries.
    ///
    /// # Returns
    /// `true` if new meshes were stored.
    pub fn generate_meshes(&mut self, vertical_segments: i32) -> bool {
        if self.fresh
            || self.light_dirty
            || !self.dirty
            || !is_valid_segment_count(vertical_segments)
        {
            return false;
        }
        let segment_height = CHUNK_DIMENSION_Y / vertical_segments;
        let meshes = (0..vertical_segments)
            .map(|segment| ChunkMesh::build(self, segment, segment_height))
            .collect();
        if self.meshes.set_new_mesh(meshes) {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    /// Stores freshly built meshes, see [`MeshSlot::set_new_mesh`].
    pub fn set_new_mesh(&self, meshes: Vec<ChunkMesh>) -> bool {
        self.meshes.set_new_mesh(meshes)
    }

    /// Promotes pending meshes to active, see [`MeshSlot::swap_active_mesh`].
    pub fn swap_active_mesh(&self) -> bool {
        self.meshes.swap_active_mesh()
    }

    /// A copy of the active meshes.
    pub fn active_meshes(&self) -> Option<Vec<ChunkMesh>> {
        self.meshes.active()
    }

    /// True if meshes are waiting to be swapped in.
    pub fn has_pending_mesh(&self) -> bool {
        self.meshes.has_pending()
    }

    /// Releases mesh resources. A disposed chunk accepts no further meshes.
    pub fn dispose(&self) {
        self.meshes.dispose();
    }

    /// True once [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        self.meshes.is_disposed()
    }

    // ---------------------------------------------------------------------
    // Ordering

    /// Horizontal distance between this chunk's origin and `player`.
    pub fn distance_to(&self, player: Vector3<f32>) -> f32 {
        let origin = Vector3::new(
            (self.position.x * CHUNK_DIMENSION_X) as f32,
            0.0,
            (self.position.z * CHUNK_DIMENSION_Z) as f32,
        );
        let delta = origin - player;
        Vector2::new(delta.x, delta.z).magnitude()
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("dirty", &self.dirty)
            .field("light_dirty", &self.light_dirty)
            .field("fresh", &self.fresh)
            .finish()
    }
}
