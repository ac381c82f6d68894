//! # Terrain Generation
//!
//! Generators fill a fresh chunk with terrain. They are bundled with the world
//! seed into a [`GenerationContext`] that the chunk provider attaches to every
//! chunk it hands out; a chunk decoded from the far tier has no context until
//! the provider re-attaches it.

use noise::{NoiseFn, Perlin};

use super::{Chunk, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z};
use crate::{
    config::GeneratorConfig,
    engine_state::voxels::block::block_type::BlockType,
    error::Result,
};

/// Fills chunks with terrain.
pub trait ChunkGenerator: Send + Sync {
    /// Writes terrain into the fresh `chunk`.
    fn generate(&self, chunk: &mut Chunk, seed: u64) -> Result<()>;
}

/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;
/// Average terrain height.
pub const TERRAIN_BASE_HEIGHT: f64 = 64.0;
/// Maximum deviation from the base height.
pub const TERRAIN_AMPLITUDE: f64 = 24.0;
/// Water fills air up to this height.
pub const SEA_LEVEL: i32 = 56;
/// Noise above this value grows a grass tuft on a grass block.
const TALLGRASS_THRESHOLD: f64 = 0.45;

/// Rolling height map terrain from 2D Perlin noise.
pub struct PerlinTerrainGenerator {
    perlin: Perlin,
    detail: Perlin,
}

impl PerlinTerrainGenerator {
    /// Creates a generator for `seed`.
    pub fn new(seed: u64) -> Self {
        PerlinTerrainGenerator {
            perlin: Perlin::new(seed as u32),
            detail: Perlin::new((seed >> 32) as u32 ^ 0x5eed),
        }
    }

    /// Terrain height at global column `(x, z)`.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let sample = self
            .perlin
            .get([x as f64 * PERLIN_SCALE_FACTOR, z as f64 * PERLIN_SCALE_FACTOR]);
        let height = TERRAIN_BASE_HEIGHT + sample * TERRAIN_AMPLITUDE;
        (height as i32).clamp(1, CHUNK_DIMENSION_Y - 2)
    }
}

impl ChunkGenerator for PerlinTerrainGenerator {
    fn generate(&self, chunk: &mut Chunk, _seed: u64) -> Result<()> {
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                let global = chunk.to_global(x, 0, z);
                let height = self.height_at(global.x, global.z);
                for y in 0..=height {
                    let block = if y == height {
                        if height < SEA_LEVEL {
                            BlockType::SAND
                        } else {
                            BlockType::GRASS
                        }
                    } else if y >= height - 3 {
                        BlockType::DIRT
                    } else {
                        BlockType::STONE
                    };
                    chunk.set_block(x, y, z, block)?;
                }
                if height < SEA_LEVEL {
                    for y in (height + 1)..=SEA_LEVEL {
                        chunk.set_block(x, y, z, BlockType::WATER)?;
                    }
                } else {
                    let tuft = self.detail.get([global.x as f64 * 0.5, global.z as f64 * 0.5]);
                    if tuft > TALLGRASS_THRESHOLD {
                        chunk.set_block(x, height + 1, z, BlockType::TALLGRASS)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Flat terrain: stone, then a grass layer at a fixed height.
pub struct FlatTerrainGenerator {
    height: i32,
}

impl FlatTerrainGenerator {
    /// Creates a generator whose grass layer sits at `height`.
    pub fn new(height: i32) -> Self {
        FlatTerrainGenerator {
            height: height.clamp(0, CHUNK_DIMENSION_Y - 1),
        }
    }
}

impl ChunkGenerator for FlatTerrainGenerator {
    fn generate(&self, chunk: &mut Chunk, _seed: u64) -> Result<()> {
        for x in 0..CHUNK_DIMENSION_X {
            for z in 0..CHUNK_DIMENSION_Z {
                for y in 0..self.height {
                    chunk.set_block(x, y, z, BlockType::STONE)?;
                }
                chunk.set_block(x, self.height, z, BlockType::GRASS)?;
            }
        }
        Ok(())
    }
}

/// Generators plus the seed they run with.
pub struct GenerationContext {
    seed: u64,
    generators: Vec<Box<dyn ChunkGenerator>>,
}

impl GenerationContext {
    /// A context without generators; chunks generate as air.
    pub fn new(seed: u64) -> Self {
        GenerationContext {
            seed,
            generators: Vec::new(),
        }
    }

    /// The context described by a generator configuration.
    pub fn from_config(generator: &GeneratorConfig, seed: u64) -> Self {
        let context = Self::new(seed);
        match generator {
            GeneratorConfig::Perlin => context.with_generator(PerlinTerrainGenerator::new(seed)),
            GeneratorConfig::Flat { height } => {
                context.with_generator(FlatTerrainGenerator::new(*height))
            }
        }
    }

    /// Appends a generator; generators run in the order they were added.
    pub fn with_generator(mut self, generator: impl ChunkGenerator + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    /// The world seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The generators, in run order.
    pub fn generators(&self) -> impl Iterator<Item = &dyn ChunkGenerator> + '_ {
        self.generators.iter().map(|g| g.as_ref())
    }
}
