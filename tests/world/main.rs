//! World integration tests: light, the chunk cache, chunk updates,
//! relevance regions and whole-engine persistence.

mod cache;
mod engine;
mod light;
mod relevance;
mod sunlight;
mod updates;

use std::{path::PathBuf, sync::Arc};

use voxel_world::{
    config::{EngineConfig, GeneratorConfig},
    engine_state::voxels::{
        chunk::{FlatTerrainGenerator, GenerationContext},
        chunk_provider::ChunkProvider,
        world::WorldProvider,
    },
};

/// Height of the grass layer in flat test worlds.
pub const GROUND: i32 = 10;

pub fn flat_context() -> Arc<GenerationContext> {
    Arc::new(GenerationContext::new(11).with_generator(FlatTerrainGenerator::new(GROUND)))
}

pub fn flat_world(near_cache_size: usize) -> WorldProvider {
    WorldProvider::new("flat", ChunkProvider::in_memory(near_cache_size, flat_context()), 8).unwrap()
}

/// A fresh directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("voxel-world-{label}-{:016x}", fastrand::u64(..)))
}

pub fn flat_config(save_root: PathBuf, persist: bool) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.world.title = "flat".to_string();
    config.world.seed = Some(7);
    config.world.save_root = save_root;
    config.world.persist_chunks = persist;
    config.world.generator = GeneratorConfig::Flat { height: GROUND };
    config.updates.workers = 2;
    config.updates.max_threads = 2;
    config
}
