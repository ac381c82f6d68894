//! # Engine Configuration
//!
//! Plain serde structures describing how a world session is set up. A
//! configuration is loaded once (usually from a JSON file) and then handed to
//! the constructors that need it; nothing here is stored in a global.
//!
//! ## Example
//!
//! ```json
//! {
//!     "world": { "title": "Test World", "seed": 42 },
//!     "chunk_cache": { "near_cache_size": 256 },
//!     "updates": { "max_threads": 4 }
//! }
//! ```
//!
//! Every field has a default, so partial files are fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of one day/night cycle in milliseconds.
pub const DEFAULT_DAY_NIGHT_LENGTH_MS: u64 = 20 * 60 * 1000;

/// Top level configuration for an [`EngineState`](crate::engine_state::EngineState).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World identity and persistence.
    pub world: WorldConfig,
    /// Chunk cache sizing.
    pub chunk_cache: ChunkCacheConfig,
    /// Background chunk update dispatch.
    pub updates: ChunkUpdateConfig,
    /// Mesh segmentation.
    pub meshing: MeshingConfig,
    /// Relevance region loading.
    pub relevance: RelevanceConfig,
    /// Logger setup.
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is reported as [`ErrorKind::Config`](crate::error::ErrorKind::Config).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&text).map_err(|e| e.with_context(path.display().to_string()))
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes this configuration as pretty printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let segments = self.meshing.vertical_segments;
        if !crate::engine_state::voxels::chunk::is_valid_segment_count(segments) {
            return Err(Error::config(format!(
                "vertical_segments must divide the chunk height, got {segments}"
            )));
        }
        if self.chunk_cache.near_cache_size == 0 {
            return Err(Error::config("near_cache_size must be at least 1"));
        }
        Ok(())
    }
}

/// The terrain generator used for fresh chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Perlin height map terrain.
    Perlin,
    /// Flat terrain: stone up to `height`, topped with grass.
    Flat {
        /// Height of the grass layer.
        height: i32,
    },
}

/// World identity and persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World title, also used to name the save directory and chunk index file.
    pub title: String,
    /// World seed. A random seed is drawn when absent.
    pub seed: Option<u64>,
    /// Directory holding all saved worlds.
    pub save_root: PathBuf,
    /// Whether evicted chunks and the chunk index are written at all.
    pub persist_chunks: bool,
    /// Terrain generator for fresh chunks.
    pub generator: GeneratorConfig,
    /// Length of a day/night cycle in milliseconds.
    pub day_night_length_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            title: "New World".to_string(),
            seed: None,
            save_root: PathBuf::from("SAVED_WORLDS"),
            persist_chunks: true,
            generator: GeneratorConfig::Perlin,
            day_night_length_ms: DEFAULT_DAY_NIGHT_LENGTH_MS,
        }
    }
}

impl WorldConfig {
    /// Directory holding this world's files.
    pub fn world_path(&self) -> PathBuf {
        self.save_root.join(&self.title)
    }

    /// Returns the configured seed or draws a random one.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| fastrand::u64(..))
    }
}

/// Chunk cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkCacheConfig {
    /// Number of chunks kept in the near tier before a flush evicts one.
    pub near_cache_size: usize,
}

impl Default for ChunkCacheConfig {
    fn default() -> Self {
        Self {
            near_cache_size: 1024,
        }
    }
}

/// Background chunk update dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkUpdateConfig {
    /// Maximum number of non-forced updates in flight.
    pub max_threads: usize,
    /// Number of worker threads.
    pub workers: usize,
}

impl Default for ChunkUpdateConfig {
    fn default() -> Self {
        Self {
            max_threads: 2,
            workers: 2,
        }
    }
}

/// Mesh segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingConfig {
    /// Number of vertical mesh segments per chunk.
    pub vertical_segments: i32,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            vertical_segments: 8,
        }
    }
}

/// Relevance region loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Needed chunks loaded per [`EngineState::update`](crate::engine_state::EngineState::update).
    pub chunks_per_update: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            chunks_per_update: 16,
        }
    }
}

/// Logger setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "world": { "title": "Alpha", "seed": 9 } }"#)
            .unwrap();
        assert_eq!(config.world.title, "Alpha");
        assert_eq!(config.world.seed, Some(9));
        assert_eq!(config.chunk_cache.near_cache_size, 1024);
        assert_eq!(config.meshing.vertical_segments, 8);
    }

    #[test]
    fn generator_is_tagged() {
        let config =
            EngineConfig::from_json(r#"{ "world": { "generator": { "kind": "flat", "height": 40 } } }"#)
                .unwrap();
        assert_eq!(config.world.generator, GeneratorConfig::Flat { height: 40 });
    }

    #[test]
    fn bad_segment_count_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "meshing": { "vertical_segments": 7 } }"#)
            .unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = EngineConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Config(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("voxel-world-missing-{}.json", fastrand::u64(..)));
        assert_eq!(EngineConfig::load(&path).unwrap(), EngineConfig::default());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("voxel-world-config-{}.json", fastrand::u64(..)));
        let mut config = EngineConfig::default();
        config.world.title = "Saved".to_string();
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }
}
