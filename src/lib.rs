#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! The simulation core of a voxel game: an entity/component store with
//! prefabs and lifecycle events, and a chunked voxel world with light
//! propagation, a two-tier chunk cache and background chunk updates.
//!
//! ## Key Modules
//!
//! * `config` - Serde configuration for a world session
//! * `core` - Shared resource containers used throughout the engine
//! * `entity_system` - Entities, components, pools, prefabs and lifecycle events
//! * `engine_state` - The world, chunk updates, relevance regions and the engine state tying them together
//! * `error` - The crate error type
//!
//! ## Architecture
//!
//! The engine has one owning thread. Entity state, relevance bookkeeping and
//! update completion live there; the world is shared with a small pool of
//! worker threads that generate, light and mesh chunks.
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_world::{config::EngineConfig, engine_state::EngineState};
//!
//! let config = EngineConfig::load("world.json")?;
//! voxel_world::init_logging(&config.logging);
//! let mut engine = EngineState::new(config)?;
//! engine.update(cgmath::Vector3::new(0.0, 64.0, 0.0));
//! engine.dispose()?;
//! # Ok::<(), voxel_world::error::Error>(())
//! ```
//!
//! ## Performance Considerations
//!
//! * Chunk-based voxel storage with dense arrays per chunk
//! * Light propagation on explicit queues, never recursion
//! * Evicted chunks are compressed off the owning thread
//! * Chunk updates run on worker threads with a bounded in-flight count

pub mod config;
pub mod core;
pub mod engine_state;
pub mod entity_system;
pub mod error;

use config::LoggingConfig;

/// Initializes `env_logger` on stdout.
///
/// `RUST_LOG` overrides the configured filter. Calling this more than once is
/// harmless; later calls keep the first logger.
pub fn init_logging(config: &LoggingConfig) {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_filters(&config.filter)
        .parse_env("RUST_LOG");
    if log_builder.try_init().is_ok() {
        log::info!("Logger initialized");
    }
}
