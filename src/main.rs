//! # Voxel World Entry Point
//!
//! Opens the world described by a configuration file, loads the area around
//! the spawn point, lights it with a torch, and saves the world again.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- path/to/config.json
//! ```

use std::time::Duration;

use cgmath::{Point3, Vector3};
use log::{error, info};
use voxel_world::{
    config::EngineConfig,
    engine_state::{
        voxels::{block::block_type::BlockType, chunk::LightType, region::BlockRegion},
        EngineState,
    },
    error::Result,
};

const SPAWN_RADIUS: i32 = 24;

fn run(config_path: &str) -> Result<()> {
    let config = EngineConfig::load(config_path)?;
    voxel_world::init_logging(&config.logging);

    let mut engine = EngineState::new(config)?;
    let spawn = BlockRegion::new(
        Point3::new(-SPAWN_RADIUS, 0, -SPAWN_RADIUS),
        Point3::new(SPAWN_RADIUS, 255, SPAWN_RADIUS),
    );
    let player = Vector3::new(0.0, 80.0, 0.0);
    let ready = engine.make_blocks_relevant(spawn)?;
    while !ready.is_complete() {
        engine.update(player);
        std::thread::sleep(Duration::from_millis(5));
    }
    info!("Spawn area ready");

    let surface = (0..255)
        .rev()
        .find(|y| engine.world().get().get_block(0, *y, 0).covers_sky())
        .unwrap_or(0);
    engine.place_block(0, surface + 1, 0, BlockType::TORCH)?;
    info!(
        "Torch at height {}, block light two blocks away: {}",
        surface + 1,
        engine
            .world()
            .get()
            .get_light(2, surface + 1, 0, LightType::BLOCK)
    );

    engine.dispose()
}

fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    if let Err(e) = run(&config_path) {
        error!("{e}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
