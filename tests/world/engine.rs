use std::time::Duration;

use cgmath::{Point3, Vector3};
use voxel_world::{
    engine_state::{
        relevance::RegionFuture,
        voxels::{block::block_type::BlockType, chunk::LightType, region::BlockRegion},
        EngineState,
    },
    entity_system::{ComponentTypeId, LocationComponent},
    error::ErrorKind,
};
use web_time::Instant;

use crate::{flat_config, temp_dir, GROUND};

const PLAYER: Vector3<f32> = Vector3::new(8.0, 20.0, 8.0);

fn spawn() -> BlockRegion {
    BlockRegion::new(Point3::new(0, 0, 0), Point3::new(15, 64, 15))
}

fn update_until_ready(engine: &mut EngineState, future: &RegionFuture) -> bool {
    let deadline = Instant::now() + Duration::from_secs(60);
    while !future.is_complete() {
        if Instant::now() > deadline {
            return false;
        }
        engine.update(PLAYER);
        std::thread::sleep(Duration::from_millis(2));
    }
    true
}

#[test]
fn relevant_region_becomes_ready_and_anchored() {
    let dir = temp_dir("engine");
    let mut engine = EngineState::new(flat_config(dir.clone(), false)).unwrap();
    let future = engine.make_blocks_relevant(spawn()).unwrap();
    assert!(update_until_ready(&mut engine, &future));

    let chunk = engine.world().get().loaded_chunk(0, 0).unwrap();
    assert!(chunk.get().is_ready());
    let anchors = engine
        .entity_manager()
        .entities_with(&[ComponentTypeId::of::<LocationComponent>()]);
    assert_eq!(anchors.len(), 1);

    drop(future);
    engine.update(PLAYER);
    assert_eq!(engine.relevance().region_count(), 0);
    assert_eq!(engine.entity_manager().active_entity_count(), 0);

    engine.dispose().unwrap();
    assert!(!dir.exists());
}

#[test]
fn empty_region_is_an_error() {
    let mut engine = EngineState::new(flat_config(temp_dir("engine"), false)).unwrap();
    let inverted = BlockRegion::new(Point3::new(4, 0, 4), Point3::new(0, 0, 0));
    let error = engine.make_blocks_relevant(inverted).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidRegion));
}

#[test]
fn edits_relight_immediately() {
    let mut engine = EngineState::new(flat_config(temp_dir("engine"), false)).unwrap();
    let future = engine.make_blocks_relevant(spawn()).unwrap();
    assert!(update_until_ready(&mut engine, &future));

    assert!(engine.place_block(8, GROUND + 1, 8, BlockType::TORCH).unwrap());
    assert!(!engine.place_block(8, GROUND + 1, 8, BlockType::STONE).unwrap());
    assert_eq!(
        engine.world().get().get_light(10, GROUND + 1, 8, LightType::BLOCK),
        12
    );

    assert!(engine.remove_block(8, GROUND + 1, 8).unwrap());
    assert!(!engine.remove_block(8, GROUND + 1, 8).unwrap());
    assert_eq!(
        engine.world().get().get_light(10, GROUND + 1, 8, LightType::BLOCK),
        0
    );

    assert!(engine.wait_for_updates(Duration::from_secs(30)));
    engine.dispose().unwrap();
}

#[test]
fn edits_survive_reopening_the_world() {
    let dir = temp_dir("reopen");
    let config = flat_config(dir.clone(), true);

    let mut engine = EngineState::new(config.clone()).unwrap();
    let future = engine.make_blocks_relevant(spawn()).unwrap();
    assert!(update_until_ready(&mut engine, &future));
    assert!(engine.place_block(3, GROUND + 1, 5, BlockType::GLASS).unwrap());
    engine.dispose().unwrap();
    drop(engine);

    let mut reopened_config = config;
    reopened_config.world.seed = None;
    let mut engine = EngineState::new(reopened_config).unwrap();
    assert_eq!(engine.world().get().seed(), 7);
    let future = engine.make_blocks_relevant(spawn()).unwrap();
    assert!(update_until_ready(&mut engine, &future));
    assert_eq!(engine.world().get().get_block(3, GROUND + 1, 5), BlockType::GLASS);
    engine.dispose().unwrap();

    std::fs::remove_dir_all(dir).unwrap();
}
