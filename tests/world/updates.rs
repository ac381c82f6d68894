use std::time::Duration;

use voxel_world::{
    config::ChunkUpdateConfig,
    core::MtResource,
    engine_state::voxels::{
        chunk_update_manager::{ChunkUpdateManager, ChunkUpdateType},
        world::WorldProvider,
    },
};

use crate::flat_world;

fn manager(max_threads: usize) -> (MtResource<WorldProvider>, ChunkUpdateManager) {
    let world = MtResource::new(flat_world(256));
    let config = ChunkUpdateConfig {
        max_threads,
        workers: 2,
    };
    let updates = ChunkUpdateManager::new(world.clone(), &config);
    (world, updates)
}

#[test]
fn default_updates_stop_at_the_bound() {
    let (_world, mut updates) = manager(2);
    assert!(updates.queue_chunk_update(0, 0, ChunkUpdateType::DEFAULT));
    assert!(updates.queue_chunk_update(4, 0, ChunkUpdateType::DEFAULT));
    assert!(!updates.queue_chunk_update(8, 0, ChunkUpdateType::DEFAULT));
    assert!(!updates.is_processing(8, 0));
    assert_eq!(updates.in_flight_count(), 2);

    assert!(updates.queue_chunk_update(8, 0, ChunkUpdateType::PLAYER_TRIGGERED));
    assert!(updates.queue_chunk_update(12, 0, ChunkUpdateType::PLAYER_TRIGGERED));
    assert_eq!(updates.in_flight_count(), 4);

    assert!(updates.wait_for_updates(Duration::from_secs(30)));
    assert_eq!(updates.in_flight_count(), 0);
}

#[test]
fn chunk_in_flight_is_not_queued_twice() {
    let (_world, mut updates) = manager(4);
    assert!(updates.queue_chunk_update(1, 1, ChunkUpdateType::DEFAULT));
    assert!(!updates.queue_chunk_update(1, 1, ChunkUpdateType::DEFAULT));
    assert!(!updates.queue_chunk_update(1, 1, ChunkUpdateType::PLAYER_TRIGGERED));
    assert!(updates.wait_for_updates(Duration::from_secs(30)));
}

#[test]
fn completed_updates_leave_ready_chunks() {
    let (world, mut updates) = manager(2);
    updates.queue_chunk_update(-2, 3, ChunkUpdateType::DEFAULT);
    assert!(updates.wait_for_updates(Duration::from_secs(30)));

    let completed = updates.process_completed_updates();
    assert_eq!(completed.len(), 1);
    assert_eq!((completed[0].x, completed[0].z), (-2, 3));
    let chunk = world.get().loaded_chunk(-2, 3).unwrap();
    assert!(chunk.get().is_ready());
    assert!(chunk.get().has_pending_mesh());
    assert!(updates.process_completed_updates().is_empty());
}
