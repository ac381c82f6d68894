use std::{collections::HashSet, time::Duration};

use cgmath::Vector3;
use voxel_world::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{chunk_id, LightType},
    chunk_provider::ChunkProvider,
};

use crate::{flat_context, temp_dir, GROUND};

fn player_at_chunk(x: i32, z: i32) -> Vector3<f32> {
    Vector3::new((x * 16 + 8) as f32, 64.0, (z * 16 + 8) as f32)
}

#[test]
fn evicted_chunk_round_trips_through_far_tier() {
    let mut provider = ChunkProvider::in_memory(1, flat_context());
    let far_away = provider.get_chunk(9, 9);
    far_away.get_mut().generate().unwrap();
    far_away.get_mut().set_block(2, GROUND + 1, 3, BlockType::GLASS).unwrap();
    far_away.get_mut().set_state(2, GROUND + 1, 3, 4).unwrap();
    drop(far_away);
    provider.get_chunk(0, 0);

    let id = chunk_id(9, 9);
    assert!(provider.flush_cache(player_at_chunk(0, 0), &HashSet::new()));
    assert!(!provider.is_near(id));
    provider.wait_for_flush();
    assert!(provider.is_far(id));
    assert!(!provider.is_near(id));

    let reloaded = provider.get_chunk(9, 9);
    assert!(provider.is_near(id));
    assert!(!provider.is_far(id));
    let chunk = reloaded.get();
    assert!(!chunk.is_fresh());
    assert_eq!(chunk.get_block(2, GROUND + 1, 3), BlockType::GLASS);
    assert_eq!(chunk.get_block(2, GROUND, 3), BlockType::GRASS);
    assert_eq!(chunk.get_state(2, GROUND + 1, 3), 4);
}

#[test]
fn chunk_requested_during_eviction_stays_live() {
    let mut provider = ChunkProvider::in_memory(1, flat_context());
    let original = provider.get_chunk(5, 0);
    provider.get_chunk(0, 0);

    assert!(provider.flush_cache(player_at_chunk(0, 0), &HashSet::new()));
    let again = provider.get_chunk(5, 0);
    provider.wait_for_flush();

    assert!(again.ptr_eq(&original));
    assert!(provider.is_near(chunk_id(5, 0)));
    assert!(!provider.is_far(chunk_id(5, 0)));
    assert!(!again.get().is_disposed());
}

#[test]
fn light_written_during_eviction_is_not_lost() {
    let mut provider = ChunkProvider::in_memory(1, flat_context());
    let far_away = provider.get_chunk(9, 9);
    far_away.get_mut().generate().unwrap();
    drop(far_away);
    provider.get_chunk(0, 0);

    assert!(provider.flush_cache(player_at_chunk(0, 0), &HashSet::new()));
    std::thread::sleep(Duration::from_millis(50));
    let live = provider.loaded_chunk(9, 9).unwrap();
    live.get_mut()
        .set_light(2, GROUND + 1, 3, 12, LightType::BLOCK)
        .unwrap();
    drop(live);
    provider.wait_for_flush();

    let reloaded = provider.get_chunk(9, 9);
    assert_eq!(reloaded.get().get_light(2, GROUND + 1, 3, LightType::BLOCK), 12);
}

#[test]
fn pinned_chunks_are_never_evicted() {
    let mut provider = ChunkProvider::in_memory(1, flat_context());
    provider.get_chunk(0, 0);
    provider.get_chunk(1, 0);
    let pinned = HashSet::from([chunk_id(0, 0), chunk_id(1, 0)]);
    assert!(!provider.flush_cache(player_at_chunk(0, 0), &pinned));
    assert_eq!(provider.near_len(), 2);
}

#[test]
fn far_tier_survives_dispose_and_reopen() {
    let dir = temp_dir("cache");
    let index = dir.join("flat.chunks");

    let mut provider = ChunkProvider::open(4, flat_context(), index.clone());
    let chunk = provider.get_chunk(-3, 2);
    chunk.get_mut().generate().unwrap();
    chunk.get_mut().set_block(0, 40, 0, BlockType::WOOD).unwrap();
    drop(chunk);
    provider.dispose().unwrap();
    assert!(index.exists());

    let mut reopened = ChunkProvider::open(4, flat_context(), index);
    assert!(reopened.is_far(chunk_id(-3, 2)));
    let chunk = reopened.get_chunk(-3, 2);
    assert_eq!(chunk.get().get_block(0, 40, 0), BlockType::WOOD);

    std::fs::remove_dir_all(dir).unwrap();
}
