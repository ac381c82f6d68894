use cgmath::Point3;
use proptest::prelude::*;
use voxel_world::{
    engine_state::{relevance::RelevanceSystem, voxels::region::BlockRegion},
    entity_system::EntityManager,
};

/// Blocks spanning chunks (0, 0)..=(2, 1).
fn three_by_two() -> BlockRegion {
    BlockRegion::new(Point3::new(0, 0, 0), Point3::new(47, 100, 31))
}

fn target_chunks() -> Vec<Point3<i32>> {
    let mut chunks = Vec::new();
    for z in 0..2 {
        for x in 0..3 {
            chunks.push(Point3::new(x, 0, z));
        }
    }
    chunks
}

proptest! {
    #[test]
    fn completes_exactly_when_the_last_distinct_chunk_reports(
        order in Just(target_chunks()).prop_shuffle(),
        repeats in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let mut entities = EntityManager::new();
        let mut relevance = RelevanceSystem::new(4);
        let future = relevance.make_blocks_relevant(&mut entities, three_by_two()).unwrap();

        let (last, first) = order.split_last().unwrap();
        for chunk in first {
            relevance.chunk_ready(*chunk);
            prop_assert!(!future.is_complete());
        }
        for index in &repeats {
            relevance.chunk_ready(first[index % first.len()]);
            prop_assert!(!future.is_complete());
        }
        relevance.chunk_ready(*last);
        prop_assert!(future.is_complete());
        relevance.chunk_ready(*last);
        relevance.chunk_ready(Point3::new(9, 0, 9));
        prop_assert!(future.is_complete());
    }
}

#[test]
fn chunks_outside_the_target_do_not_count() {
    let mut entities = EntityManager::new();
    let mut relevance = RelevanceSystem::new(4);
    let future = relevance.make_blocks_relevant(&mut entities, three_by_two()).unwrap();

    // Pinned by the padding, but not part of the target.
    relevance.chunk_ready(Point3::new(-1, 0, 0));
    relevance.chunk_ready(Point3::new(3, 0, 2));
    for chunk in target_chunks().into_iter().skip(1) {
        relevance.chunk_ready(chunk);
    }
    assert!(!future.is_complete());
    assert!(relevance.pinned_chunks().len() > target_chunks().len());
}

#[test]
fn waiting_on_an_unfinished_region_times_out() {
    let mut entities = EntityManager::new();
    let mut relevance = RelevanceSystem::new(4);
    let future = relevance.make_blocks_relevant(&mut entities, three_by_two()).unwrap();
    assert!(!future.wait_timeout(std::time::Duration::from_millis(10)));
    assert_eq!(entities.active_entity_count(), 1);
}
