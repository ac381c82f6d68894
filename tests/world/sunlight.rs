use proptest::prelude::*;
use voxel_world::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{Chunk, LightType, CHUNK_DIMENSION_Y, MAX_LIGHT},
};

fn column_light(chunk: &Chunk, x: i32, z: i32) -> Vec<i8> {
    (0..CHUNK_DIMENSION_Y)
        .map(|y| chunk.get_light(x, y, z, LightType::SUN))
        .collect()
}

#[test]
fn all_air_column_is_fully_lit() {
    let mut chunk = Chunk::new(0, 0);
    chunk.generate_sunlight();
    assert!(column_light(&chunk, 3, 4).iter().all(|light| *light == MAX_LIGHT));
}

#[test]
fn fully_opaque_column_is_dark() {
    let mut chunk = Chunk::new(0, 0);
    for y in 0..CHUNK_DIMENSION_Y {
        chunk.set_block(3, y, 4, BlockType::STONE).unwrap();
    }
    chunk.generate_sunlight();
    assert!(column_light(&chunk, 3, 4).iter().all(|light| *light == 0));
}

#[test]
fn billboards_let_sunlight_through() {
    let mut chunk = Chunk::new(0, 0);
    chunk.set_block(0, 20, 0, BlockType::DIRT).unwrap();
    chunk.set_block(0, 21, 0, BlockType::TALLGRASS).unwrap();
    chunk.generate_sunlight();
    assert_eq!(chunk.get_light(0, 21, 0, LightType::SUN), MAX_LIGHT);
    assert_eq!(chunk.get_light(0, 20, 0, LightType::SUN), 0);
    assert!(chunk.can_block_see_the_sky(0, 21, 0));
}

proptest! {
    #[test]
    fn light_stops_at_topmost_opaque_block(
        solid in prop::collection::vec(any::<bool>(), CHUNK_DIMENSION_Y as usize),
        x in 0i32..16,
        z in 0i32..16,
    ) {
        let mut chunk = Chunk::new(0, 0);
        for (y, solid) in solid.iter().enumerate() {
            if *solid {
                chunk.set_block(x, y as i32, z, BlockType::STONE).unwrap();
            }
        }
        chunk.generate_sunlight();

        let top = solid.iter().rposition(|solid| *solid).map(|y| y as i32);
        for y in 0..CHUNK_DIMENSION_Y {
            let expected = match top {
                Some(top) if y <= top => 0,
                _ => MAX_LIGHT,
            };
            prop_assert_eq!(chunk.get_light(x, y, z, LightType::SUN), expected, "y = {}", y);
        }
    }
}
