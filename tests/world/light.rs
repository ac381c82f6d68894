use cgmath::Point3;
use voxel_world::engine_state::voxels::{
    block::block_type::BlockType, chunk::LightType, world::WorldProvider,
};

use crate::{flat_world, GROUND};

const LAVA: Point3<i32> = Point3::new(4, GROUND + 1, 8);
const TORCH: Point3<i32> = Point3::new(10, GROUND + 1, 8);

fn lit_world() -> WorldProvider {
    let mut world = flat_world(64);
    world.process_chunk(0, 0).unwrap();
    world
}

fn place(world: &mut WorldProvider, pos: Point3<i32>, block: BlockType) {
    assert!(world.set_block(pos.x, pos.y, pos.z, block, true, true).unwrap());
}

fn block_light_around(world: &WorldProvider) -> Vec<i8> {
    let mut values = Vec::new();
    for x in -12..28 {
        for y in GROUND..GROUND + 17 {
            for z in -8..24 {
                values.push(world.get_light(x, y, z, LightType::BLOCK));
            }
        }
    }
    values
}

#[test]
fn removing_the_brighter_source_leaves_the_other() {
    let mut both = lit_world();
    place(&mut both, LAVA, BlockType::LAVA);
    place(&mut both, TORCH, BlockType::TORCH);
    place(&mut both, LAVA, BlockType::AIR);

    let mut torch_only = lit_world();
    place(&mut torch_only, TORCH, BlockType::TORCH);

    assert_eq!(block_light_around(&both), block_light_around(&torch_only));
    // Between the two sources, lit by the torch alone.
    assert_eq!(both.get_light(7, GROUND + 1, 8, LightType::BLOCK), 11);
    assert_eq!(both.get_light(LAVA.x, LAVA.y, LAVA.z, LightType::BLOCK), 8);
}

#[test]
fn removing_the_dimmer_source_keeps_the_brighter() {
    let mut both = lit_world();
    place(&mut both, LAVA, BlockType::LAVA);
    place(&mut both, TORCH, BlockType::TORCH);
    place(&mut both, TORCH, BlockType::AIR);

    let mut lava_only = lit_world();
    place(&mut lava_only, LAVA, BlockType::LAVA);

    assert_eq!(block_light_around(&both), block_light_around(&lava_only));
    assert_eq!(both.get_light(TORCH.x, TORCH.y, TORCH.z, LightType::BLOCK), 9);
}

#[test]
fn light_does_not_pass_the_ground() {
    let mut world = lit_world();
    place(&mut world, TORCH, BlockType::TORCH);
    assert_eq!(world.get_light(TORCH.x, GROUND, TORCH.z, LightType::BLOCK), 0);
    assert_eq!(world.get_light(TORCH.x, GROUND - 1, TORCH.z, LightType::BLOCK), 0);
    assert_eq!(world.get_light(TORCH.x, GROUND + 2, TORCH.z, LightType::BLOCK), 13);
}
