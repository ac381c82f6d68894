//! # Light Propagation
//!
//! Flood fill of light values over global coordinates. Both passes run on an
//! explicit queue instead of recursion, so large light values cannot exhaust
//! the stack, and both are written against [`LightAccess`] so they cross chunk
//! boundaries through whatever owns the chunks.
//!
//! ## Spreading
//!
//! A cell lit with `value` passes `value - 1` to every face-adjacent
//! translucent neighbor darker than that. Breadth first order means each cell
//! is reached along a shortest path first, so no cell is written twice.
//!
//! ## Retraction
//!
//! Retracting a source zeroes the region it lit. A neighbor at least as bright
//! as the value being retracted is lit by something else and is recorded as a
//! bright spot instead; once the retraction is done every bright spot spreads
//! again from its current value, reflooding the zeroed cells with the light of
//! the remaining sources. Bright spots are reflooded in discovery order, which
//! follows [`LIGHT_DIRECTIONS`].

use std::collections::VecDeque;

use cgmath::{Point3, Vector3};

use super::{block::block_type::BlockType, chunk::LightType};

/// Neighbor directions in iteration order: +x, -x, +y, -y, +z, -z.
pub const LIGHT_DIRECTIONS: [Vector3<i32>; 6] = [
    Vector3::new(1, 0, 0),
    Vector3::new(-1, 0, 0),
    Vector3::new(0, 1, 0),
    Vector3::new(0, -1, 0),
    Vector3::new(0, 0, 1),
    Vector3::new(0, 0, -1),
];

/// Cell access for the propagation passes, in global coordinates.
///
/// Cells that cannot be reached (outside the world height, or in a chunk that
/// is not loaded) answer `None` and are left alone.
pub trait LightAccess {
    /// The block at `pos`.
    fn block_at(&self, pos: Point3<i32>) -> Option<BlockType>;

    /// The light at `pos`.
    fn light_at(&self, pos: Point3<i32>, light_type: LightType) -> Option<i8>;

    /// Writes the light at `pos`. Writes to unreachable cells are dropped.
    fn set_light_at(&mut self, pos: Point3<i32>, value: i8, light_type: LightType);
}

/// Light a cell produces on its own, which retraction must not take away.
fn emission(block: BlockType, light_type: LightType) -> i8 {
    match light_type {
        LightType::BLOCK => block.luminance(),
        LightType::SUN => 0,
    }
}

/// Spreads `value` from `origin`, which itself is set to `value - depth`.
pub fn spread_light<W: LightAccess + ?Sized>(
    world: &mut W,
    origin: Point3<i32>,
    value: i8,
    depth: i8,
    light_type: LightType,
) {
    if depth > value || value - depth < 1 {
        return;
    }
    world.set_light_at(origin, value - depth, light_type);

    let mut queue = VecDeque::from([(origin, value - depth)]);
    while let Some((pos, current)) = queue.pop_front() {
        let next = current - 1;
        if next < 1 {
            continue;
        }
        for direction in LIGHT_DIRECTIONS {
            let neighbor = pos + direction;
            let (Some(light), Some(block)) =
                (world.light_at(neighbor, light_type), world.block_at(neighbor))
            else {
                continue;
            };
            if light < next && block.is_translucent() {
                world.set_light_at(neighbor, next, light_type);
                queue.push_back((neighbor, next));
            }
        }
    }
}

/// Retracts light of intensity `value` spread from `origin`, then refloods
/// from the bright spots found along the way.
pub fn unspread_light<W: LightAccess + ?Sized>(
    world: &mut W,
    origin: Point3<i32>,
    value: i8,
    light_type: LightType,
) {
    let mut bright_spots = Vec::new();

    let own = world
        .block_at(origin)
        .map_or(0, |block| emission(block, light_type));
    world.set_light_at(origin, own, light_type);
    if own > 0 {
        bright_spots.push(origin);
    }

    let mut queue = VecDeque::from([(origin, value)]);
    while let Some((pos, current)) = queue.pop_front() {
        for direction in LIGHT_DIRECTIONS {
            let neighbor = pos + direction;
            let (Some(light), Some(block)) =
                (world.light_at(neighbor, light_type), world.block_at(neighbor))
            else {
                continue;
            };
            if light > 0 && light < current && block.is_translucent() {
                let own = emission(block, light_type);
                world.set_light_at(neighbor, own, light_type);
                if own > 0 {
                    bright_spots.push(neighbor);
                }
                queue.push_back((neighbor, current - 1));
            } else if light >= current {
                bright_spots.push(neighbor);
            }
        }
    }

    for spot in bright_spots {
        if let Some(light) = world.light_at(spot, light_type) {
            spread_light(world, spot, light, 0, light_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    /// A bounded box of cells, air unless set.
    struct Grid {
        size: i32,
        blocks: HashMap<Point3<i32>, BlockType>,
        light: HashMap<Point3<i32>, i8>,
    }

    impl Grid {
        fn new(size: i32) -> Self {
            Grid {
                size,
                blocks: HashMap::new(),
                light: HashMap::new(),
            }
        }

        fn contains(&self, pos: Point3<i32>) -> bool {
            (0..self.size).contains(&pos.x)
                && (0..self.size).contains(&pos.y)
                && (0..self.size).contains(&pos.z)
        }

        fn place_source(&mut self, pos: Point3<i32>, block: BlockType) {
            self.blocks.insert(pos, block);
            spread_light(self, pos, block.luminance(), 0, LightType::BLOCK);
        }

        fn remove_source(&mut self, pos: Point3<i32>) {
            let previous = self.light_at(pos, LightType::BLOCK).unwrap_or(0);
            self.blocks.insert(pos, BlockType::AIR);
            unspread_light(self, pos, previous, LightType::BLOCK);
        }

        fn snapshot(&self) -> Vec<i8> {
            let mut values = Vec::new();
            for x in 0..self.size {
                for y in 0..self.size {
                    for z in 0..self.size {
                        values.push(self.light.get(&Point3::new(x, y, z)).copied().unwrap_or(0));
                    }
                }
            }
            values
        }
    }

    impl LightAccess for Grid {
        fn block_at(&self, pos: Point3<i32>) -> Option<BlockType> {
            self.contains(pos)
                .then(|| self.blocks.get(&pos).copied().unwrap_or(BlockType::AIR))
        }

        fn light_at(&self, pos: Point3<i32>, _light_type: LightType) -> Option<i8> {
            self.contains(pos)
                .then(|| self.light.get(&pos).copied().unwrap_or(0))
        }

        fn set_light_at(&mut self, pos: Point3<i32>, value: i8, _light_type: LightType) {
            if self.contains(pos) {
                self.light.insert(pos, value);
            }
        }
    }

    #[test]
    fn spread_decreases_by_distance() {
        let mut grid = Grid::new(32);
        grid.place_source(Point3::new(16, 16, 16), BlockType::TORCH);
        assert_eq!(grid.light_at(Point3::new(16, 16, 16), LightType::BLOCK), Some(14));
        assert_eq!(grid.light_at(Point3::new(20, 16, 16), LightType::BLOCK), Some(10));
        assert_eq!(grid.light_at(Point3::new(18, 17, 15), LightType::BLOCK), Some(10));
        assert_eq!(grid.light_at(Point3::new(16, 16, 30), LightType::BLOCK), Some(0));
        assert_eq!(grid.light_at(Point3::new(16, 16, 29), LightType::BLOCK), Some(1));
    }

    #[test]
    fn opaque_blocks_stop_light() {
        let mut grid = Grid::new(16);
        for y in 0..16 {
            for z in 0..16 {
                grid.blocks.insert(Point3::new(8, y, z), BlockType::STONE);
            }
        }
        grid.place_source(Point3::new(6, 8, 8), BlockType::TORCH);
        assert_eq!(grid.light_at(Point3::new(8, 8, 8), LightType::BLOCK), Some(0));
        assert_eq!(grid.light_at(Point3::new(9, 8, 8), LightType::BLOCK), Some(0));
    }

    #[test]
    fn removing_only_source_goes_dark() {
        let mut grid = Grid::new(32);
        let torch = Point3::new(16, 16, 16);
        grid.place_source(torch, BlockType::TORCH);
        grid.remove_source(torch);
        assert!(grid.snapshot().iter().all(|v| *v == 0));
    }

    #[test]
    fn removing_one_of_two_sources_leaves_the_other_exact() {
        let a = Point3::new(10, 16, 16);
        let b = Point3::new(16, 16, 16);

        let mut both = Grid::new(32);
        both.place_source(a, BlockType::TORCH);
        both.blocks.insert(b, BlockType::TORCH);
        spread_light(&mut both, b, 10, 0, LightType::BLOCK);
        both.remove_source(a);

        let mut only_b = Grid::new(32);
        only_b.blocks.insert(b, BlockType::TORCH);
        spread_light(&mut only_b, b, 10, 0, LightType::BLOCK);

        assert_eq!(both.snapshot(), only_b.snapshot());
    }
}
