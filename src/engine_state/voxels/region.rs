//! Axis aligned integer regions, inclusive on both ends.

use cgmath::{Point3, Vector3};

use super::chunk::{calc_chunk_pos_x, calc_chunk_pos_z};

/// An inclusive box of integer positions, in block or chunk coordinates.
///
/// A region whose `max` is below its `min` on any axis is empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockRegion {
    /// Lowest corner.
    pub min: Point3<i32>,
    /// Highest corner.
    pub max: Point3<i32>,
}

impl BlockRegion {
    /// The region spanning `min` to `max`.
    pub fn new(min: Point3<i32>, max: Point3<i32>) -> Self {
        BlockRegion { min, max }
    }

    /// The region spanning the two corners in any order.
    pub fn from_corners(a: Point3<i32>, b: Point3<i32>) -> Self {
        BlockRegion {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// True if the region holds no positions.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Number of positions along each axis.
    pub fn size(&self) -> Vector3<i32> {
        if self.is_empty() {
            return Vector3::new(0, 0, 0);
        }
        self.max - self.min + Vector3::new(1, 1, 1)
    }

    /// Number of positions in the region.
    pub fn volume(&self) -> usize {
        let size = self.size();
        size.x as usize * size.y as usize * size.z as usize
    }

    /// True if `pos` lies inside the region.
    pub fn contains(&self, pos: Point3<i32>) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// The center position, rounded towards `min`.
    pub fn center(&self) -> Point3<i32> {
        Point3::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y + (self.max.y - self.min.y) / 2,
            self.min.z + (self.max.z - self.min.z) / 2,
        )
    }

    /// The chunks touched by this block region. Chunks span the full height,
    /// so the chunk region is flat at `y = 0`.
    pub fn to_chunk_region(&self) -> BlockRegion {
        if self.is_empty() {
            return *self;
        }
        BlockRegion {
            min: Point3::new(calc_chunk_pos_x(self.min.x), 0, calc_chunk_pos_z(self.min.z)),
            max: Point3::new(calc_chunk_pos_x(self.max.x), 0, calc_chunk_pos_z(self.max.z)),
        }
    }

    /// Grows the region by `amount` on both sides of the x and z axes.
    pub fn expand(&self, amount: i32) -> BlockRegion {
        let pad = Vector3::new(amount, 0, amount);
        BlockRegion {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Grows `max` by one on every axis whose size is even, so the region has
    /// a center cell.
    pub fn make_odd(&self) -> BlockRegion {
        let size = self.size();
        let grow = |extent: i32| if extent % 2 == 0 { 1 } else { 0 };
        BlockRegion {
            min: self.min,
            max: self.max + Vector3::new(grow(size.x), grow(size.y), grow(size.z)),
        }
    }

    /// Every position in the region, x fastest.
    pub fn positions(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| {
            (min.z..=max.z).flat_map(move |z| (min.x..=max.x).map(move |x| Point3::new(x, y, z)))
        })
    }

    /// Index of `pos` in [`positions`](Self::positions) order.
    pub fn index_of(&self, pos: Point3<i32>) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let size = self.size();
        let local = pos - self.min;
        Some((local.x + size.x * (local.z + size.z * local.y)) as usize)
    }
}
