//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world and
//! the per-type properties that lighting and meshing depend on.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::{BlockTypeSize, BLOCK_NAMES};

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant is the id stored in chunk arrays. The `FromPrimitive`
/// derive allows conversion back from the stored integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    /// Empty space. Invisible and translucent.
    AIR = 0,

    /// Plain dirt.
    DIRT = 1,

    /// Dirt with grass on top.
    GRASS = 2,

    /// Stone, the bulk of the terrain.
    STONE = 3,

    /// Sand.
    SAND = 4,

    /// Tree trunk.
    WOOD = 5,

    /// Tree foliage. Lets light through.
    LEAVES = 6,

    /// Glass. Lets light through.
    GLASS = 7,

    /// Grass tufts rendered as crossed billboards.
    TALLGRASS = 8,

    /// A torch. Emits block light.
    TORCH = 9,

    /// Lava. Emits full block light but blocks it otherwise.
    LAVA = 10,

    /// Still water. Lets light through.
    WATER = 11,
}

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Arguments
    /// * `btype` - The block id as stored in a chunk
    ///
    /// # Returns
    /// The corresponding `BlockType`, or `AIR` for ids that name no block.
    pub fn get_block_type_from_int(btype: BlockTypeSize) -> Self {
        num::FromPrimitive::from_u8(btype).unwrap_or(BlockType::AIR)
    }

    /// The id stored in chunk arrays.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Looks a block type up by its lowercase name, e.g. `"stone"`.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_NAMES.get(name).copied()
    }

    /// True if light passes through this block.
    pub fn is_translucent(self) -> bool {
        matches!(
            self,
            BlockType::AIR
                | BlockType::LEAVES
                | BlockType::GLASS
                | BlockType::TALLGRASS
                | BlockType::TORCH
                | BlockType::WATER
        )
    }

    /// True if the block has no geometry at all.
    pub fn is_invisible(self) -> bool {
        self == BlockType::AIR
    }

    /// True if the block is drawn as a billboard instead of a cube.
    pub fn is_billboard(self) -> bool {
        matches!(self, BlockType::TALLGRASS | BlockType::TORCH)
    }

    /// True if the block stops sunlight from reaching the cells below it.
    pub fn covers_sky(self) -> bool {
        !self.is_invisible() && !self.is_billboard()
    }

    /// Block light emitted by this block.
    pub fn luminance(self) -> i8 {
        match self {
            BlockType::TORCH => 14,
            BlockType::LAVA => 15,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_read_as_air() {
        assert_eq!(BlockType::get_block_type_from_int(3), BlockType::STONE);
        assert_eq!(BlockType::get_block_type_from_int(200), BlockType::AIR);
    }

    #[test]
    fn names_resolve() {
        assert_eq!(BlockType::from_name("tallgrass"), Some(BlockType::TALLGRASS));
        assert_eq!(BlockType::from_name("bedrock"), None);
    }

    #[test]
    fn billboards_do_not_cover_the_sky() {
        assert!(!BlockType::TALLGRASS.covers_sky());
        assert!(!BlockType::AIR.covers_sky());
        assert!(BlockType::GLASS.covers_sky());
        assert!(!BlockType::LAVA.is_translucent());
        assert_eq!(BlockType::LAVA.luminance(), 15);
    }
}
