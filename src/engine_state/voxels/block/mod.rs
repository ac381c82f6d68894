//! # Block Module
//!
//! Block type definitions and block face handling. Chunks store blocks as raw
//! `BlockTypeSize` ids; `BlockType` gives them meaning.

use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
/// This is used for efficient storage and serialization of block data.
pub type BlockTypeSize = u8;

/// Block types by lowercase name, resolved at compile time.
pub static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf::phf_map! {
    "air" => BlockType::AIR,
    "dirt" => BlockType::DIRT,
    "grass" => BlockType::GRASS,
    "stone" => BlockType::STONE,
    "sand" => BlockType::SAND,
    "wood" => BlockType::WOOD,
    "leaves" => BlockType::LEAVES,
    "glass" => BlockType::GLASS,
    "tallgrass" => BlockType::TALLGRASS,
    "torch" => BlockType::TORCH,
    "lava" => BlockType::LAVA,
    "water" => BlockType::WATER,
};
