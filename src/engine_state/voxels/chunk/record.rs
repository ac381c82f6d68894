//! Far tier encoding of a chunk: a `bincode` record compressed with `zstd`.

use serde::{Deserialize, Serialize};

use super::{Chunk, CHUNK_SIZE};
use crate::error::{Error, Result};

const FLAG_LIGHT_DIRTY: u8 = 1;
const FLAG_FRESH: u8 = 1 << 1;
const COMPRESSION_LEVEL: i32 = 3;

/// Plain data image of a chunk.
///
/// The provider context and meshes are not part of the record; a decoded
/// chunk must get its context re-attached before it can generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk x coordinate.
    pub x: i32,
    /// Chunk z coordinate.
    pub z: i32,
    /// Bit 0: light dirty. Bit 1: fresh.
    pub flags: u8,
    /// Block ids.
    pub blocks: Vec<u8>,
    /// Sunlight, as raw bytes of the signed values.
    pub sunlight: Vec<u8>,
    /// Block light, as raw bytes of the signed values.
    pub light: Vec<u8>,
    /// State bytes.
    pub states: Vec<u8>,
}

impl Chunk {
    /// Captures the chunk's arrays and flags.
    pub fn to_record(&self) -> ChunkRecord {
        let mut flags = 0;
        if self.light_dirty {
            flags |= FLAG_LIGHT_DIRTY;
        }
        if self.fresh {
            flags |= FLAG_FRESH;
        }
        ChunkRecord {
            x: self.position.x,
            z: self.position.z,
            flags,
            blocks: self.blocks.clone(),
            sunlight: bytemuck::cast_slice::<i8, u8>(&self.sunlight).to_vec(),
            light: bytemuck::cast_slice::<i8, u8>(&self.light).to_vec(),
            states: self.states.clone(),
        }
    }

    /// Rebuilds a chunk from a record. The chunk comes back dirty and detached.
    pub fn from_record(record: ChunkRecord) -> Result<Self> {
        let size = CHUNK_SIZE as usize;
        let lengths = [
            record.blocks.len(),
            record.sunlight.len(),
            record.light.len(),
            record.states.len(),
        ];
        if lengths.iter().any(|len| *len != size) {
            return Err(Error::serialization(format!(
                "chunk ({}, {}) has array lengths {lengths:?}, expected {size}",
                record.x, record.z
            )));
        }
        let mut chunk = Chunk::new(record.x, record.z);
        chunk.blocks = record.blocks;
        chunk.sunlight = bytemuck::cast_slice::<u8, i8>(&record.sunlight).to_vec();
        chunk.light = bytemuck::cast_slice::<u8, i8>(&record.light).to_vec();
        chunk.states = record.states;
        chunk.light_dirty = record.flags & FLAG_LIGHT_DIRTY != 0;
        chunk.fresh = record.flags & FLAG_FRESH != 0;
        chunk.dirty = true;
        Ok(chunk)
    }

    /// Serializes and compresses the chunk for the far tier.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes =
            bincode::serialize(&self.to_record()).map_err(|e| Error::serialization(e.to_string()))?;
        zstd::encode_all(&bytes[..], COMPRESSION_LEVEL).map_err(|e| Error::compression(e.to_string()))
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let raw = zstd::decode_all(bytes).map_err(|e| Error::compression(e.to_string()))?;
        let record: ChunkRecord =
            bincode::deserialize(&raw).map_err(|e| Error::serialization(e.to_string()))?;
        Self::from_record(record)
    }
}
