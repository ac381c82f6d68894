//! # Chunk Meshes
//!
//! Mesh input produced per vertical segment of a chunk, plus the slot that
//! hands finished meshes from the worker that built them to the consumer
//! that draws them.
//!
//! ## Hand-off
//!
//! The slot holds a pending and an active mesh list behind a mutex. Both the
//! producer ([`MeshSlot::set_new_mesh`]) and the consumer
//! ([`MeshSlot::swap_active_mesh`]) only `try_lock`, so neither ever waits on
//! the other; a contended call reports `false` and is retried later.

use std::sync::{Mutex, PoisonError, TryLockError};

use cgmath::Point3;

use super::{Chunk, CHUNK_DIMENSION_Y};
use crate::engine_state::voxels::block::{block_side::BlockSide, block_type::BlockType};

/// One visible block face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshFace {
    /// Local position of the block.
    pub position: Point3<i32>,
    /// The face.
    pub side: BlockSide,
    /// The block the face belongs to.
    pub block: BlockType,
}

/// Visible faces of one vertical segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    /// Index of the segment, counted from the bottom.
    pub segment: i32,
    /// Faces not hidden by an opaque neighbor inside the chunk.
    pub faces: Vec<MeshFace>,
}

impl ChunkMesh {
    /// Collects the visible faces of `segment`.
    ///
    /// Billboards contribute all their faces. Faces against a cell outside
    /// the chunk are kept, since the neighbor is not known here.
    pub fn build(chunk: &Chunk, segment: i32, segment_height: i32) -> Self {
        let start = segment * segment_height;
        let end = (start + segment_height).min(CHUNK_DIMENSION_Y);
        let mut faces = Vec::new();
        for y in start..end {
            for z in 0..super::CHUNK_DIMENSION_Z {
                for x in 0..super::CHUNK_DIMENSION_X {
                    let block = chunk.get_block(x, y, z);
                    if block.is_invisible() {
                        continue;
                    }
                    for side in BlockSide::all() {
                        let offset = side.offset();
                        let (nx, ny, nz) = (x + offset.x, y + offset.y, z + offset.z);
                        let hidden = !block.is_billboard()
                            && Chunk::in_bounds(nx, ny, nz)
                            && !chunk.get_block(nx, ny, nz).is_translucent();
                        if !hidden {
                            faces.push(MeshFace {
                                position: Point3::new(x, y, z),
                                side,
                                block,
                            });
                        }
                    }
                }
            }
        }
        ChunkMesh { segment, faces }
    }
}

#[derive(Debug, Default)]
struct MeshSlotState {
    pending: Option<Vec<ChunkMesh>>,
    active: Option<Vec<ChunkMesh>>,
    disposed: bool,
}

/// Pending and active meshes of a chunk.
#[derive(Debug, Default)]
pub struct MeshSlot {
    state: Mutex<MeshSlotState>,
}

impl MeshSlot {
    /// Stores `meshes` as pending.
    ///
    /// # Returns
    /// `false` if the slot is busy or disposed, in which case the meshes are dropped.
    pub fn set_new_mesh(&self, meshes: Vec<ChunkMesh>) -> bool {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        if state.disposed {
            return false;
        }
        state.pending = Some(meshes);
        true
    }

    /// Promotes the pending meshes to active.
    ///
    /// # Returns
    /// `false` if the slot is busy, disposed, or has nothing pending.
    pub fn swap_active_mesh(&self) -> bool {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        if state.disposed {
            return false;
        }
        match state.pending.take() {
            Some(meshes) => {
                state.active = Some(meshes);
                true
            }
            None => false,
        }
    }

    /// A copy of the active meshes.
    pub fn active(&self) -> Option<Vec<ChunkMesh>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .clone()
    }

    /// True if meshes are waiting to be swapped in.
    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .is_some()
    }

    /// Drops all meshes and refuses new ones.
    pub fn dispose(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pending = None;
        state.active = None;
        state.disposed = true;
    }

    /// True once disposed.
    pub fn is_disposed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosed_faces_are_culled() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block(5, 5, 5, BlockType::STONE).unwrap();
        chunk.set_block(6, 5, 5, BlockType::STONE).unwrap();
        let mesh = ChunkMesh::build(&chunk, 0, 32);
        assert_eq!(mesh.faces.len(), 10);
        assert!(!mesh
            .faces
            .iter()
            .any(|f| f.position == Point3::new(5, 5, 5) && f.side == BlockSide::RIGHT));
    }

    #[test]
    fn glass_does_not_hide_faces() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block(5, 5, 5, BlockType::STONE).unwrap();
        chunk.set_block(6, 5, 5, BlockType::GLASS).unwrap();
        let mesh = ChunkMesh::build(&chunk, 0, 32);
        assert_eq!(mesh.faces.len(), 11);
    }

    #[test]
    fn disposed_slot_rejects_meshes() {
        let slot = MeshSlot::default();
        assert!(slot.set_new_mesh(vec![ChunkMesh::default()]));
        slot.dispose();
        assert!(!slot.swap_active_mesh());
        assert!(!slot.set_new_mesh(vec![]));
        assert!(slot.active().is_none());
    }

    #[test]
    fn busy_slot_reports_false() {
        let slot = MeshSlot::default();
        let _guard = slot.state.lock().unwrap();
        assert!(!slot.set_new_mesh(vec![]));
        assert!(!slot.swap_active_mesh());
    }
}
