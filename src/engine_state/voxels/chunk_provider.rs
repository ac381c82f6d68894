//! # Chunk Provider
//!
//! Two-tier chunk cache. The near tier holds live chunks; the far tier holds
//! compressed chunk records keyed by chunk id and is written to a single
//! index file when the provider is disposed.
//!
//! ## Lookup Order
//!
//! [`ChunkProvider::get_chunk`] checks the near tier, then chunks that are
//! being evicted, then the far tier, and finally creates a fresh chunk. The
//! provider context is re-attached in every case, so callers can always
//! generate what they get.
//!
//! ## Eviction
//!
//! [`ChunkProvider::flush_cache`] evicts at most one chunk per call: the one
//! farthest from the player (least recently used on ties) that is not pinned.
//! Its encoding runs on a background thread; the result is collected by
//! [`ChunkProvider::poll_flush`]. A chunk requested while its encoding is still
//! running is taken back and the encoding discarded. The encoding records the
//! chunk's [`revision`](Chunk::revision); a chunk written to after that (light
//! spreading in from a neighbor, say) stays live instead of being stored stale.
//!
//! ## Failure Handling
//!
//! Missing or unreadable index files and corrupt far tier records count as
//! absent data: they are logged and the chunks generate again.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
};

use cgmath::Vector3;
use log::{debug, info, warn};
use lru::LruCache;

use crate::{
    core::MtResource,
    error::{Error, Result},
};

use super::chunk::{chunk_id, clamp_chunk_coord, Chunk, ChunkId, GenerationContext};

/// An eviction whose encoding runs on a background thread.
struct PendingFlush {
    id: ChunkId,
    /// The encoded bytes and the chunk revision they capture.
    encoding: JoinHandle<Result<(u64, Vec<u8>)>>,
}

/// Near and far chunk tiers of one world.
pub struct ChunkProvider {
    near: LruCache<ChunkId, MtResource<Chunk>>,
    evicting: HashMap<ChunkId, MtResource<Chunk>>,
    far: HashMap<ChunkId, Vec<u8>>,
    near_cache_size: usize,
    persist: bool,
    index_path: Option<PathBuf>,
    context: Arc<GenerationContext>,
    flush: Option<PendingFlush>,
}

impl ChunkProvider {
    /// Creates a provider that never touches the disk.
    ///
    /// # Arguments
    /// * `near_cache_size` - Chunks kept in the near tier before flushing starts evicting
    /// * `context` - Generators and seed attached to every chunk handed out
    pub fn in_memory(near_cache_size: usize, context: Arc<GenerationContext>) -> Self {
        ChunkProvider {
            near: LruCache::unbounded(),
            evicting: HashMap::new(),
            far: HashMap::new(),
            near_cache_size: near_cache_size.max(1),
            persist: false,
            index_path: None,
            context,
            flush: None,
        }
    }

    /// Creates a provider backed by the index file at `index_path`, loading
    /// the far tier from it if it exists.
    pub fn open(near_cache_size: usize, context: Arc<GenerationContext>, index_path: PathBuf) -> Self {
        let mut provider = Self::in_memory(near_cache_size, context);
        provider.far = load_index(&index_path);
        provider.persist = true;
        provider.index_path = Some(index_path);
        provider
    }

    /// The context attached to chunks.
    pub fn context(&self) -> &Arc<GenerationContext> {
        &self.context
    }

    /// Returns the chunk at chunk coordinates `(x, z)`, loading or creating it.
    ///
    /// Coordinates no global block coordinate maps to are clamped onto the
    /// edge of the world.
    pub fn get_chunk(&mut self, x: i32, z: i32) -> MtResource<Chunk> {
        let (x, z) = (clamp_chunk_coord(x), clamp_chunk_coord(z));
        let id = chunk_id(x, z);
        if let Some(chunk) = self.near.get(&id) {
            return chunk.clone();
        }

        if let Some(chunk) = self.evicting.remove(&id) {
            debug!("Chunk ({x}, {z}) requested while being evicted, keeping it");
            self.near.put(id, chunk.clone());
            return chunk;
        }

        let mut chunk = match self.far.remove(&id) {
            Some(bytes) => match Chunk::decode(&bytes) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Discarding unreadable chunk ({x}, {z}): {e}");
                    Chunk::new(x, z)
                }
            },
            None => Chunk::new(x, z),
        };
        chunk.attach_context(self.context.clone());
        let chunk = MtResource::new(chunk);
        self.near.put(id, chunk.clone());
        chunk
    }

    /// The chunk at `(x, z)` if it is live, without loading anything.
    pub fn loaded_chunk(&self, x: i32, z: i32) -> Option<MtResource<Chunk>> {
        let id = chunk_id(x, z);
        self.near
            .peek(&id)
            .or_else(|| self.evicting.get(&id))
            .cloned()
    }

    /// True if the chunk at `(x, z)` is live.
    pub fn is_chunk_loaded(&self, x: i32, z: i32) -> bool {
        let id = chunk_id(x, z);
        self.near.contains(&id) || self.evicting.contains_key(&id)
    }

    /// True if `id` is in the near tier.
    pub fn is_near(&self, id: ChunkId) -> bool {
        self.near.contains(&id)
    }

    /// True if `id` is in the far tier.
    pub fn is_far(&self, id: ChunkId) -> bool {
        self.far.contains_key(&id)
    }

    /// Number of chunks in the near tier.
    pub fn near_len(&self) -> usize {
        self.near.len()
    }

    /// Number of records in the far tier.
    pub fn far_len(&self) -> usize {
        self.far.len()
    }

    /// Live chunks, most recently used first.
    pub fn loaded_chunks(&self) -> Vec<MtResource<Chunk>> {
        self.near.iter().map(|(_, chunk)| chunk.clone()).collect()
    }

    /// True while an eviction is being encoded.
    pub fn is_flush_running(&self) -> bool {
        self.flush.is_some()
    }

    /// Starts evicting one chunk if the near tier is over its bound.
    ///
    /// # Arguments
    /// * `player` - Reference position; the farthest chunk goes first
    /// * `pinned` - Chunk ids that must stay live
    ///
    /// # Returns
    /// `true` if an eviction was started.
    pub fn flush_cache(&mut self, player: Vector3<f32>, pinned: &HashSet<ChunkId>) -> bool {
        self.poll_flush();
        if self.flush.is_some() || self.near.len() <= self.near_cache_size {
            return false;
        }

        let mut candidate: Option<(ChunkId, f32)> = None;
        for (id, chunk) in self.near.iter().rev() {
            if pinned.contains(id) {
                continue;
            }
            let distance = chunk.get().distance_to(player);
            if candidate.map_or(true, |(_, farthest)| distance > farthest) {
                candidate = Some((*id, distance));
            }
        }
        let Some((id, _)) = candidate else {
            return false;
        };
        let Some(chunk) = self.near.pop(&id) else {
            return false;
        };

        self.evicting.insert(id, chunk.clone());
        let encoding = thread::spawn(move || {
            let chunk = chunk.get();
            chunk.encode().map(|bytes| (chunk.revision(), bytes))
        });
        self.flush = Some(PendingFlush { id, encoding });
        true
    }

    /// Collects the running eviction if its encoding has finished.
    pub fn poll_flush(&mut self) {
        if self
            .flush
            .as_ref()
            .is_some_and(|flush| flush.encoding.is_finished())
        {
            self.wait_for_flush();
        }
    }

    /// Blocks until the running eviction, if any, has been collected.
    pub fn wait_for_flush(&mut self) {
        let Some(PendingFlush { id, encoding }) = self.flush.take() else {
            return;
        };
        let encoded = encoding
            .join()
            .unwrap_or_else(|_| Err(Error::compression(format!("encoder of chunk {id} panicked"))));

        let Some(chunk) = self.evicting.remove(&id) else {
            debug!("Dropping encoding of chunk {id}, it was reloaded");
            return;
        };
        match encoded {
            Ok((revision, _)) if revision != chunk.get().revision() => {
                debug!("Chunk {id} changed while being encoded, keeping it");
                self.near.put(id, chunk);
            }
            Ok((_, bytes)) => {
                chunk.get().dispose();
                self.far.insert(id, bytes);
            }
            Err(e) => {
                warn!("Could not evict chunk {id}: {e}");
                self.near.put(id, chunk);
            }
        }
    }

    /// Moves every live chunk to the far tier (when persisting), disposes
    /// them, and writes the far tier index.
    pub fn dispose(&mut self) -> Result<()> {
        self.wait_for_flush();
        let mut live: Vec<(ChunkId, MtResource<Chunk>)> = self.evicting.drain().collect();
        while let Some(entry) = self.near.pop_lru() {
            live.push(entry);
        }
        for (id, chunk) in live {
            if self.persist {
                match chunk.get().encode() {
                    Ok(bytes) => {
                        self.far.insert(id, bytes);
                    }
                    Err(e) => warn!("Could not store chunk {id}: {e}"),
                }
            }
            chunk.get().dispose();
        }

        if let (true, Some(path)) = (self.persist, self.index_path.as_ref()) {
            save_index(path, &self.far)?;
            info!("Saved {} chunks to {}", self.far.len(), path.display());
        }
        Ok(())
    }
}

fn load_index(path: &Path) -> HashMap<ChunkId, Vec<u8>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Could not read chunk index {}: {e}", path.display());
            return HashMap::new();
        }
    };
    match bincode::deserialize(&bytes) {
        Ok(index) => index,
        Err(e) => {
            warn!("Chunk index {} is corrupt: {e}", path.display());
            HashMap::new()
        }
    }
}

fn save_index(path: &Path, far: &HashMap<ChunkId, Vec<u8>>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = bincode::serialize(far).map_err(|e| Error::serialization(e.to_string()))?;
    fs::write(path, bytes)?;
    Ok(())
}
