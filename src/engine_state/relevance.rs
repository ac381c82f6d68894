//! # Relevance Regions
//!
//! Keeps block regions loaded on request and tells the requester when every
//! chunk of the region is ready.
//!
//! ## Regions
//!
//! A requested block region is turned into its chunk region (the target). The
//! target is padded by one chunk on every horizontal side and made odd along
//! each axis, so the pinned area has a center chunk and a margin that lets
//! light settle at the edges. The padded region is pinned against cache
//! eviction for as long as the region lives.
//!
//! Each region is anchored by an always-relevant entity at its center. The
//! entity is not persisted and is destroyed with the region.
//!
//! ## Completion
//!
//! Target chunks report in as they become ready (generated and lit). Reports
//! are idempotent; the [`RegionFuture`] completes exactly once, when the last
//! distinct target chunk reports. A region whose future was cancelled or
//! dropped is released on the next update; chunk updates already queued for
//! it are not stopped.

use std::{
    collections::HashSet,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bitvec::vec::BitVec;
use cgmath::{Point3, Vector3};
use log::{debug, info};

use crate::{
    engine_state::voxels::{
        chunk::{chunk_id, ChunkId, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Z},
        chunk_update_manager::{ChunkUpdateManager, ChunkUpdateType},
        region::BlockRegion,
        world::WorldProvider,
    },
    entity_system::{Component, EntityId, EntityInfoComponent, EntityManager, LocationComponent},
    error::{Error, ErrorKind, Result},
};

#[derive(Debug, Default)]
struct SignalState {
    complete: bool,
    cancelled: bool,
    completions: usize,
}

/// One-shot completion signal shared between a region and its future.
#[derive(Debug, Default)]
struct RegionSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl RegionSignal {
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self) {
        let mut state = self.lock();
        if state.complete {
            return;
        }
        state.complete = true;
        state.completions += 1;
        self.condvar.notify_all();
    }
}

/// Completion handle of a relevance region.
///
/// Dropping every clone of the future releases the region, as does
/// [`cancel`](Self::cancel).
#[derive(Debug, Clone)]
pub struct RegionFuture {
    signal: Arc<RegionSignal>,
}

impl RegionFuture {
    /// True once every target chunk was ready.
    pub fn is_complete(&self) -> bool {
        self.signal.lock().complete
    }

    /// Blocks until the region completes or `timeout` passes.
    ///
    /// The region only advances when its owner updates the relevance system,
    /// so the waiting thread must not be that owner.
    ///
    /// # Returns
    /// `true` if the region completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.signal.lock();
        let (state, _) = self
            .signal
            .condvar
            .wait_timeout_while(state, timeout, |state| !state.complete && !state.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        state.complete
    }

    /// Stops waiting for the region and releases it on the next update.
    pub fn cancel(&self) {
        let mut state = self.signal.lock();
        state.cancelled = true;
        self.signal.condvar.notify_all();
    }

    /// True once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.signal.lock().cancelled
    }

    /// How often the completion fired.
    pub(crate) fn completion_count(&self) -> usize {
        self.signal.lock().completions
    }
}

/// A live relevance region.
struct RelevanceRegion {
    target: BlockRegion,
    padded: BlockRegion,
    ready: BitVec,
    ready_count: usize,
    anchor: EntityId,
    signal: Arc<RegionSignal>,
}

impl RelevanceRegion {
    /// Records `chunk` as ready.
    ///
    /// # Returns
    /// `true` if this report completed the region.
    fn chunk_ready(&mut self, chunk: Point3<i32>) -> bool {
        let Some(index) = self.target.index_of(chunk) else {
            return false;
        };
        if self.ready[index] {
            return false;
        }
        self.ready.set(index, true);
        self.ready_count += 1;
        if self.ready_count == self.target.volume() {
            self.signal.complete();
            return true;
        }
        false
    }

    fn is_complete(&self) -> bool {
        self.ready_count == self.target.volume()
    }

    fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.signal) == 1 || self.signal.lock().cancelled
    }
}

/// Tracks relevance regions and drives their chunks to readiness.
pub struct RelevanceSystem {
    regions: Vec<RelevanceRegion>,
    chunks_per_update: usize,
}

impl RelevanceSystem {
    /// Creates a system that queues at most `chunks_per_update` chunk
    /// updates per [`update`](Self::update).
    pub fn new(chunks_per_update: usize) -> Self {
        RelevanceSystem {
            regions: Vec::new(),
            chunks_per_update,
        }
    }

    /// Makes the blocks of `region` relevant.
    ///
    /// # Returns
    /// A future completing once every chunk touching `region` is ready, or
    /// [`ErrorKind::InvalidRegion`] for an empty region.
    pub fn make_blocks_relevant(
        &mut self,
        entities: &mut EntityManager,
        region: BlockRegion,
    ) -> Result<RegionFuture> {
        if region.is_empty() {
            return Err(Error::new(ErrorKind::InvalidRegion)
                .with_context(format!("{:?}..{:?}", region.min, region.max)));
        }
        let target = region.to_chunk_region();
        let padded = target.expand(1).make_odd();

        let center = padded.center();
        let position = Vector3::new(
            (center.x * CHUNK_DIMENSION_X + CHUNK_DIMENSION_X / 2) as f32,
            region.center().y as f32,
            (center.z * CHUNK_DIMENSION_Z + CHUNK_DIMENSION_Z / 2) as f32,
        );
        let anchor = entities.create(vec![
            Box::new(LocationComponent::at(position)) as Box<dyn Component>,
            Box::new(EntityInfoComponent {
                persisted: false,
                always_relevant: true,
                ..EntityInfoComponent::default()
            }),
        ]);

        let signal = Arc::new(RegionSignal::default());
        let volume = target.volume();
        info!(
            "Region {:?}..{:?} needs {volume} chunks, pinning {}",
            target.min,
            target.max,
            padded.volume()
        );
        self.regions.push(RelevanceRegion {
            target,
            padded,
            ready: BitVec::repeat(false, volume),
            ready_count: 0,
            anchor: anchor.id(),
            signal: signal.clone(),
        });
        Ok(RegionFuture { signal })
    }

    /// Reports the chunk at chunk coordinates `chunk` as ready.
    pub fn chunk_ready(&mut self, chunk: Point3<i32>) {
        let chunk = Point3::new(chunk.x, 0, chunk.z);
        for region in &mut self.regions {
            if region.chunk_ready(chunk) {
                debug!("Region {:?}..{:?} is ready", region.target.min, region.target.max);
            }
        }
    }

    /// Releases abandoned regions, reports target chunks that are already
    /// ready, and queues updates for the ones that are not.
    pub fn update(
        &mut self,
        world: &WorldProvider,
        updates: &mut ChunkUpdateManager,
        entities: &mut EntityManager,
    ) {
        self.regions.retain(|region| {
            if region.is_abandoned() {
                debug!("Releasing region {:?}..{:?}", region.target.min, region.target.max);
                entities.destroy(region.anchor);
                false
            } else {
                true
            }
        });

        let mut budget = self.chunks_per_update;
        for region in &mut self.regions {
            if region.is_complete() {
                continue;
            }
            let target = region.target;
            for chunk in target.positions() {
                if target.index_of(chunk).is_some_and(|i| region.ready[i]) {
                    continue;
                }
                let ready = world
                    .loaded_chunk(chunk.x, chunk.z)
                    .is_some_and(|c| c.get().is_ready());
                if ready {
                    region.chunk_ready(chunk);
                } else if budget > 0
                    && !updates.is_processing(chunk.x, chunk.z)
                    && updates.queue_chunk_update(chunk.x, chunk.z, ChunkUpdateType::DEFAULT)
                {
                    budget -= 1;
                }
            }
        }
    }

    /// Ids of every chunk pinned by a live region.
    pub fn pinned_chunks(&self) -> HashSet<ChunkId> {
        self.regions
            .iter()
            .flat_map(|region| region.padded.positions())
            .map(|chunk| chunk_id(chunk.x, chunk.z))
            .collect()
    }

    /// Number of live regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}
