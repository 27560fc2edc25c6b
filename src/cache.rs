use crate::claim::{Claim, ClaimBounds, ClaimId, ClaimRef};
use crate::index::{InvalidationHook, SpatialClaimIndex};
use crate::types::{ChunkCoordinate, Result, SubChunkOffset, WorldCoordinate};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Default number of cells the cache remembers.
pub const DEFAULT_CAPACITY: usize = 8000;

/// Memoizes cell ownership in front of a [`SpatialClaimIndex`].
///
/// The index and the memo table sit behind one lock: a lookup that misses and
/// recomputes can never interleave with a claim write, so a stale owner is
/// never cached after a newer claim was published.
pub struct ChunkCache {
    state: Mutex<CacheState>,
}

struct CacheState {
    index: SpatialClaimIndex,
    table: CacheTable,
}

struct CacheEntry {
    owner: Option<ClaimRef>,
    stamp: u64,
}

/// Per-chunk memo of cell owners with least-recently-used eviction.
struct CacheTable {
    capacity: usize,
    chunks: HashMap<ChunkCoordinate, HashMap<SubChunkOffset, CacheEntry>>,
    recency: BTreeMap<u64, (ChunkCoordinate, SubChunkOffset)>,
    clock: u64,
}

impl ChunkCache {
    pub fn new(index: SpatialClaimIndex, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                index,
                table: CacheTable::new(capacity),
            }),
        }
    }

    /// The claim owning `at`, computed from the index on a miss.
    pub fn get_or_compute(&self, at: &WorldCoordinate) -> Option<ClaimRef> {
        let mut state = self.lock();
        let (chunk, offset) = at.split();
        if let Some(owner) = state.table.touch(chunk, offset) {
            return owner;
        }
        let owner = state.index.claim_at(at);
        state.table.insert(chunk, offset, owner.clone());
        owner
    }

    /// Publishes a claim through the index, which invalidates the old and new
    /// footprint before the lock is released.
    pub fn upsert_claim(&self, claim: Claim) -> Result<Option<ClaimRef>> {
        let mut state = self.lock();
        let CacheState { index, table } = &mut *state;
        index.insert_or_replace(claim, table)
    }

    pub fn remove_claim(&self, id: ClaimId) -> Option<ClaimRef> {
        let mut state = self.lock();
        let CacheState { index, table } = &mut *state;
        index.remove(id, table)
    }

    /// Drops every memoized cell inside `claim`'s footprint.
    pub fn invalidate_region(&self, claim: &Claim) {
        self.lock().table.invalidate_region(&claim.bounds());
    }

    pub fn claim(&self, id: ClaimId) -> Option<ClaimRef> {
        self.lock().index.get(id).cloned()
    }

    pub fn claim_count(&self) -> usize {
        self.lock().index.len()
    }

    pub fn has_claims(&self) -> bool {
        !self.lock().index.is_empty()
    }

    /// Number of memoized cells.
    pub fn len(&self) -> usize {
        self.lock().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Critical sections never leave the table half-updated.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheTable {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chunks: HashMap::new(),
            recency: BTreeMap::new(),
            clock: 0,
        }
    }

    fn len(&self) -> usize {
        self.recency.len()
    }

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up a memoized owner and marks it as recently used.
    /// The outer `Option` is the hit/miss, the inner one the owner.
    fn touch(
        &mut self,
        chunk: ChunkCoordinate,
        offset: SubChunkOffset,
    ) -> Option<Option<ClaimRef>> {
        let stamp = self.next_stamp();
        let entry = self.chunks.get_mut(&chunk)?.get_mut(&offset)?;
        self.recency.remove(&entry.stamp);
        entry.stamp = stamp;
        self.recency.insert(stamp, (chunk, offset));
        Some(entry.owner.clone())
    }

    fn insert(
        &mut self,
        chunk: ChunkCoordinate,
        offset: SubChunkOffset,
        owner: Option<ClaimRef>,
    ) {
        while self.len() >= self.capacity {
            self.evict_oldest();
        }
        let stamp = self.next_stamp();
        let previous = self
            .chunks
            .entry(chunk)
            .or_default()
            .insert(offset, CacheEntry { owner, stamp });
        if let Some(previous) = previous {
            self.recency.remove(&previous.stamp);
        }
        self.recency.insert(stamp, (chunk, offset));
    }

    fn evict_oldest(&mut self) {
        let Some((_, (chunk, offset))) = self.recency.pop_first() else {
            return;
        };
        if let Some(cells) = self.chunks.get_mut(&chunk) {
            cells.remove(&offset);
            if cells.is_empty() {
                self.chunks.remove(&chunk);
            }
        }
    }
}

impl InvalidationHook for CacheTable {
    fn invalidate_region(&mut self, bounds: &ClaimBounds) {
        let CacheTable { chunks, recency, .. } = self;
        // walk whichever side is smaller: the claim's chunks or the cached ones
        let touched: Vec<ChunkCoordinate> = if bounds.chunk_count() > chunks.len() as u64 {
            chunks
                .keys()
                .copied()
                .filter(|chunk| bounds.overlaps_chunk(*chunk))
                .collect()
        } else {
            bounds
                .chunks()
                .filter(|chunk| chunks.contains_key(chunk))
                .collect()
        };
        for chunk in touched {
            let Some(cells) = chunks.get_mut(&chunk) else {
                continue;
            };
            cells.retain(|offset, entry| {
                let cell = chunk.cell(*offset, bounds.min_y);
                if bounds.contains(&cell) {
                    recency.remove(&entry.stamp);
                    false
                } else {
                    true
                }
            });
            if cells.is_empty() {
                chunks.remove(&chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OverlayKind, WorldId};

    const OVERWORLD: WorldId = WorldId(0);

    fn claim(id: u64, a: (i32, i32), b: (i32, i32)) -> Claim {
        Claim::between(
            ClaimId(id),
            OVERWORLD,
            (a.0, 60, a.1),
            (b.0, 70, b.1),
            OverlayKind(0),
        )
    }

    fn at(x: i32, z: i32) -> WorldCoordinate {
        WorldCoordinate::new(OVERWORLD, x, 64, z)
    }

    fn cache(capacity: usize) -> ChunkCache {
        ChunkCache::new(SpatialClaimIndex::new(100_000), capacity)
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = cache(DEFAULT_CAPACITY);
        cache.upsert_claim(claim(1, (0, 0), (3, 3))).unwrap();

        assert_eq!(cache.get_or_compute(&at(2, 2)).unwrap().id, ClaimId(1));
        assert!(cache.get_or_compute(&at(9, 9)).is_none());
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.get_or_compute(&at(2, 2)).unwrap().id, ClaimId(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cached_absence_is_invalidated_by_new_claim() {
        let cache = cache(DEFAULT_CAPACITY);
        assert!(cache.get_or_compute(&at(5, 5)).is_none());

        cache.upsert_claim(claim(1, (0, 0), (10, 10))).unwrap();

        assert_eq!(cache.get_or_compute(&at(5, 5)).unwrap().id, ClaimId(1));
    }

    #[test]
    fn test_moved_claim_never_served_stale() {
        let cache = cache(DEFAULT_CAPACITY);
        cache.upsert_claim(claim(1, (0, 0), (10, 10))).unwrap();
        assert!(cache.get_or_compute(&at(2, 2)).is_some());
        assert!(cache.get_or_compute(&at(30, 30)).is_none());

        cache.upsert_claim(claim(1, (25, 25), (35, 35))).unwrap();

        assert!(cache.get_or_compute(&at(2, 2)).is_none());
        assert_eq!(cache.get_or_compute(&at(30, 30)).unwrap().min_x, 25);
    }

    #[test]
    fn test_invalidation_keeps_cells_outside_footprint() {
        let cache = cache(DEFAULT_CAPACITY);
        assert!(cache.get_or_compute(&at(1, 1)).is_none());
        assert!(cache.get_or_compute(&at(12, 12)).is_none());

        cache.invalidate_region(&claim(7, (0, 0), (4, 4)));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_claim_invalidates() {
        let cache = cache(DEFAULT_CAPACITY);
        cache.upsert_claim(claim(1, (0, 0), (10, 10))).unwrap();
        assert!(cache.get_or_compute(&at(3, 3)).is_some());

        assert!(cache.remove_claim(ClaimId(1)).is_some());

        assert!(cache.get_or_compute(&at(3, 3)).is_none());
        assert!(!cache.has_claims());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = cache(2);
        cache.get_or_compute(&at(0, 0));
        cache.get_or_compute(&at(1, 0));
        // refresh (0, 0) so (1, 0) becomes the eviction candidate
        cache.get_or_compute(&at(0, 0));
        cache.get_or_compute(&at(2, 0));

        assert_eq!(cache.len(), 2);
        let state = cache.lock();
        let cells = &state.table.chunks[&at(0, 0).chunk()];
        assert!(cells.contains_key(&at(0, 0).offset()));
        assert!(!cells.contains_key(&at(1, 0).offset()));
        assert!(cells.contains_key(&at(2, 0).offset()));
    }

    #[test]
    fn test_huge_claim_invalidates_through_cached_chunks() {
        let cache = cache(DEFAULT_CAPACITY);
        assert!(cache.get_or_compute(&at(3, 3)).is_none());
        assert!(cache.get_or_compute(&at(-40_000, 70)).is_none());
        assert!(cache.get_or_compute(&at(60_000, 0)).is_none());

        cache
            .upsert_claim(claim(1, (-50_000, -50_000), (50_000, 50_000)))
            .unwrap();

        // only the cell outside the footprint survives
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_or_compute(&at(-40_000, 70)).unwrap().id, ClaimId(1));
        assert!(cache.get_or_compute(&at(60_000, 0)).is_none());
    }
}
