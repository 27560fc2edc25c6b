use crate::claim::{Claim, ClaimBounds, ClaimId, ClaimRef};
use crate::types::{ChunkCoordinate, Result, WorldCoordinate, WorldId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Receives the regions whose derived data became stale after a claim mutation.
pub trait InvalidationHook {
    fn invalidate_region(&mut self, bounds: &ClaimBounds);
}

/// Bucket side length as a shift on cell coordinates: 512 cells, or 32 chunks.
const REGION_SHIFT: i32 = 9;

/// A square of 32×32 chunk columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RegionKey {
    world: WorldId,
    region_x: i32,
    region_z: i32,
}

impl RegionKey {
    fn of_chunk(chunk: ChunkCoordinate) -> Self {
        Self {
            world: chunk.world,
            region_x: chunk.chunk_x >> (REGION_SHIFT - 4),
            region_z: chunk.chunk_z >> (REGION_SHIFT - 4),
        }
    }

    fn covering(bounds: &ClaimBounds) -> impl Iterator<Item = RegionKey> {
        let world = bounds.world;
        let (min_rx, max_rx) = (bounds.min_x >> REGION_SHIFT, bounds.max_x >> REGION_SHIFT);
        let (min_rz, max_rz) = (bounds.min_z >> REGION_SHIFT, bounds.max_z >> REGION_SHIFT);
        (min_rx..=max_rx).flat_map(move |region_x| {
            (min_rz..=max_rz).map(move |region_z| RegionKey {
                world,
                region_x,
                region_z,
            })
        })
    }
}

/// Source of truth for claims, bucketed by the 32×32-chunk regions they cover.
///
/// Every bucket keeps its claim ids ordered, so when claims overlap the lowest
/// id owns the contested cells regardless of insertion order. A claim of the
/// widest accepted span touches a few tens of thousands of buckets, not one per
/// chunk.
#[derive(Debug)]
pub struct SpatialClaimIndex {
    max_span: u32,
    claims: HashMap<ClaimId, ClaimRef>,
    buckets: HashMap<RegionKey, BTreeSet<ClaimId>>,
}

impl SpatialClaimIndex {
    pub fn new(max_span: u32) -> Self {
        Self {
            max_span,
            claims: HashMap::new(),
            buckets: HashMap::new(),
        }
    }

    /// Publishes `claim`, replacing any claim with the same id. Both the old and
    /// the new footprint are reported to `hook`. Returns the replaced claim.
    pub fn insert_or_replace<H: InvalidationHook + ?Sized>(
        &mut self,
        claim: Claim,
        hook: &mut H,
    ) -> Result<Option<ClaimRef>> {
        claim.validate(self.max_span)?;

        let claim = Arc::new(claim);
        let previous = self.claims.insert(claim.id, Arc::clone(&claim));
        if let Some(old) = &previous {
            self.unbucket(old);
            hook.invalidate_region(&old.bounds());
        }

        let bounds = claim.bounds();
        for region in RegionKey::covering(&bounds) {
            self.buckets.entry(region).or_default().insert(claim.id);
        }
        hook.invalidate_region(&bounds);

        Ok(previous)
    }

    pub fn remove<H: InvalidationHook + ?Sized>(
        &mut self,
        id: ClaimId,
        hook: &mut H,
    ) -> Option<ClaimRef> {
        let removed = self.claims.remove(&id)?;
        self.unbucket(&removed);
        hook.invalidate_region(&removed.bounds());
        Some(removed)
    }

    /// The claim owning the column of `at`, lowest id first when several do.
    pub fn claim_at(&self, at: &WorldCoordinate) -> Option<ClaimRef> {
        self.claims_in_chunk(at.chunk())
            .find(|claim| claim.bounds().contains(at))
            .cloned()
    }

    /// Claims whose footprint touches `chunk`, ordered by id.
    pub fn claims_in_chunk(
        &self,
        chunk: ChunkCoordinate,
    ) -> impl Iterator<Item = &ClaimRef> + '_ {
        self.buckets
            .get(&RegionKey::of_chunk(chunk))
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.claims.get(id))
            .filter(move |claim| claim.bounds().overlaps_chunk(chunk))
    }

    pub fn get(&self, id: ClaimId) -> Option<&ClaimRef> {
        self.claims.get(&id)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn unbucket(&mut self, claim: &Claim) {
        for region in RegionKey::covering(&claim.bounds()) {
            if let Some(ids) = self.buckets.get_mut(&region) {
                ids.remove(&claim.id);
                if ids.is_empty() {
                    self.buckets.remove(&region);
                }
            }
        }
    }
}
