use crate::cache::ChunkCache;
use crate::claim::{Claim, ClaimId, ClaimRef};
use crate::config::OverlayConfig;
use crate::index::SpatialClaimIndex;
use crate::logger::{log, LogSeverity::*};
use crate::overlay::OverlayRegistry;
use crate::perimeter::edges;
use crate::scheduler::{PendingUpdate, UpdateScheduler};
use crate::sink::{AllowAll, ClaimFilter, RenderSink};
use crate::types::{ObserverId, OverlayCell, OverlayKind, Position, Result, WorldCoordinate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Snapshot of the engine's bookkeeping, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub observers: usize,
    pub pending_updates: usize,
    pub cached_cells: usize,
    pub claims: usize,
}

/// Keeps every tracked observer's claim outline in sync with where it stands.
///
/// Movement and claim events may arrive from any thread; they only touch the
/// scheduler queue and the claim index. All lookups, diffs and render calls
/// happen in [`VisualizationEngine::drain_tick`], which the host calls once per
/// tick from a single thread (see [`crate::driver`] for a ready-made ticker).
pub struct VisualizationEngine {
    config: OverlayConfig,
    cache: ChunkCache,
    overlays: OverlayRegistry,
    scheduler: UpdateScheduler,
    sink: Arc<dyn RenderSink>,
    filter: Arc<dyn ClaimFilter>,
}

impl VisualizationEngine {
    pub fn new(config: OverlayConfig, sink: Arc<dyn RenderSink>) -> Self {
        Self::with_filter(config, sink, Arc::new(AllowAll))
    }

    pub fn with_filter(
        config: OverlayConfig,
        sink: Arc<dyn RenderSink>,
        filter: Arc<dyn ClaimFilter>,
    ) -> Self {
        let index = SpatialClaimIndex::new(config.max_claim_span);
        let cache = ChunkCache::new(index, config.cache_capacity);
        Self {
            config,
            cache,
            overlays: OverlayRegistry::new(),
            scheduler: UpdateScheduler::new(),
            sink,
            filter,
        }
    }

    pub fn from_config_file(path: &Path, sink: Arc<dyn RenderSink>) -> Result<Self> {
        let config = OverlayConfig::from_file(path)?;
        Ok(Self::new(config, sink))
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Schedules a recomputation if the observer entered a new cell.
    /// Returns true when an update is pending afterwards.
    pub fn on_observer_moved(&self, observer: ObserverId, position: Position) -> bool {
        if !self.cache.has_claims() && !self.overlays.is_tracked(observer) {
            return false;
        }
        if !self.overlays.record_move(observer, position.cell()) {
            return false;
        }
        if self.scheduler.request_update(observer, position) {
            log(format!("Queued overlay update for {}", observer), Debug);
        }
        true
    }

    /// Publishes a new or changed claim. Cached ownership of both the old and
    /// the new footprint is dropped before this returns.
    pub fn on_claim_changed(&self, claim: Claim) -> Result<()> {
        let id = claim.id;
        match self.cache.upsert_claim(claim) {
            Ok(Some(_)) => {
                log(format!("Claim {} replaced", id), Debug);
                Ok(())
            }
            Ok(None) => {
                log(format!("Claim {} published", id), Debug);
                Ok(())
            }
            Err(err) => {
                log(format!("Rejected claim {}: {}", id, err), Warning);
                Err(err)
            }
        }
    }

    pub fn on_claim_removed(&self, id: ClaimId) -> Option<ClaimRef> {
        let removed = self.cache.remove_claim(id);
        if removed.is_some() {
            log(format!("Claim {} removed", id), Debug);
        }
        removed
    }

    /// Forgets the observer and its pending update. Whatever it was shown is
    /// left for the caller to clear.
    pub fn untrack_observer(&self, observer: ObserverId) -> bool {
        let cancelled = self.scheduler.cancel(observer);
        let tracked = self.overlays.untrack(observer).is_some();
        if tracked {
            log(
                format!("Untracked {} (pending update cancelled: {})", observer, cancelled),
                Debug,
            );
        }
        tracked
    }

    /// Runs every pending update once. Returns how many were processed.
    pub fn drain_tick(&self) -> Result<usize> {
        let drained = self.scheduler.drain_tick(|update| self.process(update))?;
        if drained > 0 {
            log(format!("Processed {} overlay updates", drained), Debug);
        }
        Ok(drained)
    }

    pub fn claim_at(&self, at: &WorldCoordinate) -> Option<ClaimRef> {
        self.cache.get_or_compute(at)
    }

    /// Outline cells `observer` should see when standing at `position`.
    pub fn desired_cells(
        &self,
        observer: ObserverId,
        position: &Position,
    ) -> HashSet<OverlayCell> {
        let center = position.cell();
        let radius = self.config.horizontal_radius;
        let r = radius as i32;

        let mut candidates: BTreeMap<ClaimId, Option<ClaimRef>> = BTreeMap::new();
        for x in center.x.saturating_sub(r)..=center.x.saturating_add(r) {
            for z in center.z.saturating_sub(r)..=center.z.saturating_add(r) {
                let probe = WorldCoordinate::new(center.world, x, center.y, z);
                if let Some(claim) = self.cache.get_or_compute(&probe) {
                    candidates.entry(claim.id).or_insert_with(|| {
                        self.filter
                            .allow_claim(observer, &claim)
                            .then(|| Arc::clone(&claim))
                    });
                }
            }
        }

        let min_y = center.y.saturating_sub(self.config.vertical_below as i32);
        let max_y = center.y.saturating_add(self.config.vertical_above as i32);
        let mut cells = HashSet::new();
        for claim in candidates.values().flatten() {
            let columns: HashSet<(i32, i32)> = edges(claim)
                .filter(|edge| {
                    edge.x.abs_diff(center.x) <= radius && edge.z.abs_diff(center.z) <= radius
                })
                .map(|edge| (edge.x, edge.z))
                .collect();
            for (x, z) in columns {
                for y in min_y..=max_y {
                    let coordinate = WorldCoordinate::new(center.world, x, y, z);
                    if !self.sink.is_solid(&coordinate) {
                        cells.insert(OverlayCell::new(coordinate, claim.overlay_kind));
                    }
                }
            }
        }
        cells
    }

    /// Shows extra cells to an observer without touching the rest of its overlay.
    /// Returns how many cells were new.
    pub fn add_cells(
        &self,
        observer: ObserverId,
        cells: impl IntoIterator<Item = OverlayCell>,
    ) -> usize {
        let cells: Vec<OverlayCell> = cells
            .into_iter()
            .filter(|cell| !self.sink.is_solid(&cell.coordinate))
            .collect();
        self.overlays.track(observer);
        let added = self
            .overlays
            .with_state(observer, |state| state.add_cells(cells))
            .unwrap_or_default();
        if !added.is_empty() {
            self.emit(observer, &added, &[]);
        }
        added.len()
    }

    /// Retracts the observer's cells of `kind` that `predicate` accepts.
    ///
    /// The predicate sees a snapshot and runs without any overlay lock held, so
    /// it may call back into the engine.
    pub fn clear_kind<P>(&self, observer: ObserverId, kind: OverlayKind, predicate: P) -> usize
    where
        P: Fn(&OverlayCell) -> bool,
    {
        let Some(candidates) = self
            .overlays
            .with_state(observer, |state| state.cells_of_kind(kind))
        else {
            return 0;
        };
        let doomed: Vec<OverlayCell> = candidates
            .into_iter()
            .filter(|cell| predicate(cell))
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        let removed = self
            .overlays
            .with_state(observer, |state| state.remove_cells(doomed))
            .unwrap_or_default();
        if !removed.is_empty() {
            self.emit(observer, &[], &removed);
        }
        removed.len()
    }

    /// Forgets everything the observer was shown and asks the sink to clear it.
    pub fn clear_observer(&self, observer: ObserverId) -> bool {
        if self.overlays.with_state(observer, |state| state.clear()).is_none() {
            return false;
        }
        if let Err(err) = self.sink.clear(observer) {
            log(format!("Failed to clear overlay of {}: {:#}", observer, err), Error);
        }
        true
    }

    pub fn clear_all(&self) {
        for observer in self.overlays.observers() {
            self.clear_observer(observer);
        }
    }

    pub fn is_tracked(&self, observer: ObserverId) -> bool {
        self.overlays.is_tracked(observer)
    }

    pub fn current_cells(&self, observer: ObserverId) -> Option<HashSet<OverlayCell>> {
        self.overlays.with_state(observer, |state| state.current_cells().clone())
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            observers: self.overlays.len(),
            pending_updates: self.scheduler.len(),
            cached_cells: self.cache.len(),
            claims: self.cache.claim_count(),
        }
    }

    fn process(&self, update: PendingUpdate) {
        let PendingUpdate { observer, target } = update;
        if !self.overlays.is_tracked(observer) {
            return;
        }
        if !self.filter.allow_observer(observer) {
            log(format!("Overlay update for {} vetoed", observer), Debug);
            return;
        }

        let desired = self.desired_cells(observer, &target);
        let Some(diff) = self.overlays.compute_diff(observer, desired) else {
            return;
        };
        if !diff.is_empty() {
            self.emit(observer, &diff.additions, &diff.removals);
        }
    }

    /// Sends a change to the sink if the observer can still receive it. The
    /// overlay state counts as applied either way.
    fn emit(&self, observer: ObserverId, additions: &[OverlayCell], removals: &[OverlayCell]) {
        if !self.overlays.is_tracked(observer) || !self.sink.is_active(observer) {
            return;
        }
        if let Err(err) = self.sink.apply(observer, additions, removals) {
            log(
                format!("Failed to apply overlay update for {}: {:#}", observer, err),
                Error,
            );
        }
    }
}
