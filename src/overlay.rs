use crate::types::{ObserverId, OverlayCell, OverlayKind, WorldCoordinate};
use dashmap::DashMap;
use std::collections::HashSet;

/// Cells to send to and retract from one observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayDiff {
    pub additions: Vec<OverlayCell>,
    pub removals: Vec<OverlayCell>,
}

impl OverlayDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// What one observer currently has rendered, plus the cell it was last seen in.
#[derive(Debug, Default)]
pub struct ObserverOverlayState {
    current_cells: HashSet<OverlayCell>,
    last_cell: Option<WorldCoordinate>,
}

impl ObserverOverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_cells(&self) -> &HashSet<OverlayCell> {
        &self.current_cells
    }

    pub fn last_cell(&self) -> Option<WorldCoordinate> {
        self.last_cell
    }

    /// Records `cell` as the observer's cell. Returns false if it was already there.
    pub fn move_to(&mut self, cell: WorldCoordinate) -> bool {
        if self.last_cell == Some(cell) {
            return false;
        }
        self.last_cell = Some(cell);
        true
    }

    /// Replaces the rendered set with `new_cells` and returns what changed.
    pub fn compute_diff(&mut self, new_cells: HashSet<OverlayCell>) -> OverlayDiff {
        let additions = new_cells.difference(&self.current_cells).copied().collect();
        let removals = self.current_cells.difference(&new_cells).copied().collect();
        self.current_cells = new_cells;
        OverlayDiff {
            additions,
            removals,
        }
    }

    /// Adds cells on top of the current set. Returns the ones that were not rendered yet.
    pub fn add_cells(
        &mut self,
        cells: impl IntoIterator<Item = OverlayCell>,
    ) -> Vec<OverlayCell> {
        cells
            .into_iter()
            .filter(|cell| self.current_cells.insert(*cell))
            .collect()
    }

    /// Snapshot of the current cells tagged `kind`.
    pub fn cells_of_kind(&self, kind: OverlayKind) -> Vec<OverlayCell> {
        self.current_cells
            .iter()
            .filter(|cell| cell.kind == kind)
            .copied()
            .collect()
    }

    /// Drops the given cells. Returns only those that were actually shown.
    pub fn remove_cells(
        &mut self,
        cells: impl IntoIterator<Item = OverlayCell>,
    ) -> Vec<OverlayCell> {
        cells
            .into_iter()
            .filter(|cell| self.current_cells.remove(cell))
            .collect()
    }

    pub fn clear(&mut self) -> Vec<OverlayCell> {
        self.current_cells.drain().collect()
    }
}

/// Overlay state of every tracked observer.
///
/// Sharded, so diffs for different observers never wait on each other while a
/// single observer's state is only ever touched by one caller at a time.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    states: DashMap<ObserverId, ObserverOverlayState>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the observer's cell, tracking it first if needed.
    /// Returns false when the observer has not left its previous cell.
    pub fn record_move(&self, observer: ObserverId, cell: WorldCoordinate) -> bool {
        self.states.entry(observer).or_default().move_to(cell)
    }

    /// Starts tracking `observer` with an empty overlay. Returns false if it was tracked.
    pub fn track(&self, observer: ObserverId) -> bool {
        let mut inserted = false;
        self.states.entry(observer).or_insert_with(|| {
            inserted = true;
            ObserverOverlayState::new()
        });
        inserted
    }

    pub fn untrack(&self, observer: ObserverId) -> Option<ObserverOverlayState> {
        self.states.remove(&observer).map(|(_, state)| state)
    }

    pub fn is_tracked(&self, observer: ObserverId) -> bool {
        self.states.contains_key(&observer)
    }

    /// Diffs a tracked observer against `new_cells`. `None` if it is not tracked.
    pub fn compute_diff(
        &self,
        observer: ObserverId,
        new_cells: HashSet<OverlayCell>,
    ) -> Option<OverlayDiff> {
        self.with_state(observer, |state| state.compute_diff(new_cells))
    }

    pub fn with_state<R>(
        &self,
        observer: ObserverId,
        f: impl FnOnce(&mut ObserverOverlayState) -> R,
    ) -> Option<R> {
        self.states.get_mut(&observer).map(|mut state| f(&mut state))
    }

    pub fn observers(&self) -> Vec<ObserverId> {
        self.states.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
