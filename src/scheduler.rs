use crate::error::OverlayError;
use crate::logger::{log, LogSeverity::Warning};
use crate::types::{ObserverId, Position, Result};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A recomputation waiting for the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingUpdate {
    pub observer: ObserverId,
    pub target: Position,
}

/// Coalescing queue of overlay recomputations, at most one per observer.
///
/// Producers only upsert into the queue. The host drains it once per tick,
/// so a burst of movement for one observer collapses into a single update
/// aimed at the latest position.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    pending: Mutex<IndexMap<ObserverId, Position>>,
    draining: AtomicBool,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an update for `observer`, or retargets the one already queued.
    /// Returns true if a new entry was created.
    pub fn request_update(&self, observer: ObserverId, target: Position) -> bool {
        self.lock().insert(observer, target).is_none()
    }

    /// Drops the pending entry of `observer`, if any.
    pub fn cancel(&self, observer: ObserverId) -> bool {
        self.lock().shift_remove(&observer).is_some()
    }

    pub fn pending_target(&self, observer: ObserverId) -> Option<Position> {
        self.lock().get(&observer).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pops every pending entry once, in request order, and hands each to
    /// `handler`. Requests made while the handler runs wait for the next tick.
    ///
    /// Only one drain may run at a time. A second concurrent drain fails in
    /// debug builds; release builds log it and let both proceed on disjoint
    /// batches, so the last diff written for an observer wins.
    pub fn drain_tick<F>(&self, mut handler: F) -> Result<usize>
    where
        F: FnMut(PendingUpdate),
    {
        let _guard = match DrainGuard::acquire(&self.draining) {
            Some(guard) => Some(guard),
            None if cfg!(debug_assertions) => {
                return Err(OverlayError::InvariantViolation(
                    "drain_tick entered while another drain is running".to_owned(),
                ))
            }
            None => {
                log(
                    "Concurrent drain_tick detected, continuing with last-writer-wins".to_owned(),
                    Warning,
                );
                None
            }
        };

        let batch = std::mem::take(&mut *self.lock());
        let drained = batch.len();
        for (observer, target) in batch {
            handler(PendingUpdate { observer, target });
        }
        Ok(drained)
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<ObserverId, Position>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds the draining flag and releases it even if a handler panics.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
