use crate::claim::Claim;
use crate::types::{ObserverId, OverlayCell, WorldCoordinate};

/// Turns overlay changes into something the observer can see, usually fake
/// block packets. Delivery failures are reported back but never retried.
pub trait RenderSink: Send + Sync {
    fn apply(
        &self,
        observer: ObserverId,
        additions: &[OverlayCell],
        removals: &[OverlayCell],
    ) -> anyhow::Result<()>;

    /// Drops everything the observer was shown.
    fn clear(&self, observer: ObserverId) -> anyhow::Result<()>;

    /// Solid terrain is never replaced by a marker.
    fn is_solid(&self, _cell: &WorldCoordinate) -> bool {
        false
    }

    /// Whether the observer can still receive updates (e.g. is still connected).
    fn is_active(&self, _observer: ObserverId) -> bool {
        true
    }
}

/// Decides which claims an observer gets to see.
pub trait ClaimFilter: Send + Sync {
    /// Vetoes a whole recomputation for the observer.
    fn allow_observer(&self, _observer: ObserverId) -> bool {
        true
    }

    fn allow_claim(&self, observer: ObserverId, claim: &Claim) -> bool;
}

/// Shows every claim to every observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ClaimFilter for AllowAll {
    fn allow_claim(&self, _observer: ObserverId, _claim: &Claim) -> bool {
        true
    }
}

impl<F> ClaimFilter for F
where
    F: Fn(ObserverId, &Claim) -> bool + Send + Sync,
{
    fn allow_claim(&self, observer: ObserverId, claim: &Claim) -> bool {
        self(observer, claim)
    }
}
