use anyhow::bail;
use claim_overlay::{
    Claim, ClaimId, ObserverId, OverlayCell, OverlayConfig, OverlayKind, Position, RenderSink,
    VisualizationEngine, WorldCoordinate, WorldId,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const OVERWORLD: WorldId = WorldId(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub observer: ObserverId,
    pub additions: HashSet<OverlayCell>,
    pub removals: HashSet<OverlayCell>,
}

/// Render sink that records every call instead of sending packets.
#[derive(Default)]
pub struct RecordingSink {
    pub applied: Mutex<Vec<Applied>>,
    pub cleared: Mutex<Vec<ObserverId>>,
    pub failing: Mutex<HashSet<ObserverId>>,
    pub inactive: Mutex<HashSet<ObserverId>>,
}

impl RecordingSink {
    pub fn applied(&self) -> Vec<Applied> {
        self.applied.lock().unwrap().clone()
    }

    pub fn applied_to(&self, observer: ObserverId) -> Vec<Applied> {
        self.applied()
            .into_iter()
            .filter(|applied| applied.observer == observer)
            .collect()
    }

    pub fn fail_for(&self, observer: ObserverId) {
        self.failing.lock().unwrap().insert(observer);
    }

    pub fn deactivate(&self, observer: ObserverId) {
        self.inactive.lock().unwrap().insert(observer);
    }
}

impl RenderSink for RecordingSink {
    fn apply(
        &self,
        observer: ObserverId,
        additions: &[OverlayCell],
        removals: &[OverlayCell],
    ) -> anyhow::Result<()> {
        self.applied.lock().unwrap().push(Applied {
            observer,
            additions: additions.iter().copied().collect(),
            removals: removals.iter().copied().collect(),
        });
        if self.failing.lock().unwrap().contains(&observer) {
            bail!("connection reset by peer");
        }
        Ok(())
    }

    fn clear(&self, observer: ObserverId) -> anyhow::Result<()> {
        self.cleared.lock().unwrap().push(observer);
        Ok(())
    }

    fn is_active(&self, observer: ObserverId) -> bool {
        !self.inactive.lock().unwrap().contains(&observer)
    }
}

pub fn observer(n: u128) -> ObserverId {
    ObserverId(Uuid::from_u128(n))
}

pub fn standing_at(x: i32, y: i32, z: i32) -> Position {
    Position::new(OVERWORLD, x as f64 + 0.5, y as f64, z as f64 + 0.5)
}

pub fn cell(x: i32, y: i32, z: i32, kind: OverlayKind) -> OverlayCell {
    OverlayCell::new(WorldCoordinate::new(OVERWORLD, x, y, z), kind)
}

pub fn claim(id: u64, min: (i32, i32, i32), max: (i32, i32, i32)) -> Claim {
    Claim::between(ClaimId(id), OVERWORLD, min, max, OverlayKind(id as u16))
}

/// Engine rendering one cell per outline column, at the observer's height.
pub fn flat_engine(radius: u32) -> (Arc<VisualizationEngine>, Arc<RecordingSink>) {
    let config = OverlayConfig {
        horizontal_radius: radius,
        vertical_below: 0,
        vertical_above: 0,
        ..OverlayConfig::default()
    };
    engine_with(config)
}

pub fn engine_with(config: OverlayConfig) -> (Arc<VisualizationEngine>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = Arc::new(VisualizationEngine::new(config, sink.clone()));
    (engine, sink)
}
