use crate::error::OverlayError;
use crate::types::{ChunkCoordinate, OverlayKind, Result, WorldCoordinate, WorldId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outermost horizontal coordinate a claim may reach (the world border).
pub const WORLD_BORDER: i32 = 30_000_000;
/// Lowest build height accepted for a claim.
pub const MIN_HEIGHT: i32 = -2048;
/// Highest build height accepted for a claim.
pub const MAX_HEIGHT: i32 = 4096;

/// Shared handle to a published claim.
pub type ClaimRef = Arc<Claim>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub u64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An axis-aligned ownership region. Corners may be given in any order;
/// use [`Claim::bounds`] to get them normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub world: WorldId,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
    pub overlay_kind: OverlayKind,
}

impl Claim {
    /// Builds a claim spanning the two corners `a` and `b` (inclusive).
    pub fn between(
        id: ClaimId,
        world: WorldId,
        a: (i32, i32, i32),
        b: (i32, i32, i32),
        overlay_kind: OverlayKind,
    ) -> Self {
        Self {
            id,
            world,
            min_x: a.0,
            max_x: b.0,
            min_y: a.1,
            max_y: b.1,
            min_z: a.2,
            max_z: b.2,
            overlay_kind,
        }
    }

    pub fn bounds(&self) -> ClaimBounds {
        ClaimBounds {
            world: self.world,
            min_x: self.min_x.min(self.max_x),
            max_x: self.min_x.max(self.max_x),
            min_y: self.min_y.min(self.max_y),
            max_y: self.min_y.max(self.max_y),
            min_z: self.min_z.min(self.max_z),
            max_z: self.min_z.max(self.max_z),
        }
    }

    /// Rejects claims that could never exist in a real world, or whose footprint
    /// is wider than `max_span` cells on either horizontal axis.
    pub fn validate(&self, max_span: u32) -> Result<()> {
        let bounds = self.bounds();
        for value in [bounds.min_x, bounds.max_x, bounds.min_z, bounds.max_z] {
            if !(-WORLD_BORDER..=WORLD_BORDER).contains(&value) {
                return Err(OverlayError::invalid_claim(
                    self.id,
                    format!("horizontal bound {} is outside the world border", value),
                ));
            }
        }
        for value in [bounds.min_y, bounds.max_y] {
            if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&value) {
                return Err(OverlayError::invalid_claim(
                    self.id,
                    format!("height {} is outside {}..={}", value, MIN_HEIGHT, MAX_HEIGHT),
                ));
            }
        }
        let span_x = bounds.max_x.abs_diff(bounds.min_x);
        let span_z = bounds.max_z.abs_diff(bounds.min_z);
        if span_x > max_span || span_z > max_span {
            return Err(OverlayError::invalid_claim(
                self.id,
                format!(
                    "footprint {}x{} exceeds the maximum span of {}",
                    span_x, span_z, max_span
                ),
            ));
        }
        Ok(())
    }
}

/// Normalized, inclusive bounds of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimBounds {
    pub world: WorldId,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl ClaimBounds {
    /// Whether the column `(x, z)` of `world` falls inside the footprint.
    pub fn contains_column(&self, world: WorldId, x: i32, z: i32) -> bool {
        self.world == world
            && (self.min_x..=self.max_x).contains(&x)
            && (self.min_z..=self.max_z).contains(&z)
    }

    pub fn contains(&self, at: &WorldCoordinate) -> bool {
        self.contains_column(at.world, at.x, at.z)
    }

    /// Whether any cell of `chunk` falls inside the footprint.
    pub fn overlaps_chunk(&self, chunk: ChunkCoordinate) -> bool {
        self.world == chunk.world
            && ((self.min_x >> 4)..=(self.max_x >> 4)).contains(&chunk.chunk_x)
            && ((self.min_z >> 4)..=(self.max_z >> 4)).contains(&chunk.chunk_z)
    }

    /// Number of chunk columns the footprint touches.
    pub fn chunk_count(&self) -> u64 {
        let across_x = (self.max_x >> 4).abs_diff(self.min_x >> 4) as u64 + 1;
        let across_z = (self.max_z >> 4).abs_diff(self.min_z >> 4) as u64 + 1;
        across_x * across_z
    }

    /// Every chunk column the footprint touches.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkCoordinate> {
        let world = self.world;
        let (min_cz, max_cz) = (self.min_z >> 4, self.max_z >> 4);
        ((self.min_x >> 4)..=(self.max_x >> 4)).flat_map(move |chunk_x| {
            (min_cz..=max_cz).map(move |chunk_z| ChunkCoordinate::new(world, chunk_x, chunk_z))
        })
    }
}
