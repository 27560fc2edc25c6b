use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, crate::error::OverlayError>;

/// Width of a chunk column in cells, on both horizontal axes.
pub const CHUNK_WIDTH: i32 = 16;

/// Identifies a world (dimension) hosted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Identifies an observer. Observers are connected players, so this is their UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    /// Offline-mode id derived from a username, the same way a vanilla server does it.
    pub fn offline(username: &str) -> Self {
        let name = format!("OfflinePlayer:{}", username);
        Self(Uuid::new_v3(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visual style an overlay cell is drawn with. The render sink maps it to block data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayKind(pub u16);

/// A single cell of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldCoordinate {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldCoordinate {
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }

    pub fn chunk(&self) -> ChunkCoordinate {
        ChunkCoordinate {
            world: self.world,
            chunk_x: self.x >> 4,
            chunk_z: self.z >> 4,
        }
    }

    /// Position inside the owning chunk. Uses the euclidean remainder so negative
    /// coordinates land in `0..16` like the chunk index does.
    pub fn offset(&self) -> SubChunkOffset {
        SubChunkOffset {
            dx: self.x.rem_euclid(CHUNK_WIDTH) as u8,
            dz: self.z.rem_euclid(CHUNK_WIDTH) as u8,
        }
    }

    /// Splits the coordinate into its cache key.
    pub fn split(&self) -> (ChunkCoordinate, SubChunkOffset) {
        (self.chunk(), self.offset())
    }
}

impl fmt::Display for WorldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// Chunk column address, the coarse partition key of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoordinate {
    pub world: WorldId,
    pub chunk_x: i32,
    pub chunk_z: i32,
}

impl ChunkCoordinate {
    pub fn new(world: WorldId, chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            world,
            chunk_x,
            chunk_z,
        }
    }

    /// World cell at the given offset, at height `y`.
    pub fn cell(&self, offset: SubChunkOffset, y: i32) -> WorldCoordinate {
        WorldCoordinate {
            world: self.world,
            x: self.chunk_x * CHUNK_WIDTH + offset.dx as i32,
            y,
            z: self.chunk_z * CHUNK_WIDTH + offset.dz as i32,
        }
    }
}

/// Position of a cell inside its chunk, each axis in `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubChunkOffset {
    pub dx: u8,
    pub dz: u8,
}

/// Exact position of an observer, as reported by movement packets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(world: WorldId, x: f64, y: f64, z: f64) -> Self {
        Self { world, x, y, z }
    }

    /// The cell containing this position.
    pub fn cell(&self) -> WorldCoordinate {
        WorldCoordinate {
            world: self.world,
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }
}

impl From<WorldCoordinate> for Position {
    fn from(cell: WorldCoordinate) -> Self {
        Self {
            world: cell.world,
            x: cell.x as f64,
            y: cell.y as f64,
            z: cell.z as f64,
        }
    }
}

/// One visualized unit. Two kinds at the same cell are distinct overlay cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayCell {
    pub coordinate: WorldCoordinate,
    pub kind: OverlayKind,
}

impl OverlayCell {
    pub fn new(coordinate: WorldCoordinate, kind: OverlayKind) -> Self {
        Self { coordinate, kind }
    }
}
