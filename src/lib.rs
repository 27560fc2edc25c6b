pub mod cache;
pub mod claim;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod index;
pub mod logger;
pub mod overlay;
pub mod perimeter;
pub mod scheduler;
pub mod sink;
pub mod types;

// Re-export commonly used items
pub use claim::{Claim, ClaimId, ClaimRef};
pub use config::OverlayConfig;
pub use engine::{EngineStats, VisualizationEngine};
pub use error::OverlayError;
pub use logger::{log, LogSeverity};
pub use sink::{AllowAll, ClaimFilter, RenderSink};
pub use types::{ObserverId, OverlayCell, OverlayKind, Position, WorldCoordinate, WorldId};
