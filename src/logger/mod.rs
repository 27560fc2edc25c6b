pub mod log;
pub mod severity;

pub use self::log::{init, log};
pub use self::severity::LogSeverity;
