use std::fmt;
use std::fmt::{Display, Formatter};

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogSeverity {
    /// Level the record is emitted at.
    pub fn level(self) -> ::log::Level {
        match self {
            LogSeverity::Debug => ::log::Level::Debug,
            LogSeverity::Info => ::log::Level::Info,
            LogSeverity::Warning => ::log::Level::Warn,
            LogSeverity::Error => ::log::Level::Error,
        }
    }
}

/// Display impl for LogSeverity
impl Display for LogSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogSeverity::Debug => write!(f, "DEBUG"),
            LogSeverity::Info => write!(f, "INFO"),
            LogSeverity::Warning => write!(f, "WARNING"),
            LogSeverity::Error => write!(f, "ERROR"),
        }
    }
}
