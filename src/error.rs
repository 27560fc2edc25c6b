use crate::claim::ClaimId;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("invalid claim {id}: {reason}")]
    InvalidClaim { id: ClaimId, reason: String },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl OverlayError {
    pub fn invalid_claim(id: ClaimId, reason: impl Into<String>) -> Self {
        OverlayError::InvalidClaim {
            id,
            reason: reason.into(),
        }
    }
}
