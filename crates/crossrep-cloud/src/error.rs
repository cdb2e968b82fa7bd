//! Gateway error types
//!
//! "Not found" is deliberately absent: lookups return `Option` so that a
//! missing resource can never be confused with a failing call.

use thiserror::Error;

/// Remote control-plane errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Temporary failure; the same call may succeed later
    #[error("Transient error: {0}")]
    Transient(String),

    /// Failure that retrying cannot fix
    #[error("API error: {0}")]
    Permanent(String),

    /// The request conflicts with the current remote state
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Replication already authorized: {0}")]
    ReplicationAlreadyAuthorized(String),

    #[error("Invalid resource id: {0}")]
    InvalidResourceId(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether a convergence wait may treat this error as "not yet"
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_transient() {
        assert!(GatewayError::Transient("503".into()).is_transient());
        assert!(!GatewayError::Permanent("400".into()).is_transient());
        assert!(!GatewayError::Conflict("children".into()).is_transient());
        assert!(!GatewayError::ReplicationAlreadyAuthorized("v".into()).is_transient());
    }
}
