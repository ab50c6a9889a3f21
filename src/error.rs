//! Unified error handling for chatgate.
//!
//! The admission pipeline recovers almost everything locally: store failures
//! turn into conservative booleans, unknown commands turn into "disabled".
//! [`GateError`] names the failure classes so they can be logged, counted and
//! reported consistently.

use crate::db::DbError;
use thiserror::Error;

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Failure classes of the admission pipeline.
#[derive(Debug, Error)]
pub enum GateError {
    /// The durable store failed or did not answer within the timeout.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// No configuration exists for the named command.
    #[error("no configuration for command: {0}")]
    ConfigMissing(String),

    /// The command body returned an error or panicked.
    #[error("command failed: {0}")]
    CommandFault(String),

    /// A mutation would break a standing invariant (e.g. revoking the master).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl GateError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::ConfigMissing(_) => "config_missing",
            Self::CommandFault(_) => "command_fault",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}

impl From<DbError> for GateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Unavailable(detail) => GateError::StoreUnavailable(detail),
            other => GateError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Result type for pipeline-facing operations.
pub type GateResult<T> = Result<T, GateError>;
