// ── Core error types ──
//
// Domain errors from netlens-core. These are NOT wire-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<netlens_engine::Error>` impl translates transport-layer
// errors into domain-appropriate variants.

use thiserror::Error;

use crate::model::SnapshotStatus;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registry errors ──────────────────────────────────────────────
    /// The snapshot key already exists in a non-deleted state.
    #[error("Snapshot already exists: {network}/{name}")]
    DuplicateSnapshot { network: String, name: String },

    /// No snapshot under this key (or it was deleted).
    #[error("Snapshot not found: {network}/{name}")]
    NotFound { network: String, name: String },

    /// The snapshot exists but is not COMPLETE yet (or never will be).
    #[error("Snapshot {network}/{name} is not ready: {status}")]
    SnapshotNotReady {
        network: String,
        name: String,
        status: SnapshotStatus,
    },

    /// The snapshot name failed identity validation.
    #[error("Invalid snapshot name '{name}': {reason}")]
    InvalidSnapshotName { name: String, reason: String },

    /// A request failed input validation (empty upload, blank network, ...).
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Verification errors ──────────────────────────────────────────
    /// The requested query type is not one of the closed set.
    #[error("Invalid query type: '{value}' (expected REACHABILITY, ACL_FILTER, or ROUTING)")]
    InvalidQueryType { value: String },

    // ── Engine errors ────────────────────────────────────────────────
    /// The engine could not be reached. Transient -- the caller should retry.
    #[error("Analysis engine unavailable: {reason}")]
    EngineUnavailable { reason: String },

    /// The engine rejected this specific request. Not retryable.
    #[error("Engine query failed: {message}")]
    EngineQueryFailed {
        message: String,
        code: Option<String>,
    },

    /// The engine returned a shape that cannot be mapped to the domain model.
    #[error("Could not normalize engine response: {message}")]
    NormalizationFailure { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EngineUnavailable { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netlens_engine::Error> for CoreError {
    fn from(err: netlens_engine::Error) -> Self {
        if err.is_transient() {
            return CoreError::EngineUnavailable {
                reason: err.to_string(),
            };
        }

        match err {
            netlens_engine::Error::Engine { message, code, .. } => {
                CoreError::EngineQueryFailed {
                    message,
                    code,
                }
            }
            netlens_engine::Error::Deserialization { message, body: _ } => {
                CoreError::NormalizationFailure { message }
            }
            netlens_engine::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid engine URL: {e}"),
            },
            netlens_engine::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            other => CoreError::EngineQueryFailed {
                message: other.to_string(),
                code: None,
            },
        }
    }
}
