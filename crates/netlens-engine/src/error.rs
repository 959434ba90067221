use thiserror::Error;

/// Top-level error type for the `netlens-engine` crate.
///
/// Covers every failure mode of the engine RPC surface: transport,
/// engine-reported query errors, and response decoding. `netlens-core`
/// maps these into its domain error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out at the transport layer.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Engine ──────────────────────────────────────────────────────
    /// Structured error reported by the engine for a specific request.
    #[error("Engine error (HTTP {status}): {message}")]
    Engine {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Connection-level failures and engine overload responses qualify;
    /// engine rejections of a specific request do not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Engine { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns `true` if the failure was a timeout (transport- or client-level).
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Engine { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the engine's error code, if available.
    pub fn engine_error_code(&self) -> Option<&str> {
        match self {
            Self::Engine { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
