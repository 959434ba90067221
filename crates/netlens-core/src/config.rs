// ── Runtime configuration ──
//
// These types describe *how* to reach the analysis engine and how the
// verification orchestrator paces itself. They never touch disk; the
// config crate (or any other embedder) constructs them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use netlens_engine::{EngineClient, TlsMode, TransportConfig};

use crate::error::CoreError;

/// TLS verification strategy for the engine endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default -- engines usually sit on plain
    /// HTTP or behind an internal proxy with a real certificate.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed proxies).
    DangerAcceptInvalid,
}

/// Configuration for connecting to the analysis engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine base URL (e.g., `http://localhost:9996`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-call timeout applied at the transport layer.
    pub timeout: Duration,
}

impl EngineConfig {
    /// Build an [`EngineClient`] from this config.
    pub fn build_client(&self) -> Result<EngineClient, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&self.tls),
            timeout: self.timeout,
        };
        Ok(EngineClient::new(self.url.as_str(), &transport)?)
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

/// Tuning knobs for the verification orchestrator.
///
/// All policy the source material leaves open (retry bound, backoff
/// curve, concurrency cap) lives here rather than in code.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Bound on a single verification dispatch. Exceeding it yields a
    /// TIMEOUT result; the in-flight engine call is cancelled, not retried.
    pub query_timeout: Duration,
    /// Retry bound for transient connectivity failures (not timeouts).
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt.
    pub retry_backoff: Duration,
    /// Cap on concurrent in-flight engine verification calls.
    pub max_concurrent: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            max_concurrent: 8,
        }
    }
}
