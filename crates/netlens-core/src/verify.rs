// ── Verification orchestration ──
//
// Maps a verification request to the right engine question, applies
// timeout/retry policy, and normalizes the heterogeneous response rows
// into one discriminated envelope. After the envelope is allocated,
// every failure lands in it -- the envelope IS the error channel.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::VerifyOptions;
use crate::convert::normalize_findings;
use crate::error::CoreError;
use crate::gateway::EngineGateway;
use crate::model::{QueryType, VerificationResult, VerificationStatus};
use crate::registry::SnapshotRegistry;

/// How a dispatch ended, before normalization.
enum Dispatch {
    Rows(Vec<Value>),
    TimedOut,
    Failed(String),
}

/// Executes verification queries against COMPLETE snapshots.
///
/// The engine is the true bottleneck: concurrent dispatches are bounded
/// by a semaphore sized from [`VerifyOptions::max_concurrent`], so a
/// burst of queries queues here instead of overloading the engine.
pub struct VerificationService {
    gateway: Arc<dyn EngineGateway>,
    registry: Arc<SnapshotRegistry>,
    options: VerifyOptions,
    permits: Arc<Semaphore>,
}

impl VerificationService {
    pub fn new(gateway: Arc<dyn EngineGateway>, registry: Arc<SnapshotRegistry>) -> Self {
        Self::with_options(gateway, registry, VerifyOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn EngineGateway>,
        registry: Arc<SnapshotRegistry>,
        options: VerifyOptions,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
        Self {
            gateway,
            registry,
            options,
            permits,
        }
    }

    /// Run one verification query.
    ///
    /// Errs only on request validation (`InvalidQueryType`,
    /// `SnapshotNotReady`, `NotFound`). Once the envelope exists the
    /// call always returns it in a terminal state: SUCCESS, FAILED, or
    /// TIMEOUT, with `execution_time_ms` covering the whole run.
    pub async fn run(
        &self,
        network: &str,
        snapshot: &str,
        query_type: &str,
        params: Map<String, Value>,
    ) -> Result<VerificationResult, CoreError> {
        let query = QueryType::parse(query_type)?;
        self.registry.expect_complete(network, snapshot)?;

        let mut result = VerificationResult::in_progress(query, params);
        let started = Instant::now();

        info!(
            query_id = %result.query_id,
            query = %query,
            network,
            snapshot,
            "executing verification query"
        );

        let dispatch = self.dispatch(network, snapshot, query, &result.parameters).await;

        result.execution_time_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match dispatch {
            Dispatch::Rows(rows) => match normalize_findings(query, rows) {
                Ok(findings) => {
                    result.status = VerificationStatus::Success;
                    result.findings = Some(findings);
                }
                Err(message) => {
                    warn!(query_id = %result.query_id, %message, "normalization failed");
                    result.status = VerificationStatus::Failed;
                    result.error_message =
                        Some(format!("could not normalize engine response: {message}"));
                }
            },
            Dispatch::TimedOut => {
                warn!(query_id = %result.query_id, "verification query timed out");
                result.status = VerificationStatus::Timeout;
                result.error_message = Some(format!(
                    "query timed out after {}s",
                    self.options.query_timeout.as_secs()
                ));
            }
            Dispatch::Failed(message) => {
                warn!(query_id = %result.query_id, %message, "verification query failed");
                result.status = VerificationStatus::Failed;
                result.error_message = Some(message);
            }
        }

        info!(
            query_id = %result.query_id,
            status = %result.status,
            execution_time_ms = result.execution_time_ms,
            "verification query finished"
        );

        Ok(result)
    }

    /// Dispatch to the engine under the concurrency bound.
    ///
    /// Timeout cancels the in-flight call (the gateway future is
    /// dropped, aborting the request) and is never retried. Transient
    /// connectivity failures retry with exponential backoff up to the
    /// configured bound.
    async fn dispatch(
        &self,
        network: &str,
        snapshot: &str,
        query: QueryType,
        params: &Map<String, Value>,
    ) -> Dispatch {
        let Ok(_permit) = self.permits.acquire().await else {
            return Dispatch::Failed("verification service is shutting down".into());
        };

        let params = Value::Object(params.clone());
        let mut attempt: u32 = 0;

        loop {
            let call = self
                .gateway
                .run_query(network, snapshot, query.engine_kind(), params.clone());

            match timeout(self.options.query_timeout, call).await {
                Err(_) => return Dispatch::TimedOut,
                Ok(Ok(rows)) => return Dispatch::Rows(rows),
                Ok(Err(e)) if e.is_transient() && !e.is_timeout()
                    && attempt < self.options.max_retries =>
                {
                    let delay = self.options.retry_backoff * 2u32.saturating_pow(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "transient engine failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(Err(e)) => return Dispatch::Failed(e.to_string()),
            }
        }
    }
}
