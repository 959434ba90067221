// ── Engine gateway seam ──
//
// The one trait boundary in the workspace: everything the core needs
// from the external analysis engine. `EngineClient` is the production
// implementation; tests substitute stubs to drive lifecycle and
// failure paths without a live engine.

use async_trait::async_trait;
use serde_json::Value;

use netlens_engine::types::{
    ConfigFile, EdgeRow, InterfaceRow, NodeRow, ParseStatusRow, VersionInfo,
};
use netlens_engine::{EngineClient, Error as EngineError};

/// Narrow client abstraction over the analysis engine's RPC surface.
///
/// Every method is a suspension point (network I/O). Cancellation is
/// dropping the returned future -- implementations must abort the
/// underlying call rather than letting it run to completion.
#[async_trait]
pub trait EngineGateway: Send + Sync {
    /// Connectivity check; returns the engine build version.
    async fn version(&self) -> Result<VersionInfo, EngineError>;

    /// Submit configuration files and initialize a snapshot on the engine.
    async fn init_snapshot(
        &self,
        network: &str,
        snapshot: &str,
        files: &[ConfigFile],
    ) -> Result<Vec<ParseStatusRow>, EngineError>;

    /// Per-file parse outcome for an existing snapshot.
    async fn parse_status(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<ParseStatusRow>, EngineError>;

    /// Node property rows for every detected device.
    async fn node_properties(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<NodeRow>, EngineError>;

    /// Interface property rows, optionally filtered to one device.
    async fn interface_properties(
        &self,
        network: &str,
        snapshot: &str,
        node: Option<&str>,
    ) -> Result<Vec<InterfaceRow>, EngineError>;

    /// Layer-3 adjacency rows.
    async fn layer3_edges(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<EdgeRow>, EngineError>;

    /// Run a verification question; rows are query-kind specific.
    async fn run_query(
        &self,
        network: &str,
        snapshot: &str,
        kind: &str,
        params: Value,
    ) -> Result<Vec<Value>, EngineError>;

    /// Delete a snapshot and its derived data on the engine.
    async fn delete_snapshot(&self, network: &str, snapshot: &str) -> Result<(), EngineError>;
}

#[async_trait]
impl EngineGateway for EngineClient {
    async fn version(&self) -> Result<VersionInfo, EngineError> {
        EngineClient::version(self).await
    }

    async fn init_snapshot(
        &self,
        network: &str,
        snapshot: &str,
        files: &[ConfigFile],
    ) -> Result<Vec<ParseStatusRow>, EngineError> {
        EngineClient::init_snapshot(self, network, snapshot, files).await
    }

    async fn parse_status(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<ParseStatusRow>, EngineError> {
        EngineClient::parse_status(self, network, snapshot).await
    }

    async fn node_properties(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<NodeRow>, EngineError> {
        EngineClient::node_properties(self, network, snapshot).await
    }

    async fn interface_properties(
        &self,
        network: &str,
        snapshot: &str,
        node: Option<&str>,
    ) -> Result<Vec<InterfaceRow>, EngineError> {
        EngineClient::interface_properties(self, network, snapshot, node).await
    }

    async fn layer3_edges(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<EdgeRow>, EngineError> {
        EngineClient::layer3_edges(self, network, snapshot).await
    }

    async fn run_query(
        &self,
        network: &str,
        snapshot: &str,
        kind: &str,
        params: Value,
    ) -> Result<Vec<Value>, EngineError> {
        EngineClient::run_query(self, network, snapshot, kind, params).await
    }

    async fn delete_snapshot(&self, network: &str, snapshot: &str) -> Result<(), EngineError> {
        EngineClient::delete_snapshot(self, network, snapshot).await
    }
}
