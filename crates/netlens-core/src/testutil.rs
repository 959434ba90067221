// ── Test gateway stub ──
//
// A configurable in-memory EngineGateway used by registry, topology,
// and verification tests. Builder-style setup, call counters for
// single-flight assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use netlens_engine::Error as EngineError;
use netlens_engine::types::{
    ConfigFile, EdgeRow, InterfaceRow, NodeRow, ParseStatusRow, VersionInfo,
};

use crate::gateway::EngineGateway;

pub(crate) fn passed_row(file_name: &str) -> ParseStatusRow {
    ParseStatusRow {
        file_name: file_name.into(),
        status: ParseStatusRow::PASSED.into(),
        message: None,
        line_number: None,
    }
}

pub(crate) fn failed_row(file_name: &str, message: &str) -> ParseStatusRow {
    ParseStatusRow {
        file_name: file_name.into(),
        status: "FAILED".into(),
        message: Some(message.into()),
        line_number: None,
    }
}

pub(crate) fn node_row(node: &str) -> NodeRow {
    NodeRow {
        node: node.into(),
        vendor: None,
        model: None,
        os_version: None,
        config_format: None,
        device_type: None,
    }
}

fn unavailable() -> EngineError {
    EngineError::Engine {
        status: 503,
        message: "engine unavailable".into(),
        code: None,
    }
}

pub(crate) enum QueryBehavior {
    Rows(Vec<Value>),
    /// Never responds; exercises the orchestrator timeout.
    Hang,
    /// Engine rejects the query (non-retryable).
    Reject(String),
}

pub(crate) struct StubGateway {
    pub init_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    init_delay: Duration,
    init_fail: bool,
    init_rows: Vec<ParseStatusRow>,
    parse_rows: Vec<ParseStatusRow>,
    node_rows: Vec<NodeRow>,
    iface_rows: Vec<InterfaceRow>,
    edge_rows: Vec<EdgeRow>,
    delete_fail: bool,
    query: QueryBehavior,
    /// Fail this many query calls with a transient error before applying
    /// the configured behavior.
    query_transient_failures: AtomicUsize,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self {
            init_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            init_delay: Duration::ZERO,
            init_fail: false,
            init_rows: Vec::new(),
            parse_rows: Vec::new(),
            node_rows: Vec::new(),
            iface_rows: Vec::new(),
            edge_rows: Vec::new(),
            delete_fail: false,
            query: QueryBehavior::Rows(Vec::new()),
            query_transient_failures: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_init_rows(mut self, rows: Vec<ParseStatusRow>) -> Self {
        self.init_rows = rows;
        self
    }

    pub(crate) fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub(crate) fn with_init_failure(mut self) -> Self {
        self.init_fail = true;
        self
    }

    pub(crate) fn with_parse_status(mut self, rows: Vec<ParseStatusRow>) -> Self {
        self.parse_rows = rows;
        self
    }

    pub(crate) fn with_nodes(mut self, hostnames: &[&str]) -> Self {
        self.node_rows = hostnames.iter().map(|h| node_row(h)).collect();
        self
    }

    pub(crate) fn with_node_rows(mut self, rows: Vec<NodeRow>) -> Self {
        self.node_rows = rows;
        self
    }

    pub(crate) fn with_interfaces(mut self, rows: Vec<InterfaceRow>) -> Self {
        self.iface_rows = rows;
        self
    }

    pub(crate) fn with_edges(mut self, rows: Vec<EdgeRow>) -> Self {
        self.edge_rows = rows;
        self
    }

    pub(crate) fn with_delete_failure(mut self) -> Self {
        self.delete_fail = true;
        self
    }

    pub(crate) fn with_query(mut self, behavior: QueryBehavior) -> Self {
        self.query = behavior;
        self
    }

    pub(crate) fn with_query_transient_failures(self, count: usize) -> Self {
        self.query_transient_failures.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl EngineGateway for StubGateway {
    async fn version(&self) -> Result<VersionInfo, EngineError> {
        Ok(VersionInfo {
            version: "2025.07.07".into(),
        })
    }

    async fn init_snapshot(
        &self,
        _network: &str,
        _snapshot: &str,
        _files: &[ConfigFile],
    ) -> Result<Vec<ParseStatusRow>, EngineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.init_fail {
            return Err(unavailable());
        }
        Ok(self.init_rows.clone())
    }

    async fn parse_status(
        &self,
        _network: &str,
        _snapshot: &str,
    ) -> Result<Vec<ParseStatusRow>, EngineError> {
        Ok(self.parse_rows.clone())
    }

    async fn node_properties(
        &self,
        _network: &str,
        _snapshot: &str,
    ) -> Result<Vec<NodeRow>, EngineError> {
        Ok(self.node_rows.clone())
    }

    async fn interface_properties(
        &self,
        _network: &str,
        _snapshot: &str,
        node: Option<&str>,
    ) -> Result<Vec<InterfaceRow>, EngineError> {
        let rows = match node {
            Some(n) => self
                .iface_rows
                .iter()
                .filter(|r| r.node == n)
                .cloned()
                .collect(),
            None => self.iface_rows.clone(),
        };
        Ok(rows)
    }

    async fn layer3_edges(
        &self,
        _network: &str,
        _snapshot: &str,
    ) -> Result<Vec<EdgeRow>, EngineError> {
        Ok(self.edge_rows.clone())
    }

    async fn run_query(
        &self,
        _network: &str,
        _snapshot: &str,
        _kind: &str,
        _params: Value,
    ) -> Result<Vec<Value>, EngineError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.query_transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.query_transient_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(unavailable());
        }

        match &self.query {
            QueryBehavior::Rows(rows) => Ok(rows.clone()),
            QueryBehavior::Hang => std::future::pending().await,
            QueryBehavior::Reject(message) => Err(EngineError::Engine {
                status: 400,
                message: message.clone(),
                code: Some("query.invalid".into()),
            }),
        }
    }

    async fn delete_snapshot(&self, _network: &str, _snapshot: &str) -> Result<(), EngineError> {
        if self.delete_fail {
            return Err(EngineError::Engine {
                status: 500,
                message: "delete failed".into(),
                code: None,
            });
        }
        Ok(())
    }
}
