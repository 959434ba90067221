// Hand-crafted async HTTP client for the analysis engine's REST API (v2).
//
// Base path: /v2/
// No auth: the engine is a trusted sidecar service.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{
    ConfigFile, EdgeRow, InitSnapshotRequest, InterfaceRow, NodeRow, ParseStatusRow, QueryRequest,
    QueryResponse, VersionInfo,
};

// ── Error response shape from the engine ─────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the analysis engine's REST API.
///
/// Holds a single pooled `reqwest::Client`; connection reuse and the
/// per-call timeout come from [`TransportConfig`]. Every method's future
/// is cancel-safe: dropping it aborts the in-flight request.
pub struct EngineClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EngineClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from the engine base URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages transport settings).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Normalize the base URL so joining `v2/…` paths works uniformly.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"v2/version"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn snapshot_path(network: &str, snapshot: &str, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("v2/networks/{network}/snapshots/{snapshot}")
        } else {
            format!("v2/networks/{network}/snapshots/{snapshot}/{suffix}")
        }
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        Self::handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Engine {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Engine {
                status: status.as_u16(),
                message: if raw.is_empty() { status.to_string() } else { raw },
                code: None,
            }
        }
    }

    // ── Service endpoints ────────────────────────────────────────────

    /// `GET /v2/version` — engine connectivity check plus build info.
    pub async fn version(&self) -> Result<VersionInfo, Error> {
        self.get("v2/version").await
    }

    // ── Snapshot endpoints ───────────────────────────────────────────

    /// Submit configuration files and initialize a snapshot.
    ///
    /// Synchronous on the engine side: the response carries the per-file
    /// parse outcome for the whole upload.
    pub async fn init_snapshot(
        &self,
        network: &str,
        snapshot: &str,
        files: &[ConfigFile],
    ) -> Result<Vec<ParseStatusRow>, Error> {
        let body = InitSnapshotRequest {
            files: files.to_vec(),
        };
        self.post(&Self::snapshot_path(network, snapshot, "init"), &body)
            .await
    }

    /// Fetch the per-file parse status for an existing snapshot.
    pub async fn parse_status(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<ParseStatusRow>, Error> {
        self.get(&Self::snapshot_path(network, snapshot, "parse_status"))
            .await
    }

    /// Delete a snapshot and its derived data on the engine.
    pub async fn delete_snapshot(&self, network: &str, snapshot: &str) -> Result<(), Error> {
        self.delete(&Self::snapshot_path(network, snapshot, ""))
            .await
    }

    // ── Topology endpoints ───────────────────────────────────────────

    /// Node property rows for every device the engine detected.
    pub async fn node_properties(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<NodeRow>, Error> {
        self.get(&Self::snapshot_path(network, snapshot, "nodes"))
            .await
    }

    /// Interface property rows, optionally filtered to one device.
    pub async fn interface_properties(
        &self,
        network: &str,
        snapshot: &str,
        node: Option<&str>,
    ) -> Result<Vec<InterfaceRow>, Error> {
        let path = Self::snapshot_path(network, snapshot, "interfaces");
        match node {
            Some(n) => {
                self.get_with_params(&path, &[("node", n.to_owned())])
                    .await
            }
            None => self.get(&path).await,
        }
    }

    /// Layer-3 adjacency rows.
    pub async fn layer3_edges(
        &self,
        network: &str,
        snapshot: &str,
    ) -> Result<Vec<EdgeRow>, Error> {
        self.get(&Self::snapshot_path(network, snapshot, "edges/layer3"))
            .await
    }

    // ── Verification endpoint ────────────────────────────────────────

    /// Run a verification question against a snapshot.
    ///
    /// Rows are query-kind specific and returned opaquely; the caller
    /// owns normalization into typed results.
    pub async fn run_query(
        &self,
        network: &str,
        snapshot: &str,
        kind: &str,
        params: Value,
    ) -> Result<Vec<Value>, Error> {
        let body = QueryRequest {
            kind: kind.to_owned(),
            params,
        };
        let resp: QueryResponse = self
            .post(&Self::snapshot_path(network, snapshot, "queries"), &body)
            .await?;
        Ok(resp.rows)
    }
}
