//! Engine API request and response types.
//!
//! All types match the JSON bodies of the engine's `/v2/` endpoints.
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Service ──────────────────────────────────────────────────────────

/// Engine build information — from `GET /v2/version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
}

// ── Snapshot initialization ──────────────────────────────────────────

/// One uploaded configuration file, shipped verbatim to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub name: String,
    pub content: String,
}

/// Request body for `POST /v2/networks/{network}/snapshots/{snapshot}/init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSnapshotRequest {
    pub files: Vec<ConfigFile>,
}

/// Per-file parse outcome — returned by snapshot init and by
/// `GET …/parse_status`.
///
/// `status` is `PASSED`, `PARTIALLY_UNRECOGNIZED`, or `FAILED`; anything
/// other than `PASSED` carries a `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStatusRow {
    pub file_name: String,
    pub status: String,
    pub message: Option<String>,
    pub line_number: Option<u32>,
}

impl ParseStatusRow {
    /// The engine's marker for a cleanly parsed file.
    pub const PASSED: &'static str = "PASSED";

    pub fn passed(&self) -> bool {
        self.status == Self::PASSED
    }
}

// ── Topology result sets ─────────────────────────────────────────────

/// One device row — from `GET …/nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    pub node: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    /// Configuration dialect the engine recognized (e.g. `CISCO_IOS`).
    pub config_format: Option<String>,
    /// Device role if the engine could classify it; usually absent.
    pub device_type: Option<String>,
}

/// One interface row — from `GET …/interfaces`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceRow {
    pub node: String,
    pub interface: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// CIDR strings assigned to the interface.
    #[serde(default)]
    pub all_addresses: Vec<String>,
    pub vlan: Option<u16>,
    pub description: Option<String>,
    /// Bandwidth in Mbps.
    pub bandwidth: Option<u64>,
    pub mtu: Option<u32>,
}

fn default_active() -> bool {
    true
}

/// One layer-3 adjacency row — from `GET …/edges/layer3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRow {
    pub node: String,
    pub interface: String,
    pub remote_node: String,
    pub remote_interface: String,
    pub ip: Option<String>,
    pub remote_ip: Option<String>,
}

// ── Verification queries ─────────────────────────────────────────────

/// Request body for `POST …/queries`.
///
/// `kind` selects the engine question (`reachability`, `searchFilters`,
/// `routes`); `params` is forwarded opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub kind: String,
    pub params: Value,
}

/// Response body for `POST …/queries` — rows are query-kind specific and
/// left opaque here; `netlens-core` owns normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<Value>,
}
