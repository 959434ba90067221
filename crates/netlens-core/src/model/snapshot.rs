// ── Snapshot domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Registry key: a snapshot is identified by `(network, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub network: String,
    pub name: String,
}

impl SnapshotKey {
    /// Validate and build a key.
    ///
    /// `network` must be non-empty; `name` is restricted to
    /// `[A-Za-z0-9_-]`, 1..=100 chars, so it can be embedded in engine
    /// URLs and filesystem paths without escaping.
    pub fn new(network: &str, name: &str) -> Result<Self, CoreError> {
        if network.trim().is_empty() {
            return Err(CoreError::Validation {
                message: "network must not be empty".into(),
            });
        }
        if name.is_empty() || name.len() > 100 {
            return Err(CoreError::InvalidSnapshotName {
                name: name.into(),
                reason: "length must be 1..=100".into(),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
        {
            return Err(CoreError::InvalidSnapshotName {
                name: name.into(),
                reason: format!("character '{bad}' not allowed (use [A-Za-z0-9_-])"),
            });
        }
        Ok(Self {
            network: network.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl std::fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.name)
    }
}

/// Snapshot lifecycle state.
///
/// Transitions are monotonic: `Creating -> Complete | Failed`,
/// `Complete | Failed -> Deleted`. Nothing leaves `Deleted`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
    Creating,
    Complete,
    Failed,
    Deleted,
}

impl SnapshotStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Creating)
    }

    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Parse outcome for a single configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub file_name: String,
    pub message: String,
    pub line_number: Option<u32>,
}

/// One analysis run over a set of uploaded configuration files.
///
/// Owned exclusively by the registry; immutable once COMPLETE except
/// for deletion. Everything else reads copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub network: String,
    pub name: String,
    pub status: SnapshotStatus,
    pub config_file_count: usize,
    /// Devices the engine detected; meaningful only once COMPLETE.
    pub device_count: usize,
    /// Files that failed (or partially failed) to parse, in engine order.
    pub parse_errors: Vec<ParseError>,
    pub created_at: DateTime<Utc>,
    /// Engine build the snapshot was analyzed with, when known.
    pub engine_version: Option<String>,
}

impl Snapshot {
    /// Fresh CREATING record for a just-claimed key.
    pub(crate) fn creating(key: &SnapshotKey, config_file_count: usize) -> Self {
        Self {
            network: key.network.clone(),
            name: key.name.clone(),
            status: SnapshotStatus::Creating,
            config_file_count,
            device_count: 0,
            parse_errors: Vec::new(),
            created_at: Utc::now(),
            engine_version: None,
        }
    }

    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            network: self.network.clone(),
            name: self.name.clone(),
        }
    }
}
