// ── Snapshot registry ──
//
// Owns all mutable snapshot state. One entry per (network, name) key,
// each with its own watch channel: mutation is key-scoped, unrelated
// keys never contend, and waiters observe state transitions without
// polling. Creation is single-flight per key -- the engine is never
// submitted to twice for the same key.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use netlens_engine::types::ConfigFile;

use crate::convert::parse_errors_from_rows;
use crate::error::CoreError;
use crate::gateway::EngineGateway;
use crate::model::{ParseError, Snapshot, SnapshotKey, SnapshotStatus};

// ── Handle ───────────────────────────────────────────────────────────

/// Observer handle for one snapshot key, returned by
/// [`SnapshotRegistry::create`].
///
/// `create` returns as soon as the CREATING record is registered; the
/// engine submission resolves in the background. Await
/// [`resolved()`](Self::resolved) for the terminal record.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    rx: watch::Receiver<Snapshot>,
}

impl SnapshotHandle {
    /// The record as of now (possibly still CREATING).
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the creation to reach a terminal state.
    pub async fn resolved(mut self) -> Snapshot {
        match self
            .rx
            .wait_for(|s| s.status.is_terminal())
            .await
            .map(|snap| snap.clone())
        {
            Ok(snap) => snap,
            // Registry dropped mid-flight; report the last observed state.
            Err(_) => self.rx.borrow().clone(),
        }
    }
}

/// Outcome of a delete: local state always flips, the engine-side
/// cleanup is best-effort and reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub engine_deleted: bool,
    pub engine_error: Option<String>,
}

// ── Registry ─────────────────────────────────────────────────────────

struct SnapshotEntry {
    state: watch::Sender<Snapshot>,
}

enum Claim {
    /// This caller owns the creation; resolve it.
    Owner(Arc<SnapshotEntry>),
    /// Another creation is in flight for this key; wait for it.
    InFlight(watch::Receiver<Snapshot>),
    /// Terminal non-deleted record already present.
    Duplicate,
}

/// Key-sharded map from `(network, name)` to snapshot state.
///
/// The only mutable shared state in the workspace. Aggregation and
/// verification read through [`get`](Self::get) /
/// [`expect_complete`](Self::expect_complete); all mutation goes
/// through the key's own entry.
pub struct SnapshotRegistry {
    gateway: Arc<dyn EngineGateway>,
    entries: DashMap<SnapshotKey, Arc<SnapshotEntry>>,
}

impl SnapshotRegistry {
    pub fn new(gateway: Arc<dyn EngineGateway>) -> Self {
        Self {
            gateway,
            entries: DashMap::new(),
        }
    }

    // ── Create ───────────────────────────────────────────────────────

    /// Register a snapshot and kick off engine submission.
    ///
    /// Fails with [`CoreError::DuplicateSnapshot`] if the key holds a
    /// terminal non-deleted record. If a creation for the same key is
    /// already in flight, this call never re-submits: it waits for that
    /// creation to resolve and returns a handle to the resolved record.
    pub async fn create(
        &self,
        network: &str,
        name: &str,
        files: Vec<ConfigFile>,
    ) -> Result<SnapshotHandle, CoreError> {
        let key = SnapshotKey::new(network, name)?;
        if files.is_empty() {
            return Err(CoreError::Validation {
                message: "at least one configuration file is required".into(),
            });
        }

        let claim = self.claim(&key, files.len());

        match claim {
            Claim::Duplicate => Err(CoreError::DuplicateSnapshot {
                network: key.network,
                name: key.name,
            }),
            Claim::InFlight(mut rx) => {
                debug!(snapshot = %key, "creation already in flight, waiting");
                let _ = rx.wait_for(|s| s.status.is_terminal()).await;
                Ok(SnapshotHandle { rx })
            }
            Claim::Owner(entry) => {
                let rx = entry.state.subscribe();
                let gateway = Arc::clone(&self.gateway);
                tokio::spawn(resolve_creation(gateway, key, files, entry));
                Ok(SnapshotHandle { rx })
            }
        }
    }

    /// Atomically claim the key. The DashMap entry guard serializes
    /// concurrent claimers on the same key; different keys go through
    /// different shards.
    fn claim(&self, key: &SnapshotKey, file_count: usize) -> Claim {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(occ) => {
                let entry = occ.get();
                let mut claimed = false;
                entry.state.send_modify(|snap| {
                    // A deleted key is free again; reuse its channel.
                    if snap.status == SnapshotStatus::Deleted {
                        *snap = Snapshot::creating(key, file_count);
                        claimed = true;
                    }
                });
                if claimed {
                    Claim::Owner(Arc::clone(entry))
                } else if entry.state.borrow().status == SnapshotStatus::Creating {
                    Claim::InFlight(entry.state.subscribe())
                } else {
                    Claim::Duplicate
                }
            }
            Entry::Vacant(vac) => {
                let (tx, _) = watch::channel(Snapshot::creating(key, file_count));
                let entry = Arc::new(SnapshotEntry { state: tx });
                vac.insert(Arc::clone(&entry));
                Claim::Owner(entry)
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Look up a snapshot record. Deleted records read as absent.
    pub fn get(&self, network: &str, name: &str) -> Result<Snapshot, CoreError> {
        let key = SnapshotKey {
            network: network.to_owned(),
            name: name.to_owned(),
        };
        let not_found = || CoreError::NotFound {
            network: network.to_owned(),
            name: name.to_owned(),
        };

        let entry = self.entries.get(&key).ok_or_else(not_found)?;
        let snap = entry.state.borrow().clone();
        if snap.status == SnapshotStatus::Deleted {
            return Err(not_found());
        }
        Ok(snap)
    }

    /// Look up a snapshot and require it to be COMPLETE.
    pub fn expect_complete(&self, network: &str, name: &str) -> Result<Snapshot, CoreError> {
        let snap = self.get(network, name)?;
        if !snap.status.is_complete() {
            return Err(CoreError::SnapshotNotReady {
                network: network.to_owned(),
                name: name.to_owned(),
                status: snap.status,
            });
        }
        Ok(snap)
    }

    /// All non-deleted snapshots, optionally filtered by network,
    /// ordered by creation time.
    pub fn list(&self, network: Option<&str>) -> Vec<Snapshot> {
        let mut snaps: Vec<Snapshot> = self
            .entries
            .iter()
            .map(|entry| entry.value().state.borrow().clone())
            .filter(|s| s.status != SnapshotStatus::Deleted)
            .filter(|s| network.is_none_or(|n| s.network == n))
            .collect();
        snaps.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        snaps
    }

    /// Recompute a COMPLETE snapshot's engine-derived fields (device
    /// count, parse errors) from live engine state.
    ///
    /// Read-only: the stored record stays untouched, preserving
    /// immutability-once-complete.
    pub async fn refresh(&self, network: &str, name: &str) -> Result<Snapshot, CoreError> {
        let mut snap = self.expect_complete(network, name)?;

        let (status_rows, node_rows) = tokio::join!(
            self.gateway.parse_status(network, name),
            self.gateway.node_properties(network, name),
        );

        snap.parse_errors = parse_errors_from_rows(&status_rows?);
        snap.device_count = node_rows?.len();
        Ok(snap)
    }

    // ── Delete ───────────────────────────────────────────────────────

    /// Logically delete a snapshot, then best-effort delete the
    /// engine-side data.
    ///
    /// Local state flips first and is never rolled back: local
    /// visibility must not resurrect stale data if the engine call
    /// fails. The engine outcome is reported in the returned
    /// [`DeleteReport`].
    pub async fn delete(&self, network: &str, name: &str) -> Result<DeleteReport, CoreError> {
        let key = SnapshotKey {
            network: network.to_owned(),
            name: name.to_owned(),
        };

        let previous = {
            let entry = self.entries.get(&key).ok_or_else(|| CoreError::NotFound {
                network: network.to_owned(),
                name: name.to_owned(),
            })?;

            // Atomic check-and-flip under the channel's value lock.
            let mut previous = SnapshotStatus::Deleted;
            entry.state.send_modify(|snap| {
                previous = snap.status;
                if snap.status.is_terminal() && snap.status != SnapshotStatus::Deleted {
                    snap.status = SnapshotStatus::Deleted;
                }
            });
            previous
        };

        match previous {
            SnapshotStatus::Deleted => Err(CoreError::NotFound {
                network: network.to_owned(),
                name: name.to_owned(),
            }),
            SnapshotStatus::Creating => Err(CoreError::SnapshotNotReady {
                network: network.to_owned(),
                name: name.to_owned(),
                status: SnapshotStatus::Creating,
            }),
            _ => {
                info!(snapshot = %key, "snapshot deleted");
                match self.gateway.delete_snapshot(network, name).await {
                    Ok(()) => Ok(DeleteReport {
                        engine_deleted: true,
                        engine_error: None,
                    }),
                    Err(e) => {
                        warn!(snapshot = %key, error = %e, "engine-side delete failed (local state kept)");
                        Ok(DeleteReport {
                            engine_deleted: false,
                            engine_error: Some(e.to_string()),
                        })
                    }
                }
            }
        }
    }
}

// ── Creation resolution ──────────────────────────────────────────────

/// The single logical unit of work tied to a claimed key: submit the
/// configs, derive the outcome, publish the terminal record.
///
/// Outcome policy: zero detected devices means FAILED regardless of
/// per-file statuses; otherwise COMPLETE with parse errors attached.
async fn resolve_creation(
    gateway: Arc<dyn EngineGateway>,
    key: SnapshotKey,
    files: Vec<ConfigFile>,
    entry: Arc<SnapshotEntry>,
) {
    info!(snapshot = %key, files = files.len(), "initializing snapshot");

    let mut snap = entry.state.borrow().clone();

    match gateway.init_snapshot(&key.network, &key.name, &files).await {
        Ok(rows) => {
            snap.parse_errors = parse_errors_from_rows(&rows);

            snap.device_count = match gateway.node_properties(&key.network, &key.name).await {
                Ok(nodes) => nodes.len(),
                Err(e) => {
                    warn!(snapshot = %key, error = %e, "could not get device count");
                    0
                }
            };

            snap.engine_version = gateway.version().await.ok().map(|v| v.version);

            snap.status = if snap.device_count == 0 {
                warn!(snapshot = %key, "no devices detected, marking failed");
                SnapshotStatus::Failed
            } else {
                SnapshotStatus::Complete
            };
        }
        Err(e) => {
            warn!(snapshot = %key, error = %e, "snapshot initialization failed");
            snap.parse_errors.push(ParseError {
                file_name: "<upload>".into(),
                message: e.to_string(),
                line_number: None,
            });
            snap.status = SnapshotStatus::Failed;
        }
    }

    info!(
        snapshot = %key,
        status = %snap.status,
        devices = snap.device_count,
        parse_errors = snap.parse_errors.len(),
        "snapshot creation resolved"
    );
    entry.state.send_replace(snap);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testutil::{StubGateway, passed_row, failed_row};

    fn files(n: usize) -> Vec<ConfigFile> {
        (0..n)
            .map(|i| ConfigFile {
                name: format!("r{i}.cfg"),
                content: format!("hostname r{i}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn all_files_parse_yields_complete_with_no_errors() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![
                    passed_row("r0.cfg"),
                    passed_row("r1.cfg"),
                    passed_row("r2.cfg"),
                ])
                .with_nodes(&["r0", "r1", "r2"]),
        );
        let registry = SnapshotRegistry::new(stub);

        let snap = registry
            .create("default", "demo", files(3))
            .await
            .unwrap()
            .resolved()
            .await;

        assert_eq!(snap.status, SnapshotStatus::Complete);
        assert_eq!(snap.config_file_count, 3);
        assert_eq!(snap.device_count, 3);
        assert!(snap.parse_errors.is_empty());
        assert_eq!(snap.engine_version.as_deref(), Some("2025.07.07"));
    }

    #[tokio::test]
    async fn partial_parse_failure_still_completes_with_errors_attached() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg"), failed_row("bad.cfg", "nope")])
                .with_nodes(&["r0"]),
        );
        let registry = SnapshotRegistry::new(stub);

        let snap = registry
            .create("default", "demo", files(2))
            .await
            .unwrap()
            .resolved()
            .await;

        assert_eq!(snap.status, SnapshotStatus::Complete);
        assert_eq!(snap.parse_errors.len(), 1);
        assert_eq!(snap.parse_errors[0].file_name, "bad.cfg");
    }

    #[tokio::test]
    async fn zero_devices_yields_failed() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![failed_row("bad.cfg", "nope")])
                .with_nodes(&[]),
        );
        let registry = SnapshotRegistry::new(stub);

        let snap = registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        assert_eq!(snap.status, SnapshotStatus::Failed);
        assert_eq!(snap.device_count, 0);
    }

    #[tokio::test]
    async fn submission_error_yields_failed_with_message() {
        let stub = Arc::new(StubGateway::new().with_init_failure());
        let registry = SnapshotRegistry::new(stub);

        let snap = registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        assert_eq!(snap.status, SnapshotStatus::Failed);
        assert_eq!(snap.parse_errors.len(), 1);
        assert_eq!(snap.parse_errors[0].file_name, "<upload>");
    }

    #[tokio::test]
    async fn concurrent_creates_submit_exactly_once() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"])
                .with_init_delay(std::time::Duration::from_millis(50)),
        );
        let registry = Arc::new(SnapshotRegistry::new(Arc::clone(&stub) as _));

        let (a, b) = tokio::join!(
            registry.create("default", "demo", files(1)),
            registry.create("default", "demo", files(1)),
        );

        let snap_a = a.unwrap().resolved().await;
        let snap_b = b.unwrap().resolved().await;

        assert_eq!(stub.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(snap_a, snap_b);
        assert_eq!(snap_a.status, SnapshotStatus::Complete);
    }

    #[tokio::test]
    async fn duplicate_create_rejected_after_terminal_state() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"]),
        );
        let registry = SnapshotRegistry::new(stub);

        registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        let err = registry.create("default", "demo", files(1)).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSnapshot { .. }));
    }

    #[tokio::test]
    async fn creates_for_different_keys_run_in_parallel() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"]),
        );
        let registry = Arc::new(SnapshotRegistry::new(Arc::clone(&stub) as _));

        let (a, b) = tokio::join!(
            registry.create("default", "one", files(1)),
            registry.create("default", "two", files(1)),
        );

        assert_eq!(a.unwrap().resolved().await.status, SnapshotStatus::Complete);
        assert_eq!(b.unwrap().resolved().await.status, SnapshotStatus::Complete);
        assert_eq!(stub.init_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn get_list_and_filters() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"]),
        );
        let registry = SnapshotRegistry::new(stub);

        registry
            .create("prod", "alpha", files(1))
            .await
            .unwrap()
            .resolved()
            .await;
        registry
            .create("lab", "beta", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        assert_eq!(registry.get("prod", "alpha").unwrap().name, "alpha");
        assert!(matches!(
            registry.get("prod", "missing"),
            Err(CoreError::NotFound { .. })
        ));

        assert_eq!(registry.list(None).len(), 2);
        let prod_only = registry.list(Some("prod"));
        assert_eq!(prod_only.len(), 1);
        assert_eq!(prod_only[0].network, "prod");
    }

    #[tokio::test]
    async fn delete_hides_record_and_allows_recreate() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"]),
        );
        let registry = SnapshotRegistry::new(Arc::clone(&stub) as _);

        registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        let report = registry.delete("default", "demo").await.unwrap();
        assert!(report.engine_deleted);

        assert!(matches!(
            registry.get("default", "demo"),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            registry.delete("default", "demo").await,
            Err(CoreError::NotFound { .. })
        ));

        // The key is free again after deletion.
        let snap = registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;
        assert_eq!(snap.status, SnapshotStatus::Complete);
    }

    #[tokio::test]
    async fn delete_with_engine_failure_keeps_local_state_deleted() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0"])
                .with_delete_failure(),
        );
        let registry = SnapshotRegistry::new(stub);

        registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        let report = registry.delete("default", "demo").await.unwrap();
        assert!(!report.engine_deleted);
        assert!(report.engine_error.is_some());

        // Not rolled back: the record stays invisible.
        assert!(matches!(
            registry.get("default", "demo"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let stub = Arc::new(StubGateway::new());
        let registry = SnapshotRegistry::new(stub);

        assert!(matches!(
            registry.create("default", "demo", Vec::new()).await,
            Err(CoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn refresh_recomputes_engine_derived_fields() {
        let stub = Arc::new(
            StubGateway::new()
                .with_init_rows(vec![passed_row("r0.cfg")])
                .with_nodes(&["r0", "r1"])
                .with_parse_status(vec![passed_row("r0.cfg"), failed_row("late.cfg", "drift")]),
        );
        let registry = SnapshotRegistry::new(stub);

        registry
            .create("default", "demo", files(1))
            .await
            .unwrap()
            .resolved()
            .await;

        let refreshed = registry.refresh("default", "demo").await.unwrap();
        assert_eq!(refreshed.device_count, 2);
        assert_eq!(refreshed.parse_errors.len(), 1);

        // The stored record is untouched.
        assert!(registry.get("default", "demo").unwrap().parse_errors.is_empty());
    }
}
