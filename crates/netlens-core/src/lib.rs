//! Snapshot lifecycle, topology aggregation, and verification
//! orchestration over an external configuration-analysis engine.
//!
//! This crate owns the stateful heart of the netlens workspace; the
//! HTTP API layer on top of it is thin plumbing:
//!
//! - **[`SnapshotRegistry`]** — the only mutable shared state. One
//!   entry per `(network, name)` key with a per-key watch channel:
//!   creation is single-flight (the engine is never submitted to twice
//!   for one key), unrelated keys never contend, and
//!   [`create()`](SnapshotRegistry::create) returns a
//!   [`SnapshotHandle`] immediately while resolution runs as its own
//!   task.
//!
//! - **[`TopologyService`]** — pure read side. Fetches node,
//!   interface, and edge result sets concurrently through the gateway
//!   and joins them defensively into a [`Topology`]; orphaned
//!   interfaces and dangling edges are dropped and logged, never
//!   surfaced.
//!
//! - **[`VerificationService`]** — dispatches reachability / ACL /
//!   routing questions with timeout, bounded retry, and a concurrency
//!   cap, normalizing the engine's duck-typed rows into a
//!   discriminated [`VerificationResult`] envelope.
//!
//! - **[`EngineGateway`]** — the trait seam to the engine.
//!   `netlens_engine::EngineClient` implements it for production;
//!   tests substitute stubs.

pub mod config;
mod convert;
pub mod error;
pub mod gateway;
pub mod model;
pub mod registry;
pub mod topology;
pub mod verify;

#[cfg(test)]
mod testutil;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, TlsVerification, VerifyOptions};
pub use error::CoreError;
pub use gateway::EngineGateway;
pub use registry::{DeleteReport, SnapshotHandle, SnapshotRegistry};
pub use topology::{Topology, TopologyService, TypeHeuristics, build_topology};
pub use verify::VerificationService;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AclMatch,
    Device,
    DeviceType,
    Edge,
    Findings,
    FlowHop,
    FlowResult,
    FlowTrace,
    Interface,
    ParseError,
    QueryType,
    RouteEntry,
    Snapshot,
    SnapshotKey,
    SnapshotStatus,
    Vendor,
    VerificationResult,
    VerificationStatus,
};

// The upload file shape is defined by the engine crate; re-exported so
// API-layer callers don't need a direct netlens-engine dependency.
pub use netlens_engine::types::ConfigFile;
