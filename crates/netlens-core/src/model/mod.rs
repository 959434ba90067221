// ── Domain model ──

pub mod device;
pub mod edge;
pub mod snapshot;
pub mod verification;

pub use device::{Device, DeviceType, Interface, Vendor};
pub use edge::Edge;
pub use snapshot::{ParseError, Snapshot, SnapshotKey, SnapshotStatus};
pub use verification::{
    AclMatch, Findings, FlowHop, FlowResult, FlowTrace, QueryType, RouteEntry,
    VerificationResult, VerificationStatus,
};
