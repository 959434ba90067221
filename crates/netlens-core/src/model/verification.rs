// ── Verification domain types ──
//
// One result envelope per query. The envelope IS the error channel for
// verification: engine failures after dispatch land in `status` and
// `error_message`, never in a `Result::Err`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CoreError;

/// The closed set of verification query kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    Reachability,
    AclFilter,
    Routing,
}

impl QueryType {
    /// Parse a request string, the validation point for the closed set.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        value
            .parse()
            .map_err(|_| CoreError::InvalidQueryType {
                value: value.to_owned(),
            })
    }

    /// The engine question this query kind dispatches to.
    pub(crate) fn engine_kind(self) -> &'static str {
        match self {
            Self::Reachability => "reachability",
            Self::AclFilter => "searchFilters",
            Self::Routing => "routes",
        }
    }
}

/// Verification lifecycle state. Terminal once it leaves `InProgress`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    InProgress,
    Success,
    Failed,
    Timeout,
}

// ── Query-type specific result rows ──────────────────────────────────

/// One hop in a flow trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowHop {
    pub node: String,
    /// Action taken at this hop (FORWARDED, DELIVERED, DENIED, ...).
    pub action: String,
    pub interface_in: Option<String>,
    pub interface_out: Option<String>,
}

/// One path a flow can take through the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTrace {
    pub hops: Vec<FlowHop>,
}

/// Reachability verdict for one flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    /// Human-readable flow description (src -> dst).
    pub flow: String,
    /// Final disposition (SUCCESS, DENIED_IN, NO_ROUTE, ...).
    pub outcome: String,
    pub traces: Vec<FlowTrace>,
}

/// One ACL line matched by the probed traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclMatch {
    pub node: String,
    pub filter: String,
    /// PERMIT or DENY.
    pub action: String,
    pub line_number: Option<u32>,
    pub line_content: Option<String>,
}

/// One routing table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub node: String,
    pub network: String,
    /// Routing protocol (STATIC, OSPF, BGP, CONNECTED, ...).
    pub protocol: String,
    pub next_hop: Option<String>,
    pub metric: Option<u64>,
    pub admin_distance: Option<u32>,
    pub interface: Option<String>,
}

/// Normalized query results, discriminated by query kind so each
/// variant's fields are statically known to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Findings {
    Reachability(Vec<FlowResult>),
    AclFilter(Vec<AclMatch>),
    Routing(Vec<RouteEntry>),
}

// ── Result envelope ──────────────────────────────────────────────────

/// The result of one verification query.
///
/// Created fresh per request; never mutated after reaching a terminal
/// status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub query_id: Uuid,
    pub query_type: QueryType,
    pub status: VerificationStatus,
    /// Opaque echo of the request parameters.
    pub parameters: Map<String, Value>,
    pub executed_at: DateTime<Utc>,
    /// Wall-clock from envelope allocation to terminal status.
    pub execution_time_ms: u64,
    pub findings: Option<Findings>,
    pub error_message: Option<String>,
}

impl VerificationResult {
    /// Fresh IN_PROGRESS envelope for a just-validated request.
    pub(crate) fn in_progress(query_type: QueryType, parameters: Map<String, Value>) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            query_type,
            status: VerificationStatus::InProgress,
            parameters,
            executed_at: Utc::now(),
            execution_time_ms: 0,
            findings: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_type_parses_closed_set() {
        assert_eq!(
            QueryType::parse("REACHABILITY").ok(),
            Some(QueryType::Reachability)
        );
        assert_eq!(QueryType::parse("ACL_FILTER").ok(), Some(QueryType::AclFilter));
        assert_eq!(QueryType::parse("ROUTING").ok(), Some(QueryType::Routing));
        assert!(matches!(
            QueryType::parse("PING"),
            Err(CoreError::InvalidQueryType { .. })
        ));
    }
}
