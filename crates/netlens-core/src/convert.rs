// ── Wire-to-domain type conversions ──
//
// Bridges raw `netlens_engine` response rows into canonical
// `netlens_core::model` domain types. The three topology result sets
// are not guaranteed referentially consistent, so nothing here assumes
// cross-set integrity -- joins happen in the aggregator with defensive
// lookups.

use serde::Deserialize;
use serde_json::Value;

use netlens_engine::types::{InterfaceRow, ParseStatusRow};

use crate::model::{
    AclMatch, Findings, FlowHop, FlowResult, FlowTrace, Interface, ParseError, QueryType,
    RouteEntry, Vendor,
};

// ── Node properties ──────────────────────────────────────────────────

/// Normalize the engine's vendor string, falling back to the
/// configuration dialect when the vendor field is absent.
pub(crate) fn parse_vendor(vendor: Option<&str>, config_format: Option<&str>) -> Vendor {
    if let Some(v) = vendor {
        let lower = v.to_ascii_lowercase();
        if lower.contains("cisco") {
            return Vendor::Cisco;
        }
        if lower.contains("juniper") {
            return Vendor::Juniper;
        }
        if lower.contains("arista") {
            return Vendor::Arista;
        }
        if lower.contains("palo") {
            return Vendor::PaloAlto;
        }
    }

    // Fallback: infer from the recognized config dialect.
    match config_format.map(str::to_ascii_lowercase).as_deref() {
        Some(f) if f.contains("cisco") || f.contains("ios") || f.contains("nxos") => Vendor::Cisco,
        Some(f) if f.contains("juniper") || f.contains("junos") => Vendor::Juniper,
        Some(f) if f.contains("arista") || f.contains("eos") => Vendor::Arista,
        Some(f) if f.contains("palo") || f.contains("panos") => Vendor::PaloAlto,
        _ => Vendor::Unknown,
    }
}

// ── Interface properties ─────────────────────────────────────────────

impl From<InterfaceRow> for Interface {
    fn from(row: InterfaceRow) -> Self {
        Interface {
            hostname: row.node,
            name: row.interface,
            active: row.active,
            ip_addresses: row.all_addresses,
            vlan: row.vlan,
            description: row.description,
            bandwidth: row.bandwidth,
            mtu: row.mtu,
        }
    }
}

// ── Parse status ─────────────────────────────────────────────────────

/// Collect the non-PASSED rows as domain parse errors, preserving order.
pub(crate) fn parse_errors_from_rows(rows: &[ParseStatusRow]) -> Vec<ParseError> {
    rows.iter()
        .filter(|row| !row.passed())
        .map(|row| ParseError {
            file_name: row.file_name.clone(),
            message: row
                .message
                .clone()
                .unwrap_or_else(|| format!("parse status {}", row.status)),
            line_number: row.line_number,
        })
        .collect()
}

// ── Verification row normalization ───────────────────────────────────
//
// The engine's query rows are duck-typed JSON. Each query kind has an
// expected shape; a row that doesn't fit is a normalization failure
// reported as a message, never a panic.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowResultWire {
    flow: String,
    outcome: String,
    #[serde(default)]
    traces: Vec<FlowTraceWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowTraceWire {
    #[serde(default)]
    hops: Vec<FlowHopWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowHopWire {
    node: String,
    action: String,
    interface_in: Option<String>,
    interface_out: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AclMatchWire {
    node: String,
    filter: String,
    action: String,
    line_number: Option<u32>,
    line_content: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteEntryWire {
    node: String,
    network: String,
    protocol: String,
    next_hop: Option<String>,
    metric: Option<u64>,
    admin_distance: Option<u32>,
    interface: Option<String>,
}

/// Map engine query rows into the discriminated findings shape.
///
/// Returns a descriptive message on the first row that cannot be
/// mapped; the orchestrator turns that into a FAILED envelope.
pub(crate) fn normalize_findings(
    query_type: QueryType,
    rows: Vec<Value>,
) -> Result<Findings, String> {
    match query_type {
        QueryType::Reachability => rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let wire: FlowResultWire = decode_row("reachability", i, row)?;
                Ok(FlowResult {
                    flow: wire.flow,
                    outcome: wire.outcome,
                    traces: wire
                        .traces
                        .into_iter()
                        .map(|t| FlowTrace {
                            hops: t
                                .hops
                                .into_iter()
                                .map(|h| FlowHop {
                                    node: h.node,
                                    action: h.action,
                                    interface_in: h.interface_in,
                                    interface_out: h.interface_out,
                                })
                                .collect(),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map(Findings::Reachability),

        QueryType::AclFilter => rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let wire: AclMatchWire = decode_row("ACL", i, row)?;
                Ok(AclMatch {
                    node: wire.node,
                    filter: wire.filter,
                    action: wire.action,
                    line_number: wire.line_number,
                    line_content: wire.line_content,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map(Findings::AclFilter),

        QueryType::Routing => rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let wire: RouteEntryWire = decode_row("route", i, row)?;
                Ok(RouteEntry {
                    node: wire.node,
                    network: wire.network,
                    protocol: wire.protocol,
                    next_hop: wire.next_hop,
                    metric: wire.metric,
                    admin_distance: wire.admin_distance,
                    interface: wire.interface,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map(Findings::Routing),
    }
}

fn decode_row<T: serde::de::DeserializeOwned>(
    kind: &str,
    index: usize,
    row: Value,
) -> Result<T, String> {
    serde_json::from_value(row).map_err(|e| format!("{kind} row {index}: {e}"))
}
