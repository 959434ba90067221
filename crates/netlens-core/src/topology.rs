// ── Topology aggregation ──
//
// Joins the engine's three independent result sets (node properties,
// interface properties, layer-3 edges) into one consistent graph. The
// sets carry no referential-integrity guarantee, so every cross-set
// lookup is defensive: orphaned interfaces and dangling edges are
// dropped and logged, never surfaced.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use netlens_engine::types::{EdgeRow, InterfaceRow, NodeRow};

use crate::convert::parse_vendor;
use crate::error::CoreError;
use crate::gateway::EngineGateway;
use crate::model::{Device, DeviceType, Edge, Interface};
use crate::registry::SnapshotRegistry;

/// The derived device/link graph for one snapshot. Stateless value;
/// recomputed per call, cached (if at all) by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub devices: Vec<Device>,
    pub edges: Vec<Edge>,
}

// ── Device type inference ────────────────────────────────────────────

/// Ordered heuristics for classifying a device when the engine's node
/// properties don't say. Tunable policy, not semantics: the defaults
/// cover common naming and model conventions, and embedders can swap
/// in their own tables.
#[derive(Debug, Clone)]
pub struct TypeHeuristics {
    /// Hostname tokens and model prefixes per type, checked in order;
    /// first match wins.
    rules: Vec<(DeviceType, Vec<&'static str>, Vec<&'static str>)>,
}

impl Default for TypeHeuristics {
    fn default() -> Self {
        Self {
            rules: vec![
                (
                    DeviceType::Firewall,
                    vec!["fw", "firewall", "asa", "srx", "pan"],
                    vec!["ASA", "PA-", "SRX", "FTD"],
                ),
                (
                    DeviceType::LoadBalancer,
                    vec!["lb", "balancer", "f5", "slb"],
                    vec!["BIG-IP", "F5-"],
                ),
                (
                    DeviceType::Router,
                    vec!["rtr", "router", "gw"],
                    vec!["ISR", "ASR", "CSR", "MX"],
                ),
                (
                    DeviceType::Switch,
                    vec!["sw", "switch", "leaf", "spine"],
                    vec!["EX", "QFX", "WS-C", "N9K", "DCS-"],
                ),
            ],
        }
    }
}

impl TypeHeuristics {
    /// Build a custom rule table. Rules are `(type, hostname tokens,
    /// model prefixes)`, checked in order; first match wins.
    pub fn new(rules: Vec<(DeviceType, Vec<&'static str>, Vec<&'static str>)>) -> Self {
        Self { rules }
    }

    /// Best-effort classification. Never fails: unmatched input always
    /// resolves to [`DeviceType::Unknown`].
    pub fn infer(&self, hostname: &str, model: Option<&str>, interfaces: &[Interface]) -> DeviceType {
        let tokens: Vec<String> = hostname
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        for (device_type, name_tokens, _) in &self.rules {
            if tokens.iter().any(|t| name_tokens.contains(&t.as_str())) {
                return *device_type;
            }
        }

        if let Some(model) = model {
            let upper = model.to_ascii_uppercase();
            for (device_type, _, model_prefixes) in &self.rules {
                if model_prefixes.iter().any(|p| upper.starts_with(p)) {
                    return *device_type;
                }
            }
        }

        // A device whose routed addresses all sit on VLAN interfaces is
        // almost certainly a switch.
        let has_vlan = interfaces.iter().any(|i| is_vlan_interface(&i.name));
        let routes_outside_vlans = interfaces
            .iter()
            .any(|i| !i.ip_addresses.is_empty() && !is_vlan_interface(&i.name));
        if has_vlan && !routes_outside_vlans {
            return DeviceType::Switch;
        }

        DeviceType::Unknown
    }
}

fn is_vlan_interface(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("vlan") || lower.starts_with("irb")
}

// ── Pure join ────────────────────────────────────────────────────────

/// Join the three result sets into a graph.
///
/// Pure function of its inputs: aggregating the same rows twice yields
/// identical output (devices sorted by hostname, interfaces by name,
/// edges canonical and deduplicated).
pub fn build_topology(
    nodes: Vec<NodeRow>,
    interfaces: Vec<InterfaceRow>,
    edges: Vec<EdgeRow>,
    heuristics: &TypeHeuristics,
) -> Topology {
    // 1. Devices keyed by hostname; engine-declared type remembered for
    //    later, missing vendor defaults to UNKNOWN.
    let mut devices: BTreeMap<String, (Device, Option<DeviceType>)> = BTreeMap::new();
    for row in nodes {
        let declared = row.device_type.as_deref().and_then(|s| s.parse().ok());
        let device = Device {
            hostname: row.node.clone(),
            vendor: parse_vendor(row.vendor.as_deref(), row.config_format.as_deref()),
            device_type: DeviceType::Unknown,
            model: row.model,
            os_version: row.os_version,
            config_format: row.config_format,
            interfaces: Vec::new(),
        };
        devices.insert(row.node, (device, declared));
    }

    // 2. Attach interfaces; an interface referencing an unknown hostname
    //    is dropped.
    for row in interfaces {
        match devices.get_mut(&row.node) {
            Some((device, _)) => device.interfaces.push(Interface::from(row)),
            None => {
                warn!(
                    node = %row.node,
                    interface = %row.interface,
                    "dropping interface for unknown device"
                );
            }
        }
    }

    // 3. Resolve device types and fix interface ordering.
    let mut resolved: BTreeMap<String, Device> = BTreeMap::new();
    for (hostname, (mut device, declared)) in devices {
        device.interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        let inferred = declared.unwrap_or_else(|| {
            heuristics.infer(&device.hostname, device.model.as_deref(), &device.interfaces)
        });
        device.device_type = inferred;
        resolved.insert(hostname, device);
    }

    // 4. Edges: canonical order, dedup by identity, both endpoints must
    //    resolve to an interface that exists in the joined device set.
    let known: HashSet<(&str, &str)> = resolved
        .values()
        .flat_map(|d| {
            d.interfaces
                .iter()
                .map(|i| (d.hostname.as_str(), i.name.as_str()))
        })
        .collect();

    let mut unique: BTreeSet<Edge> = BTreeSet::new();
    for row in edges {
        if !known.contains(&(row.node.as_str(), row.interface.as_str()))
            || !known.contains(&(row.remote_node.as_str(), row.remote_interface.as_str()))
        {
            warn!(
                source = %row.node,
                source_interface = %row.interface,
                dest = %row.remote_node,
                dest_interface = %row.remote_interface,
                "dropping edge with unresolved endpoint"
            );
            continue;
        }
        unique.insert(Edge::canonical(
            row.node,
            row.interface,
            row.remote_node,
            row.remote_interface,
            row.ip,
            row.remote_ip,
        ));
    }

    debug!(
        devices = resolved.len(),
        edges = unique.len(),
        "topology aggregated"
    );

    Topology {
        devices: resolved.into_values().collect(),
        edges: unique.into_iter().collect(),
    }
}

// ── Service ──────────────────────────────────────────────────────────

/// Read-side facade: fetches the result sets through the gateway and
/// aggregates them for a COMPLETE snapshot.
pub struct TopologyService {
    gateway: Arc<dyn EngineGateway>,
    registry: Arc<SnapshotRegistry>,
    heuristics: TypeHeuristics,
}

impl TopologyService {
    pub fn new(gateway: Arc<dyn EngineGateway>, registry: Arc<SnapshotRegistry>) -> Self {
        Self {
            gateway,
            registry,
            heuristics: TypeHeuristics::default(),
        }
    }

    /// Replace the default device-type inference tables.
    pub fn with_heuristics(mut self, heuristics: TypeHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// The full device/link graph for a COMPLETE snapshot.
    ///
    /// All three result sets are fetched concurrently; any fetch error
    /// fails the whole call -- no partially constructed graph.
    pub async fn topology(&self, network: &str, name: &str) -> Result<Topology, CoreError> {
        self.registry.expect_complete(network, name)?;

        let (nodes, interfaces, edges) = tokio::join!(
            self.gateway.node_properties(network, name),
            self.gateway.interface_properties(network, name, None),
            self.gateway.layer3_edges(network, name),
        );

        Ok(build_topology(nodes?, interfaces?, edges?, &self.heuristics))
    }

    /// Devices (with their interfaces) only, no edge extraction.
    pub async fn devices(&self, network: &str, name: &str) -> Result<Vec<Device>, CoreError> {
        self.registry.expect_complete(network, name)?;

        let (nodes, interfaces) = tokio::join!(
            self.gateway.node_properties(network, name),
            self.gateway.interface_properties(network, name, None),
        );

        Ok(build_topology(nodes?, interfaces?, Vec::new(), &self.heuristics).devices)
    }

    /// Interface rows, optionally filtered to one device (engine-side).
    pub async fn interfaces(
        &self,
        network: &str,
        name: &str,
        hostname: Option<&str>,
    ) -> Result<Vec<Interface>, CoreError> {
        self.registry.expect_complete(network, name)?;

        let rows = self
            .gateway
            .interface_properties(network, name, hostname)
            .await?;
        Ok(rows.into_iter().map(Interface::from).collect())
    }
}
