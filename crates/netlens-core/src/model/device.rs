// ── Device and interface domain types ──

use serde::{Deserialize, Serialize};

/// Device vendor, normalized from engine node properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Vendor {
    Cisco,
    Juniper,
    Arista,
    PaloAlto,
    Unknown,
}

/// Device role in the topology, inferred when the engine doesn't say.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum DeviceType {
    Router,
    Switch,
    Firewall,
    LoadBalancer,
    Unknown,
}

/// A network interface, owned by exactly one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Owning device hostname -- always equals the parent `Device::hostname`.
    pub hostname: String,
    pub name: String,
    pub active: bool,
    /// CIDR strings assigned to the interface.
    pub ip_addresses: Vec<String>,
    pub vlan: Option<u16>,
    pub description: Option<String>,
    /// Bandwidth in Mbps.
    pub bandwidth: Option<u64>,
    pub mtu: Option<u32>,
}

/// A device in the derived topology.
///
/// Read-only: recomputed on every aggregation call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    pub vendor: Vendor,
    pub device_type: DeviceType,
    pub model: Option<String>,
    pub os_version: Option<String>,
    /// Configuration dialect the engine recognized (e.g. `CISCO_IOS`).
    pub config_format: Option<String>,
    pub interfaces: Vec<Interface>,
}
