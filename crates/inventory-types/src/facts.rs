//! Hardware fact snapshots.
//!
//! The agent's collectors produce these; the reconciler upserts them as
//! children of a host, keyed by each type's natural key.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// One logical CPU as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuFact {
    /// Logical cpu id (natural key)
    pub cpu: u32,
    pub numa_node: u32,
    pub socket: u32,
    pub core: u32,
    pub thread: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CpuFact {
    /// The part of a cpu that decides whether a topology changed.
    pub fn topology_key(&self) -> (u32, u32, u32, u32, u32) {
        (self.cpu, self.numa_node, self.socket, self.core, self.thread)
    }
}

/// Role a logical CPU is allocated to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CpuFunction {
    Platform,
    Vswitch,
    Shared,
    Application,
}

/// Per NUMA node memory totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub numa_node: u32,
    pub total_mib: u64,
    pub available_mib: u64,
    #[serde(default)]
    pub hugepages_2m_total: u64,
    #[serde(default)]
    pub hugepages_1g_total: u64,
    #[serde(default)]
    pub platform_reserved_mib: u64,
}

/// NUMA node present on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumaNodeFact {
    pub numa_node: u32,
}

/// Ethernet port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortFact {
    pub name: String,
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mbps: Option<u32>,
    #[serde(default)]
    pub link_up: bool,
    #[serde(default)]
    pub mtu: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numa_node: Option<u32>,
}

/// PCI device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciDeviceFact {
    /// e.g. `0000:00:1f.6` (natural key)
    pub pci_address: String,
    pub class_id: String,
    pub vendor_id: String,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numa_node: Option<u32>,
    #[serde(default)]
    pub sriov_totalvfs: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Local LLDP agent state for one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpAgentFact {
    pub port_name: String,
    pub status: String,
    pub chassis_id: String,
    pub port_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    #[serde(default)]
    pub ttl: u32,
}

/// A neighbour heard on a local port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpNeighbourFact {
    pub port_name: String,
    pub chassis_id: String,
    pub port_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
    #[serde(default)]
    pub ttl: u32,
}

impl LldpNeighbourFact {
    /// MSAP identifier: chassis id plus port id.
    pub fn msap(&self) -> String {
        format!("{},{}", self.chassis_id, self.port_identifier)
    }
}

/// Platform-level report sent alongside (or after) the fact snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformReport {
    /// True on the first report after the platform-ready sentinel appears
    #[serde(default)]
    pub first_report: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_state: Option<crate::host::InstallState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscsi_initiator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

/// Everything the agent sends on a full report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSnapshot {
    pub ports: Vec<PortFact>,
    pub pci_devices: Vec<PciDeviceFact>,
    pub numa_nodes: Vec<NumaNodeFact>,
    pub cpus: Vec<CpuFact>,
    pub memory: Vec<MemoryFact>,
    pub lldp_agents: Vec<LldpAgentFact>,
    pub lldp_neighbours: Vec<LldpNeighbourFact>,
}

impl FactSnapshot {
    /// True when hyperthreading siblings are present.
    pub fn hyperthreaded(&self) -> bool {
        is_hyperthreaded(&self.cpus)
    }
}

/// Any physical core carrying more than one thread.
pub fn is_hyperthreaded(cpus: &[CpuFact]) -> bool {
    cpus.iter().any(|c| c.thread > 0)
}
