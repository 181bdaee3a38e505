//! Set reconciliation of hardware facts.
//!
//! Every method resolves the host first (unknown host is not-found), then
//! reconciles one child table inside a single write section.

use super::Reconciler;
use crate::error::ControllerError;
use crate::store::upsert::{Missing, reconcile_set};
use inventory_types::{
    LldpAgentFact, LldpNeighbourFact, MemoryFact, NumaNodeFact, PciDeviceFact, PortFact,
    UpsertSummary, normalize_mac,
};
use tracing::{debug, warn};
use uuid::Uuid;

impl Reconciler {
    /// Ports are keyed by MAC. A MAC already owned by another host is skipped.
    pub async fn port_update_by_host(&self, uuid: Uuid, ports: Vec<PortFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        inner.entry(uuid)?;

        let mut accepted = Vec::with_capacity(ports.len());
        for mut port in ports {
            port.mac = normalize_mac(&port.mac);
            match inner.port_owner(&port.mac) {
                Some(owner) if owner != uuid => {
                    warn!(
                        "port {} MAC {} already belongs to host {}, skipping",
                        port.name, port.mac, owner
                    );
                }
                _ => accepted.push((port.mac.clone(), port)),
            }
        }

        let summary = reconcile_set(&mut inner.entry_mut(uuid)?.facts.ports, accepted, Missing::Keep);
        inner.record_writes(summary.writes());
        debug!("ports for {}: {:?}", uuid, summary);
        Ok(summary)
    }

    /// Devices keyed by PCI address. Missing devices are kept.
    pub async fn pci_device_update_by_host(&self, uuid: Uuid, devices: Vec<PciDeviceFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let incoming = devices.into_iter().map(|d| (d.pci_address.clone(), d));
        let summary = reconcile_set(&mut inner.entry_mut(uuid)?.facts.pci_devices, incoming, Missing::Keep);
        inner.record_writes(summary.writes());
        debug!("pci devices for {}: {:?}", uuid, summary);
        Ok(summary)
    }

    /// Nodes keyed by NUMA index. Missing nodes are kept.
    pub async fn numas_update_by_host(&self, uuid: Uuid, nodes: Vec<NumaNodeFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let incoming = nodes.into_iter().map(|n| (n.numa_node, n));
        let summary = reconcile_set(&mut inner.entry_mut(uuid)?.facts.numa_nodes, incoming, Missing::Keep);
        inner.record_writes(summary.writes());
        Ok(summary)
    }

    /// Memory is keyed by NUMA node.
    pub async fn memory_update_by_host(&self, uuid: Uuid, memory: Vec<MemoryFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let incoming = memory.into_iter().map(|m| (m.numa_node, m));
        let summary = reconcile_set(&mut inner.entry_mut(uuid)?.facts.memory, incoming, Missing::Keep);
        inner.record_writes(summary.writes());
        debug!("memory for {}: {:?}", uuid, summary);
        Ok(summary)
    }

    /// Agents keyed by local port. Missing agents are kept.
    pub async fn lldp_agent_update_by_host(&self, uuid: Uuid, agents: Vec<LldpAgentFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let incoming = agents.into_iter().map(|a| (a.port_name.clone(), a));
        let summary = reconcile_set(&mut inner.entry_mut(uuid)?.facts.lldp_agents, incoming, Missing::Keep);
        inner.record_writes(summary.writes());
        Ok(summary)
    }

    /// Neighbours are keyed by local port and MSAP; those not reported are deleted.
    pub async fn lldp_neighbour_update_by_host(&self, uuid: Uuid, neighbours: Vec<LldpNeighbourFact>) -> Result<UpsertSummary, ControllerError> {
        let mut inner = self.store.write().await;
        let incoming = neighbours
            .into_iter()
            .map(|n| ((n.port_name.clone(), n.msap()), n));
        let summary = reconcile_set(
            &mut inner.entry_mut(uuid)?.facts.lldp_neighbours,
            incoming,
            Missing::Evict,
        );
        inner.record_writes(summary.writes());
        debug!("lldp neighbours for {}: {:?}", uuid, summary);
        Ok(summary)
    }
}
