//! Mock InventoryClient for unit testing
//!
//! Stores hosts in memory, records every RPC issued and can be primed to fail
//! specific methods, so agent behaviour can be tested without a reconciler.

use crate::error::RpcError;
use crate::inventory_trait::InventoryRpc;
use inventory_types::{
    CpuFact, ErrorKind, Host, HostCreate, HostUpdate, LldpAgentFact, LldpNeighbourFact,
    MemoryFact, NumaNodeFact, PciDeviceFact, PlatformReport, PortFact, RpcMethod,
    TtysDcdResponse, UpsertSummary, normalize_mac,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock InventoryClient for testing
#[derive(Debug, Clone, Default)]
pub struct MockInventoryClient {
    hosts: Arc<Mutex<HashMap<Uuid, Host>>>,
    calls: Arc<Mutex<Vec<RpcMethod>>>,
    failures: Arc<Mutex<HashMap<RpcMethod, VecDeque<ErrorKind>>>>,
    fact_counts: Arc<Mutex<HashMap<RpcMethod, usize>>>,
    last_platform: Arc<Mutex<Option<PlatformReport>>>,
}

impl MockInventoryClient {
    /// Empty mock reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host to the mock store (for test setup)
    pub fn add_host(&self, host: Host) {
        guard(&self.hosts).insert(host.uuid, host);
    }

    /// Drop a host, as if it were deleted server side.
    pub fn remove_host(&self, uuid: Uuid) {
        guard(&self.hosts).remove(&uuid);
    }

    /// Host as the mock reconciler holds it.
    pub fn host(&self, uuid: Uuid) -> Option<Host> {
        guard(&self.hosts).get(&uuid).cloned()
    }

    /// Make the next call to `method` fail with `kind`. Queued failures are consumed in order.
    pub fn fail_next(&self, method: RpcMethod, kind: ErrorKind) {
        guard(&self.failures).entry(method).or_default().push_back(kind);
    }

    /// Every method invoked, in order
    pub fn calls(&self) -> Vec<RpcMethod> {
        guard(&self.calls).clone()
    }

    /// How many times `method` was called.
    pub fn call_count(&self, method: RpcMethod) -> usize {
        guard(&self.calls).iter().filter(|m| **m == method).count()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        guard(&self.calls).clear();
    }

    /// Number of items carried by the last fact update for `method`
    pub fn last_fact_count(&self, method: RpcMethod) -> Option<usize> {
        guard(&self.fact_counts).get(&method).copied()
    }

    /// Report carried by the last platform update.
    pub fn last_platform_report(&self) -> Option<PlatformReport> {
        guard(&self.last_platform).clone()
    }

    fn record(&self, method: RpcMethod) -> Result<(), RpcError> {
        guard(&self.calls).push(method);
        let failure = guard(&self.failures)
            .get_mut(&method)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(kind) => Err(RpcError::from_kind(kind, format!("injected {method} failure"))),
            None => Ok(()),
        }
    }

    fn existing(&self, uuid: Uuid) -> Result<Host, RpcError> {
        self.host(uuid)
            .ok_or_else(|| RpcError::NotFound(format!("host {uuid} not found")))
    }

    fn modify(&self, uuid: Uuid, f: impl FnOnce(&mut Host)) -> Result<Host, RpcError> {
        let mut hosts = guard(&self.hosts);
        let host = hosts
            .get_mut(&uuid)
            .ok_or_else(|| RpcError::NotFound(format!("host {uuid} not found")))?;
        f(host);
        Ok(host.clone())
    }

    fn facts(&self, method: RpcMethod, uuid: Uuid, count: usize) -> Result<UpsertSummary, RpcError> {
        self.record(method)?;
        self.existing(uuid)?;
        guard(&self.fact_counts).insert(method, count);
        Ok(UpsertSummary {
            created: u32::try_from(count).unwrap_or(u32::MAX),
            ..UpsertSummary::default()
        })
    }
}

#[async_trait::async_trait]
impl InventoryRpc for MockInventoryClient {
    async fn get_host_by_macs(&self, macs: &[String]) -> Result<Host, RpcError> {
        self.record(RpcMethod::GetHostByMacs)?;
        let wanted: Vec<String> = macs.iter().map(|m| normalize_mac(m)).collect();
        guard(&self.hosts)
            .values()
            .find(|h| wanted.contains(&h.mgmt_mac))
            .cloned()
            .ok_or_else(|| RpcError::NotFound("no host matches the reported MACs".to_string()))
    }

    async fn get_host_by_hostname(&self, hostname: &str) -> Result<Host, RpcError> {
        self.record(RpcMethod::GetHostByHostname)?;
        guard(&self.hosts)
            .values()
            .find(|h| h.hostname.as_deref() == Some(hostname))
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("host {hostname} not found")))
    }

    async fn create_host(&self, values: HostCreate) -> Result<Host, RpcError> {
        self.record(RpcMethod::CreateHost)?;
        let mac = normalize_mac(&values.mgmt_mac);
        let mut hosts = guard(&self.hosts);
        if let Some(existing) = hosts.values().find(|h| h.mgmt_mac == mac) {
            return Ok(existing.clone());
        }
        let mut host = Host::new(mac);
        host.mgmt_ip = values.mgmt_ip;
        host.hostname = values.hostname;
        host.personality = values.personality;
        hosts.insert(host.uuid, host.clone());
        Ok(host)
    }

    async fn update_host(&self, host_uuid: Uuid, values: HostUpdate) -> Result<Host, RpcError> {
        self.record(RpcMethod::UpdateHost)?;
        self.modify(host_uuid, |h| {
            if let Some(uptime) = values.uptime {
                h.uptime = uptime;
            }
            if values.iscsi_initiator_name.is_some() {
                h.iscsi_initiator_name = values.iscsi_initiator_name;
            }
        })
    }

    async fn configure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.record(RpcMethod::ConfigureHost)?;
        self.existing(host_uuid)
    }

    async fn unconfigure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.record(RpcMethod::UnconfigureHost)?;
        self.existing(host_uuid)
    }

    async fn port_update_by_host(&self, host_uuid: Uuid, ports: Vec<PortFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::PortUpdateByHost, host_uuid, ports.len())
    }

    async fn pci_device_update_by_host(&self, host_uuid: Uuid, devices: Vec<PciDeviceFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::PciDeviceUpdateByHost, host_uuid, devices.len())
    }

    async fn numas_update_by_host(&self, host_uuid: Uuid, nodes: Vec<NumaNodeFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::NumasUpdateByHost, host_uuid, nodes.len())
    }

    async fn cpus_update_by_host(&self, host_uuid: Uuid, cpus: Vec<CpuFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::CpusUpdateByHost, host_uuid, cpus.len())
    }

    async fn memory_update_by_host(&self, host_uuid: Uuid, memory: Vec<MemoryFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::MemoryUpdateByHost, host_uuid, memory.len())
    }

    async fn lldp_agent_update_by_host(&self, host_uuid: Uuid, agents: Vec<LldpAgentFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::LldpAgentUpdateByHost, host_uuid, agents.len())
    }

    async fn lldp_neighbour_update_by_host(&self, host_uuid: Uuid, neighbours: Vec<LldpNeighbourFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::LldpNeighbourUpdateByHost, host_uuid, neighbours.len())
    }

    async fn platform_update_by_host(&self, host_uuid: Uuid, report: PlatformReport) -> Result<Host, RpcError> {
        self.record(RpcMethod::PlatformUpdateByHost)?;
        *guard(&self.last_platform) = Some(report.clone());
        self.modify(host_uuid, |h| {
            if let Some(uptime) = report.uptime_secs {
                h.uptime = uptime;
            }
        })
    }

    async fn subfunctions_update_by_host(&self, host_uuid: Uuid, subfunctions: &str) -> Result<Host, RpcError> {
        self.record(RpcMethod::SubfunctionsUpdateByHost)?;
        self.modify(host_uuid, |h| {
            if h.subfunctions.is_none() {
                h.subfunctions = Some(subfunctions.to_string());
            }
        })
    }

    async fn notify_subfunctions_config(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.record(RpcMethod::NotifySubfunctionsConfig)?;
        self.existing(host_uuid)
    }

    async fn bm_deprovision_by_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.record(RpcMethod::BmDeprovisionByHost)?;
        self.modify(host_uuid, |h| {
            h.bm_type = None;
            h.bm_ip = None;
            h.bm_username = None;
        })
    }

    async fn configure_ttys_dcd(&self, host_uuid: Uuid, ttys_dcd: bool) -> Result<TtysDcdResponse, RpcError> {
        self.record(RpcMethod::ConfigureTtysDcd)?;
        let host = self.modify(host_uuid, |h| h.ttys_dcd = Some(ttys_dcd))?;
        Ok(TtysDcdResponse {
            host_uuid,
            ttys_dcd: host.ttys_dcd,
        })
    }

    async fn get_host_ttys_dcd(&self, host_uuid: Uuid) -> Result<TtysDcdResponse, RpcError> {
        self.record(RpcMethod::GetHostTtysDcd)?;
        let host = self.existing(host_uuid)?;
        Ok(TtysDcdResponse {
            host_uuid,
            ttys_dcd: host.ttys_dcd,
        })
    }
}
