//! InventoryRpc trait for mocking
//!
//! The agent talks to the reconciler only through this trait. The reqwest
//! client implements it, and tests use the in-memory mock.

use crate::error::RpcError;
use inventory_types::{
    CpuFact, Host, HostCreate, HostUpdate, LldpAgentFact, LldpNeighbourFact, MemoryFact,
    NumaNodeFact, PciDeviceFact, PlatformReport, PortFact, TtysDcdResponse, UpsertSummary,
};
use uuid::Uuid;

/// Reconciler RPC surface as seen by a host agent
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait InventoryRpc: Send + Sync {
    // Host identity
    async fn get_host_by_macs(&self, macs: &[String]) -> Result<Host, RpcError>;
    async fn get_host_by_hostname(&self, hostname: &str) -> Result<Host, RpcError>;
    async fn create_host(&self, values: HostCreate) -> Result<Host, RpcError>;
    async fn update_host(&self, host_uuid: Uuid, values: HostUpdate) -> Result<Host, RpcError>;
    async fn configure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError>;
    async fn unconfigure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError>;

    // Fact reconciliation
    async fn port_update_by_host(&self, host_uuid: Uuid, ports: Vec<PortFact>) -> Result<UpsertSummary, RpcError>;
    async fn pci_device_update_by_host(&self, host_uuid: Uuid, devices: Vec<PciDeviceFact>) -> Result<UpsertSummary, RpcError>;
    async fn numas_update_by_host(&self, host_uuid: Uuid, nodes: Vec<NumaNodeFact>) -> Result<UpsertSummary, RpcError>;
    async fn cpus_update_by_host(&self, host_uuid: Uuid, cpus: Vec<CpuFact>) -> Result<UpsertSummary, RpcError>;
    async fn memory_update_by_host(&self, host_uuid: Uuid, memory: Vec<MemoryFact>) -> Result<UpsertSummary, RpcError>;
    async fn lldp_agent_update_by_host(&self, host_uuid: Uuid, agents: Vec<LldpAgentFact>) -> Result<UpsertSummary, RpcError>;
    async fn lldp_neighbour_update_by_host(&self, host_uuid: Uuid, neighbours: Vec<LldpNeighbourFact>) -> Result<UpsertSummary, RpcError>;

    // Platform and lifecycle hooks
    async fn platform_update_by_host(&self, host_uuid: Uuid, report: PlatformReport) -> Result<Host, RpcError>;
    async fn subfunctions_update_by_host(&self, host_uuid: Uuid, subfunctions: &str) -> Result<Host, RpcError>;
    async fn notify_subfunctions_config(&self, host_uuid: Uuid) -> Result<Host, RpcError>;
    async fn bm_deprovision_by_host(&self, host_uuid: Uuid) -> Result<Host, RpcError>;

    // Serial console carrier detect
    async fn configure_ttys_dcd(&self, host_uuid: Uuid, ttys_dcd: bool) -> Result<TtysDcdResponse, RpcError>;
    async fn get_host_ttys_dcd(&self, host_uuid: Uuid) -> Result<TtysDcdResponse, RpcError>;
}
