//! Inventory reconciler client
//!
//! JSON over HTTP: each RPC is `POST /v1/rpc/{method}` with a method-specific body.

use crate::common::HttpClient;
use crate::error::RpcError;
use crate::inventory_trait::InventoryRpc;
use inventory_types::{
    CpuFact, FactUpdate, GetHostByHostname, GetHostByMacs, Host, HostCreate, HostRef, HostUpdate,
    LldpAgentFact, LldpNeighbourFact, MemoryFact, NumaNodeFact, PciDeviceFact, PlatformReport,
    PlatformUpdate, PortFact, RpcMethod, SubfunctionsUpdate, TtysDcdRequest, TtysDcdResponse,
    UpdateHost, UpsertSummary,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Inventory reconciler RPC client
#[derive(Debug)]
pub struct InventoryClient {
    http: HttpClient,
}

impl InventoryClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - reconciler base URL (e.g., "http://inventory:6385")
    /// * `timeout` - per-call bound; an expired call surfaces as [`RpcError::Timeout`]
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::Http)?;

        debug!("Inventory client targeting {} (timeout {:?})", base_url, timeout);
        Ok(Self {
            http: HttpClient::new(client, base_url),
        })
    }

    /// Reconciler base URL.
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn facts<T: serde::Serialize + Send + Sync>(
        &self,
        method: RpcMethod,
        host_uuid: Uuid,
        items: Vec<T>,
    ) -> Result<UpsertSummary, RpcError> {
        self.http
            .call(method, &FactUpdate::new(host_uuid, items))
            .await
    }
}

#[async_trait::async_trait]
impl InventoryRpc for InventoryClient {
    async fn get_host_by_macs(&self, macs: &[String]) -> Result<Host, RpcError> {
        let body = GetHostByMacs {
            macs: macs.to_vec(),
        };
        self.http.call(RpcMethod::GetHostByMacs, &body).await
    }

    async fn get_host_by_hostname(&self, hostname: &str) -> Result<Host, RpcError> {
        let body = GetHostByHostname {
            hostname: hostname.to_string(),
        };
        self.http.call(RpcMethod::GetHostByHostname, &body).await
    }

    async fn create_host(&self, values: HostCreate) -> Result<Host, RpcError> {
        self.http.call(RpcMethod::CreateHost, &values).await
    }

    async fn update_host(&self, host_uuid: Uuid, values: HostUpdate) -> Result<Host, RpcError> {
        let body = UpdateHost { host_uuid, values };
        self.http.call(RpcMethod::UpdateHost, &body).await
    }

    async fn configure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.http
            .call(RpcMethod::ConfigureHost, &HostRef { host_uuid })
            .await
    }

    async fn unconfigure_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.http
            .call(RpcMethod::UnconfigureHost, &HostRef { host_uuid })
            .await
    }

    async fn port_update_by_host(&self, host_uuid: Uuid, ports: Vec<PortFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::PortUpdateByHost, host_uuid, ports).await
    }

    async fn pci_device_update_by_host(&self, host_uuid: Uuid, devices: Vec<PciDeviceFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::PciDeviceUpdateByHost, host_uuid, devices).await
    }

    async fn numas_update_by_host(&self, host_uuid: Uuid, nodes: Vec<NumaNodeFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::NumasUpdateByHost, host_uuid, nodes).await
    }

    async fn cpus_update_by_host(&self, host_uuid: Uuid, cpus: Vec<CpuFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::CpusUpdateByHost, host_uuid, cpus).await
    }

    async fn memory_update_by_host(&self, host_uuid: Uuid, memory: Vec<MemoryFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::MemoryUpdateByHost, host_uuid, memory).await
    }

    async fn lldp_agent_update_by_host(&self, host_uuid: Uuid, agents: Vec<LldpAgentFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::LldpAgentUpdateByHost, host_uuid, agents).await
    }

    async fn lldp_neighbour_update_by_host(&self, host_uuid: Uuid, neighbours: Vec<LldpNeighbourFact>) -> Result<UpsertSummary, RpcError> {
        self.facts(RpcMethod::LldpNeighbourUpdateByHost, host_uuid, neighbours)
            .await
    }

    async fn platform_update_by_host(&self, host_uuid: Uuid, report: PlatformReport) -> Result<Host, RpcError> {
        let body = PlatformUpdate { host_uuid, report };
        self.http.call(RpcMethod::PlatformUpdateByHost, &body).await
    }

    async fn subfunctions_update_by_host(&self, host_uuid: Uuid, subfunctions: &str) -> Result<Host, RpcError> {
        let body = SubfunctionsUpdate {
            host_uuid,
            subfunctions: subfunctions.to_string(),
        };
        self.http.call(RpcMethod::SubfunctionsUpdateByHost, &body).await
    }

    async fn notify_subfunctions_config(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.http
            .call(RpcMethod::NotifySubfunctionsConfig, &HostRef { host_uuid })
            .await
    }

    async fn bm_deprovision_by_host(&self, host_uuid: Uuid) -> Result<Host, RpcError> {
        self.http
            .call(RpcMethod::BmDeprovisionByHost, &HostRef { host_uuid })
            .await
    }

    async fn configure_ttys_dcd(&self, host_uuid: Uuid, ttys_dcd: bool) -> Result<TtysDcdResponse, RpcError> {
        let body = TtysDcdRequest {
            host_uuid,
            ttys_dcd,
        };
        self.http.call(RpcMethod::ConfigureTtysDcd, &body).await
    }

    async fn get_host_ttys_dcd(&self, host_uuid: Uuid) -> Result<TtysDcdResponse, RpcError> {
        self.http
            .call(RpcMethod::GetHostTtysDcd, &HostRef { host_uuid })
            .await
    }
}
