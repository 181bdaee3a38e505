//! Agent ↔ reconciler RPC envelopes.
//!
//! Every method is carried as `POST /v1/rpc/{method}` with one of the request
//! bodies below. Failures come back as an [`ErrorBody`].

use crate::facts::{
    CpuFact, LldpAgentFact, LldpNeighbourFact, MemoryFact, NumaNodeFact, PciDeviceFact, PortFact,
    PlatformReport,
};
use crate::host::HostUpdate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

/// RPC method names as they appear on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RpcMethod {
    GetHostByMacs,
    GetHostByHostname,
    CreateHost,
    UpdateHost,
    ConfigureHost,
    UnconfigureHost,
    PortUpdateByHost,
    PciDeviceUpdateByHost,
    NumasUpdateByHost,
    CpusUpdateByHost,
    MemoryUpdateByHost,
    LldpAgentUpdateByHost,
    LldpNeighbourUpdateByHost,
    PlatformUpdateByHost,
    SubfunctionsUpdateByHost,
    NotifySubfunctionsConfig,
    BmDeprovisionByHost,
    ConfigureTtysDcd,
    GetHostTtysDcd,
}

/// Request for `get_host_by_macs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetHostByMacs {
    pub macs: Vec<String>,
}

/// Request for `get_host_by_hostname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetHostByHostname {
    pub hostname: String,
}

/// Request naming a host and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef {
    pub host_uuid: Uuid,
}

/// Reported fields of one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateHost {
    pub host_uuid: Uuid,
    pub values: HostUpdate,
}

/// A full set of one fact category for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactUpdate<T> {
    pub host_uuid: Uuid,
    pub items: Vec<T>,
}

impl<T> FactUpdate<T> {
    /// Update carrying `items` for one host.
    pub fn new(host_uuid: Uuid, items: Vec<T>) -> Self {
        Self { host_uuid, items }
    }
}

/// Port update.
pub type PortUpdate = FactUpdate<PortFact>;
/// PCI device update.
pub type PciDeviceUpdate = FactUpdate<PciDeviceFact>;
/// NUMA node update.
pub type NumaUpdate = FactUpdate<NumaNodeFact>;
/// CPU update.
pub type CpuUpdate = FactUpdate<CpuFact>;
/// Memory update.
pub type MemoryUpdate = FactUpdate<MemoryFact>;
/// LLDP agent update.
pub type LldpAgentUpdate = FactUpdate<LldpAgentFact>;
/// LLDP neighbour update.
pub type LldpNeighbourUpdate = FactUpdate<LldpNeighbourFact>;

/// Platform report of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUpdate {
    pub host_uuid: Uuid,
    pub report: PlatformReport,
}

/// Subfunctions the host reports for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubfunctionsUpdate {
    pub host_uuid: Uuid,
    pub subfunctions: String,
}

/// Desired carrier-detect setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtysDcdRequest {
    pub host_uuid: Uuid,
    pub ttys_dcd: bool,
}

/// Stored carrier-detect setting of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtysDcdResponse {
    pub host_uuid: Uuid,
    pub ttys_dcd: Option<bool>,
}

/// Row counts touched by a fact upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub unchanged: u32,
}

impl UpsertSummary {
    /// Rows written to the store.
    pub fn writes(&self) -> u32 {
        self.created + self.updated + self.deleted
    }
}

/// Error taxonomy shared by the RPC and REST surfaces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Timeout,
    External,
    Internal,
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
