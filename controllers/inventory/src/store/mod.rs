//! Canonical in-process store.
//!
//! Hosts and their child fact rows live behind one `RwLock`; every upsert
//! runs inside a single write section. A write counter records how many rows
//! were touched so idempotency is observable.

pub mod upsert;

use crate::error::ControllerError;
use inventory_types::{
    CpuFact, CpuFunction, Host, LldpAgentFact, LldpNeighbourFact, MemoryFact, NumaNodeFact,
    PciDeviceFact, PortFact, normalize_mac,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// A logical CPU with its allocated role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuRecord {
    #[serde(flatten)]
    pub fact: CpuFact,
    pub function: CpuFunction,
}

/// Child fact rows of one host, keyed by natural key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostFacts {
    /// By MAC
    pub ports: BTreeMap<String, PortFact>,
    /// By PCI address
    pub pci_devices: BTreeMap<String, PciDeviceFact>,
    pub numa_nodes: BTreeMap<u32, NumaNodeFact>,
    /// By logical cpu id
    pub cpus: BTreeMap<u32, CpuRecord>,
    /// By NUMA node
    pub memory: BTreeMap<u32, MemoryFact>,
    /// By local port name
    pub lldp_agents: BTreeMap<String, LldpAgentFact>,
    /// By (local port name, MSAP)
    #[serde(skip)]
    pub lldp_neighbours: BTreeMap<(String, String), LldpNeighbourFact>,
}

/// A host record and the facts reported for it.
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub host: Host,
    pub facts: HostFacts,
}

/// Store contents behind the lock.
#[derive(Debug, Default)]
pub struct StoreInner {
    hosts: HashMap<Uuid, HostEntry>,
    writes: u64,
}

impl StoreInner {
    /// Entry of one host.
    pub fn entry(&self, uuid: Uuid) -> Result<&HostEntry, ControllerError> {
        self.hosts
            .get(&uuid)
            .ok_or_else(|| ControllerError::host_not_found(uuid))
    }

    /// Mutable entry of one host.
    pub fn entry_mut(&mut self, uuid: Uuid) -> Result<&mut HostEntry, ControllerError> {
        self.hosts
            .get_mut(&uuid)
            .ok_or_else(|| ControllerError::host_not_found(uuid))
    }

    /// Record of one host.
    pub fn host(&self, uuid: Uuid) -> Result<&Host, ControllerError> {
        self.entry(uuid).map(|e| &e.host)
    }

    /// Every host, in no particular order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values().map(|e| &e.host)
    }

    /// UUIDs of every host.
    pub fn host_ids(&self) -> Vec<Uuid> {
        self.hosts.keys().copied().collect()
    }

    /// First host whose management MAC, or any port MAC, is in `macs`.
    pub fn find_by_macs(&self, macs: &[String]) -> Option<&Host> {
        let wanted: Vec<String> = macs.iter().map(|m| normalize_mac(m)).collect();
        self.hosts
            .values()
            .find(|e| wanted.contains(&e.host.mgmt_mac))
            .or_else(|| {
                self.hosts
                    .values()
                    .find(|e| e.facts.ports.keys().any(|mac| wanted.contains(mac)))
            })
            .map(|e| &e.host)
    }

    /// Host whose hostname is `hostname`.
    pub fn find_by_hostname(&self, hostname: &str) -> Option<&Host> {
        self.hosts()
            .find(|h| h.hostname.as_deref() == Some(hostname))
    }

    /// Host owning a port with this MAC
    pub fn port_owner(&self, mac: &str) -> Option<Uuid> {
        self.hosts
            .values()
            .find(|e| e.facts.ports.contains_key(mac))
            .map(|e| e.host.uuid)
    }

    /// Add a host with no facts.
    pub fn insert(&mut self, host: Host) {
        self.writes += 1;
        self.hosts.insert(
            host.uuid,
            HostEntry {
                host,
                facts: HostFacts::default(),
            },
        );
    }

    /// Replace the host record, counting one write when it changed.
    pub fn save_host(&mut self, mut host: Host) -> Result<Host, ControllerError> {
        let entry = self.entry_mut(host.uuid)?;
        if entry.host == host {
            return Ok(host);
        }
        host.updated_at = chrono::Utc::now();
        entry.host = host.clone();
        self.writes += 1;
        Ok(host)
    }

    /// Remove a host with its facts.
    pub fn remove(&mut self, uuid: Uuid) -> Result<HostEntry, ControllerError> {
        let entry = self
            .hosts
            .remove(&uuid)
            .ok_or_else(|| ControllerError::host_not_found(uuid))?;
        self.writes += 1;
        Ok(entry)
    }

    /// Count rows written by a fact reconciliation.
    pub fn record_writes(&mut self, rows: u32) {
        self.writes += u64::from(rows);
    }

    /// Total writes counted so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

/// In-memory host store.
#[derive(Debug, Default)]
pub struct InventoryStore {
    inner: RwLock<StoreInner>,
}

impl InventoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read access.
    pub async fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().await
    }

    /// Exclusive write access. Hold it across read-modify-write sections.
    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().await
    }

    /// Copy of one host record.
    pub async fn host(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        self.read().await.host(uuid).cloned()
    }

    /// Copy of the facts reported for one host.
    pub async fn facts(&self, uuid: Uuid) -> Result<HostFacts, ControllerError> {
        self.read().await.entry(uuid).map(|e| e.facts.clone())
    }

    /// All hosts, oldest first.
    pub async fn list(&self) -> Vec<Host> {
        let mut hosts: Vec<Host> = self.read().await.hosts().cloned().collect();
        hosts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        hosts
    }

    /// Replace one host record.
    pub async fn save_host(&self, host: Host) -> Result<Host, ControllerError> {
        self.write().await.save_host(host)
    }

    /// Writes since startup. Unchanged records are not counted.
    pub async fn writes(&self) -> u64 {
        self.read().await.writes()
    }
}
