//! Test utilities for unit testing the reconciler, lifecycle engine and audits
//!
//! `harness()` wires every component against recording coordinator mocks and
//! an empty store.

#[cfg(test)]
use crate::audit::Auditor;
#[cfg(test)]
use crate::config::InventoryConfig;
#[cfg(test)]
use crate::identity::ControllerIdentity;
#[cfg(test)]
use crate::lifecycle::LifecycleEngine;
#[cfg(test)]
use crate::locks::HostLocks;
#[cfg(test)]
use crate::metrics::InventoryMetrics;
#[cfg(test)]
use crate::notify::Notifier;
#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use crate::store::InventoryStore;
#[cfg(test)]
use coordinator_client::{MockMtce, MockQuorum, MockVim};
#[cfg(test)]
use inventory_types::{Availability, CpuFact, Host, Personality, PortFact};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(test)]
static NEXT_HOST: AtomicU32 = AtomicU32::new(1);

/// Every component of the controller, sharing one store.
#[cfg(test)]
pub struct Harness {
    pub mtce: MockMtce,
    pub vim: MockVim,
    pub quorum: MockQuorum,
    pub config: Arc<InventoryConfig>,
    pub store: Arc<InventoryStore>,
    pub identity: Arc<ControllerIdentity>,
    pub locks: Arc<HostLocks>,
    pub metrics: InventoryMetrics,
    pub reconciler: Reconciler,
    pub lifecycle: LifecycleEngine,
    pub auditor: Auditor,
}

#[cfg(test)]
pub fn harness() -> Harness {
    harness_with(InventoryConfig::default())
}

/// Harness over `config`; the identity is `config.hostname`.
#[cfg(test)]
pub fn harness_with(config: InventoryConfig) -> Harness {
    let mtce = MockMtce::new();
    let vim = MockVim::new();
    let quorum = MockQuorum::default();
    let config = Arc::new(config);
    let store = Arc::new(InventoryStore::new());
    let identity = Arc::new(ControllerIdentity::with_hostname(config.hostname.clone()));
    let locks = Arc::new(HostLocks::new());
    let metrics = InventoryMetrics::new().expect("metrics registry");
    let notifier = Notifier::new(
        &config,
        Arc::new(mtce.clone()),
        Arc::new(vim.clone()),
        Arc::new(quorum.clone()),
    );

    let reconciler = Reconciler::new(store.clone(), notifier.clone(), config.clone(), locks.clone());
    let lifecycle = LifecycleEngine::new(
        reconciler.clone(),
        identity.clone(),
        locks.clone(),
        metrics.clone(),
    );
    let auditor = Auditor::new(
        store.clone(),
        notifier,
        locks.clone(),
        config.clone(),
        metrics.clone(),
    );

    Harness {
        mtce,
        vim,
        quorum,
        config,
        store,
        identity,
        locks,
        metrics,
        reconciler,
        lifecycle,
        auditor,
    }
}

#[cfg(test)]
impl Harness {
    /// Insert a locked, online host with every identity field bound but not
    /// yet provisioned. Nothing is sent to the coordinators.
    pub async fn bound_host(&self, hostname: &str, personality: Personality) -> Host {
        let n = NEXT_HOST.fetch_add(1, Ordering::Relaxed);
        let mut host = Host::new(format!("08:00:27:{:02x}:{:02x}:{:02x}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff));
        host.hostname = Some(hostname.to_string());
        host.personality = Some(personality);
        host.subfunctions = Some(self.config.subfunctions_for(personality));
        host.mgmt_ip = Some(format!("192.168.204.{}", 10 + n % 200));
        host.availability = Availability::Online;
        self.store.write().await.insert(host.clone());
        host
    }

    /// Overwrite the stored record, e.g. to stage a state for a test.
    pub async fn put(&self, host: &Host) {
        self.store
            .save_host(host.clone())
            .await
            .expect("host exists");
    }

    pub async fn get(&self, host: &Host) -> Host {
        self.store.host(host.uuid).await.expect("host exists")
    }
}

/// Helper to create a test port fact
#[cfg(test)]
pub fn port(name: &str, mac: &str) -> PortFact {
    PortFact {
        name: name.to_string(),
        mac: mac.to_string(),
        pci_address: None,
        driver: Some("virtio_net".to_string()),
        speed_mbps: Some(10000),
        link_up: true,
        mtu: 1500,
        numa_node: Some(0),
    }
}

/// Linux-style numbering: thread siblings are offset by the number of
/// physical cores in the system.
#[cfg(test)]
pub fn topology(numa_nodes: u32, cores_per_node: u32, threads: u32) -> Vec<CpuFact> {
    let physical = numa_nodes * cores_per_node;
    let mut cpus = Vec::new();
    for thread in 0..threads {
        for numa in 0..numa_nodes {
            for core in 0..cores_per_node {
                cpus.push(CpuFact {
                    cpu: thread * physical + numa * cores_per_node + core,
                    numa_node: numa,
                    socket: numa,
                    core,
                    thread,
                    model: Some("Intel(R) Xeon(R) Gold 6230".to_string()),
                });
            }
        }
    }
    cpus
}
