//! Reconciliation of agent reports against the canonical store.
//!
//! One method per RPC, grouped by concern:
//! - `host`: identity lookup, idempotent creation, reported field updates
//! - `facts`: ports, PCI devices, NUMA nodes, memory and LLDP set reconciliation
//! - `cpus`: topology comparison and default role allocation
//! - `platform`: platform reports, subfunctions, BM deprovision, serial console
//!
//! Methods that write host lifecycle or reported fields hold the host's
//! sequence lock, so they never interleave with a patch in flight.

pub mod cpus;
pub mod facts;
pub mod host;
pub mod platform;


use crate::config::InventoryConfig;
use crate::locks::HostLocks;
use crate::notify::Notifier;
use crate::store::InventoryStore;
use std::sync::Arc;

/// Applies agent reports to the store and notifies coordinators after commit.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pub(crate) store: Arc<InventoryStore>,
    pub(crate) notifier: Notifier,
    pub(crate) config: Arc<InventoryConfig>,
    pub(crate) locks: Arc<HostLocks>,
}

impl Reconciler {
    /// Reconciler sharing the store and host locks with the lifecycle engine.
    pub fn new(
        store: Arc<InventoryStore>,
        notifier: Notifier,
        config: Arc<InventoryConfig>,
        locks: Arc<HostLocks>,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            locks,
        }
    }
}
