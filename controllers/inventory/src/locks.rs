//! Patch serialization.
//!
//! Two named lock domains, one for operator callers and one shared by mtce
//! and the VIM, each keyed by host. Every patch also holds the host's
//! sequence lock from precondition check to commit, so patches on one host
//! never interleave across caller classes. Tokio mutexes queue waiters FIFO.

use inventory_types::CallerClass;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    fn handle(&self, key: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    async fn acquire(&self, key: Uuid) -> OwnedMutexGuard<()> {
        self.handle(key).lock_owned().await
    }

    fn forget(&self, key: Uuid) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

/// Held for the duration of one patch.
#[derive(Debug)]
pub struct PatchGuard {
    pub caller: CallerClass,
    _domain: OwnedMutexGuard<()>,
    _sequence: OwnedMutexGuard<()>,
}

/// Per-host patch locks.
#[derive(Debug, Default)]
pub struct HostLocks {
    operator: KeyedLocks,
    coordinator: KeyedLocks,
    sequence: KeyedLocks,
}

impl HostLocks {
    /// No host locked yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the caller's domain lock, then the host's sequence lock.
    pub async fn acquire(&self, caller: CallerClass, host: Uuid) -> PatchGuard {
        let domain = if caller.is_coordinator() {
            &self.coordinator
        } else {
            &self.operator
        };
        let domain_guard = domain.acquire(host).await;
        let sequence_guard = self.sequence.acquire(host).await;
        debug!("patch lock acquired for {} by {}", host, caller);
        PatchGuard {
            caller,
            _domain: domain_guard,
            _sequence: sequence_guard,
        }
    }

    /// Sequence lock alone, for background paths that mutate lifecycle fields.
    pub async fn sequence(&self, host: Uuid) -> OwnedMutexGuard<()> {
        self.sequence.acquire(host).await
    }

    /// Drop lock entries for a deleted host.
    pub fn forget(&self, host: Uuid) {
        self.operator.forget(host);
        self.coordinator.forget(host);
        self.sequence.forget(host);
    }
}
