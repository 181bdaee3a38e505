//! Host lifecycle engine.
//!
//! Every patch runs under the caller's lock domain plus the host's sequence
//! lock. Field changes are validated against the caller's allowlist; an
//! operator action then goes through check, stage, notify and commit as
//! described by its [`ActionPlan`](actions::ActionPlan). VIM callbacks
//! complete two-phase locks.

pub mod actions;
pub mod checks;
pub mod patch;
pub mod vim;

#[cfg(test)]
mod actions_test;

use crate::error::ControllerError;
use crate::identity::ControllerIdentity;
use crate::locks::HostLocks;
use crate::metrics::InventoryMetrics;
use crate::reconciler::Reconciler;
use inventory_types::{
    Availability, CallerClass, Host, HostView, InvProvision, Operational, PatchDocument,
    RequestedAction,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Applies patches and operator actions to host records.
#[derive(Clone)]
pub struct LifecycleEngine {
    reconciler: Reconciler,
    identity: Arc<ControllerIdentity>,
    locks: Arc<HostLocks>,
    metrics: InventoryMetrics,
}

impl LifecycleEngine {
    /// Engine sharing the reconciler's store and the host locks.
    pub fn new(
        reconciler: Reconciler,
        identity: Arc<ControllerIdentity>,
        locks: Arc<HostLocks>,
        metrics: InventoryMetrics,
    ) -> Self {
        Self {
            reconciler,
            identity,
            locks,
            metrics,
        }
    }

    /// Apply a patch document from `caller` to the host.
    pub async fn patch_host(&self, uuid: Uuid, caller: CallerClass, doc: PatchDocument) -> Result<HostView, ControllerError> {
        let parsed = patch::parse(&doc, caller)?;
        let label = parsed.label();

        let result = self.apply_patch(uuid, caller, parsed).await;
        let outcome = match &result {
            Ok(_) => "accepted".to_string(),
            Err(e) => e.kind().to_string(),
        };
        self.metrics.record_patch(&label, &outcome);
        result.map(|host| host.view())
    }

    async fn apply_patch(&self, uuid: Uuid, caller: CallerClass, parsed: patch::ParsedPatch) -> Result<Host, ControllerError> {
        let _guard = self.locks.acquire(caller, uuid).await;
        let current = self.reconciler.store.host(uuid).await?;
        let mut host = current.clone();

        if parsed.is_bypass() {
            patch::apply_changes(&mut host, &parsed.changes, &self.reconciler.config)?;
            debug!("bypass patch on {} from {}", host.display_name(), caller);
            return self.reconciler.store.save_host(host).await;
        }

        let applied = patch::apply_changes(&mut host, &parsed.changes, &self.reconciler.config)?;
        if let Some(hostname) = host.hostname.as_deref()
            && current.hostname.is_none()
        {
            let inner = self.reconciler.store.read().await;
            if inner.find_by_hostname(hostname).is_some_and(|other| other.uuid != uuid) {
                return Err(ControllerError::Conflict(format!(
                    "Host name {hostname} already in use"
                )));
            }
        }

        let host = match parsed.action {
            None => self.reconciler.store.save_host(host).await?,
            Some(RequestedAction::Host(action)) => self.run_action(current, host, action).await?,
            Some(RequestedAction::Vim(callback)) => self.handle_vim_callback(host, callback).await?,
        };

        if applied.personality_bound {
            self.register_with_coordinators(&host).await;
        }
        Ok(host)
    }

    /// Newly bound hosts are announced to mtce and the VIM. Failures are
    /// logged; the coordinators also learn about the host on unlock.
    async fn register_with_coordinators(&self, host: &Host) {
        info!("Registering {} with mtce and VIM", host.display_name());
        if let Err(e) = self.reconciler.notifier.mtce_add(host).await {
            warn!("mtce host_add for {} failed: {}", host.display_name(), e);
        }
        if let Err(e) = self.reconciler.notifier.vim_add(host).await {
            warn!("VIM host add for {} failed: {}", host.display_name(), e);
        }
    }

    /// Remove a host once it is locked, disabled and offline (or was never
    /// provisioned) and both coordinators confirmed removal.
    pub async fn delete_host(&self, uuid: Uuid) -> Result<(), ControllerError> {
        let guard = self.locks.acquire(CallerClass::Operator, uuid).await;
        let host = self.reconciler.store.host(uuid).await?;

        if !host.is_locked() {
            return Err(ControllerError::Validation(format!(
                "Can not delete an unlocked host {}",
                host.display_name()
            )));
        }
        let idle = host.operational == Operational::Disabled
            && host.availability == Availability::Offline;
        if !idle && host.invprovision != InvProvision::Unprovisioned {
            return Err(ControllerError::Validation(format!(
                "Can not delete host {} while it is {}/{}",
                host.display_name(),
                host.operational,
                host.availability
            )));
        }
        if self.identity.is_active_controller(&host) {
            return Err(ControllerError::Validation(format!(
                "Can not delete the active controller {}",
                host.display_name()
            )));
        }

        if host.personality.is_some() {
            self.reconciler.notifier.vim_delete(&host).await?;
            self.reconciler.notifier.mtce_delete(&host).await?;
        }

        self.reconciler.store.write().await.remove(uuid)?;
        drop(guard);
        self.locks.forget(uuid);
        info!("Deleted host {} ({})", host.display_name(), uuid);
        Ok(())
    }
}
