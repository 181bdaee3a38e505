//! Action preconditions.
//!
//! A failed check is a [`ControllerError::Validation`] carrying the message
//! shown to the operator. Checks never mutate the host.

use super::LifecycleEngine;
use crate::error::ControllerError;
use inventory_types::{
    Availability, Host, HostAction, InstallState, Operational, Personality,
};
use tracing::debug;

fn reject(message: String) -> Result<(), ControllerError> {
    Err(ControllerError::Validation(message))
}

impl LifecycleEngine {
    pub(super) async fn check(&self, host: &Host, action: HostAction) -> Result<(), ControllerError> {
        match action {
            HostAction::None => Ok(()),
            HostAction::Lock | HostAction::ForceLock => self.check_lock(host, action).await,
            HostAction::Unlock | HostAction::ForceUnlock => check_unlock(host, action),
            HostAction::Swact | HostAction::ForceSwact => self.check_swact(host, action).await,
            HostAction::Reset
            | HostAction::Reboot
            | HostAction::Reinstall
            | HostAction::PowerOn
            | HostAction::PowerOff => check_locked_for(host, action),
            HostAction::SubfunctionConfig => check_subfunction_config(host),
        }
    }

    async fn check_lock(&self, host: &Host, action: HostAction) -> Result<(), ControllerError> {
        if host.is_locked() {
            return reject(format!("Host {} is already locked", host.display_name()));
        }
        if host.host_action.as_ref().is_some_and(|p| p.value.is_lock()) && action == HostAction::Lock {
            return reject(format!(
                "Host {} already has a lock in progress",
                host.display_name()
            ));
        }
        if self.identity.is_active_controller(host) && !self.reconciler.config.is_simplex() {
            return reject(format!(
                "Can not lock the active controller {}; swact to the peer controller first",
                host.display_name()
            ));
        }
        if host.personality == Some(Personality::Storage) {
            self.check_storage_quorum(host).await?;
        }
        Ok(())
    }

    /// Locking a storage host removes one monitor from quorum.
    async fn check_storage_quorum(&self, host: &Host) -> Result<(), ControllerError> {
        let (current, required) = self.reconciler.notifier.monitor_counts().await?;
        let minimum = required.max(self.reconciler.config.quorum.min_monitors);
        debug!(
            "storage monitors for lock of {}: current={} minimum={}",
            host.display_name(),
            current,
            minimum
        );
        if current <= minimum {
            return reject(format!(
                "Can not lock storage host {}: only {current} storage monitors are available \
                 and at least {minimum} are required",
                host.display_name()
            ));
        }
        Ok(())
    }

    async fn check_swact(&self, host: &Host, action: HostAction) -> Result<(), ControllerError> {
        if host.personality != Some(Personality::Controller) {
            return reject(format!(
                "Swact is only supported on controllers, {} is not one",
                host.display_name()
            ));
        }
        if !self.identity.is_active_controller(host) {
            return reject(format!(
                "Host {} is not the active controller",
                host.display_name()
            ));
        }

        let inner = self.reconciler.store.read().await;
        let peer = inner
            .hosts()
            .find(|h| h.uuid != host.uuid && h.personality == Some(Personality::Controller));
        let Some(peer) = peer else {
            return reject("Swact requires a second controller".to_string());
        };
        if peer.is_locked() || peer.operational != Operational::Enabled {
            return reject(format!(
                "Can not swact to {}: it is not unlocked and enabled",
                peer.display_name()
            ));
        }
        if action == HostAction::Swact && peer.availability == Availability::Degraded {
            return reject(format!(
                "Can not swact to degraded controller {}; use force-swact",
                peer.display_name()
            ));
        }
        Ok(())
    }
}

fn check_unlock(host: &Host, action: HostAction) -> Result<(), ControllerError> {
    if !host.is_locked() {
        return reject(format!("Host {} is already unlocked", host.display_name()));
    }
    let missing = host.missing_identity_fields();
    if !missing.is_empty() {
        return reject(format!(
            "Can not unlock an unprovisioned host {}: {} must be set",
            host.display_name(),
            missing.join(", ")
        ));
    }
    if action == HostAction::ForceUnlock {
        return Ok(());
    }
    if host
        .install_state
        .as_ref()
        .is_some_and(|s| s.value == InstallState::Failed)
    {
        return reject(format!(
            "Can not unlock host {}: its install failed; reinstall it first",
            host.display_name()
        ));
    }
    if !host.availability.is_reachable() {
        return reject(format!(
            "Can not unlock host {} while it is {}",
            host.display_name(),
            host.availability
        ));
    }
    Ok(())
}

fn check_locked_for(host: &Host, action: HostAction) -> Result<(), ControllerError> {
    if !host.is_locked() {
        return reject(format!(
            "Can not {action} an unlocked host {}; lock it first",
            host.display_name()
        ));
    }
    if host.personality.is_none() {
        return reject(format!(
            "Can not {action} host {}: personality is not set",
            host.display_name()
        ));
    }
    Ok(())
}

fn check_subfunction_config(host: &Host) -> Result<(), ControllerError> {
    if host.subfunctions.is_none() {
        return reject(format!(
            "Host {} has no subfunctions to configure",
            host.display_name()
        ));
    }
    Ok(())
}
