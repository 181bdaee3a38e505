//! VIM status callbacks.
//!
//! The VIM reports progress through the `action` field. Services-disabled
//! completes a staged lock by forwarding it to mtce; services-disable-failed
//! completes a force-lock and aborts a plain lock.

use super::LifecycleEngine;
use crate::error::ControllerError;
use inventory_types::{Administrative, Decaying, Host, HostAction, VimCallback};
use tracing::{error, info, warn};

impl LifecycleEngine {
    pub(super) async fn handle_vim_callback(&self, mut host: Host, callback: VimCallback) -> Result<Host, ControllerError> {
        host.vim_progress = Some(Decaying::fresh(callback.to_string()));
        let pending = host
            .host_action
            .as_ref()
            .map(|p| p.value)
            .filter(|a| a.is_lock() && !host.is_locked());

        match (callback, pending) {
            (VimCallback::ServicesDisabled, Some(lock)) => {
                self.complete_lock(&mut host, lock).await;
            }
            (VimCallback::ServicesDisableFailed, Some(HostAction::ForceLock)) => {
                warn!(
                    "VIM could not disable services on {}, forcing lock",
                    host.display_name()
                );
                self.complete_lock(&mut host, HostAction::ForceLock).await;
            }
            (VimCallback::ServicesDisableFailed, Some(_)) => {
                warn!(
                    "VIM could not disable services on {}, lock aborted",
                    host.display_name()
                );
                host.host_action = None;
                host.task = None;
            }
            (VimCallback::ServicesDisableExtend, _) => {
                let name = host.display_name().to_string();
                if let Some(pending) = host.host_action.as_mut() {
                    info!("VIM extended services disable of {}", name);
                    pending.age = 0;
                }
            }
            (VimCallback::ServicesDeleteFailed, _) => {
                error!("VIM failed to delete services of {}", host.display_name());
            }
            _ => {}
        }

        self.reconciler.store.save_host(host).await
    }

    /// Second phase of a lock. The pending action restarts its decay and is
    /// cleared by the audit; a failed mtce call leaves the lock pending for
    /// the audit to retry or clear.
    pub(super) async fn complete_lock(&self, host: &mut Host, lock: HostAction) {
        match self.reconciler.notifier.mtce_modify(host, lock).await {
            Ok(_) => {
                info!("Host {} locked", host.display_name());
                host.administrative = Administrative::Locked;
                host.host_action = Some(Decaying::fresh(lock));
                host.task = None;
            }
            Err(e) => error!("mtce {} of {} failed: {}", lock, host.display_name(), e),
        }
    }
}
