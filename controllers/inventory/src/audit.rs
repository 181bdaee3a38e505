//! Periodic self-healing audits.
//!
//! Each pass visits every host under its sequence lock and ages the decay
//! counters:
//! - install state: locked hosts with a non-terminal state fail after the
//!   install (or booting) threshold; failed hosts seen reachable complete
//! - pending action: stale lock requests are re-issued or cleared
//! - VIM progress: non-terminal statuses survive a single audit

use crate::config::InventoryConfig;
use crate::error::ControllerError;
use crate::locks::HostLocks;
use crate::metrics::InventoryMetrics;
use crate::notify::Notifier;
use crate::store::InventoryStore;
use inventory_types::{Decaying, Host, HostAction, InstallState, VimCallback};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one audit pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Hosts visited
    pub hosts: u32,
    /// Install states moved to failed
    pub install_failed: u32,
    /// Install states moved to completed
    pub install_completed: u32,
    /// Stale force-locks sent to mtce again
    pub force_locks_reissued: u32,
    /// Pending actions dropped
    pub pending_cleared: u32,
    /// VIM progress statuses dropped
    pub vim_progress_cleared: u32,
}

/// Runs the audits on a timer, one host at a time.
#[derive(Clone)]
pub struct Auditor {
    store: Arc<InventoryStore>,
    notifier: Notifier,
    locks: Arc<HostLocks>,
    config: Arc<InventoryConfig>,
    metrics: InventoryMetrics,
}

impl Auditor {
    /// Auditor over the shared store and locks.
    pub fn new(
        store: Arc<InventoryStore>,
        notifier: Notifier,
        locks: Arc<HostLocks>,
        config: Arc<InventoryConfig>,
        metrics: InventoryMetrics,
    ) -> Self {
        Self {
            store,
            notifier,
            locks,
            config,
            metrics,
        }
    }

    /// Audit forever on the configured interval, starting immediately.
    pub async fn run(self) -> Result<(), ControllerError> {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.audit.interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(
            "Audit loop started, interval {}s",
            self.config.audit.interval_secs
        );
        loop {
            interval.tick().await;
            let report = self.run_once().await;
            debug!("audit pass: {:?}", report);
        }
    }

    /// A single pass over every host.
    pub async fn run_once(&self) -> AuditReport {
        let mut report = AuditReport::default();
        let ids = self.store.read().await.host_ids();

        for uuid in ids {
            let _sequence = self.locks.sequence(uuid).await;
            // deleted since the pass started
            let Ok(mut host) = self.store.host(uuid).await else {
                continue;
            };
            report.hosts += 1;

            self.audit_install_state(&mut host, &mut report);
            let escalate = self.audit_pending_action(&mut host, &mut report);
            audit_vim_progress(&mut host, &mut report);

            if escalate {
                warn!(
                    "force-lock of {} still pending, re-issuing to mtce",
                    host.display_name()
                );
                self.notifier
                    .mtce_modify_best_effort(&host, HostAction::ForceLock)
                    .await;
                report.force_locks_reissued += 1;
            }

            if let Err(e) = self.store.save_host(host).await {
                debug!("audit of {} not saved: {}", uuid, e);
            }
        }

        self.metrics.record_audit("install_state");
        self.metrics.record_audit("pending_action");
        self.metrics.record_audit("vim_progress");
        report
    }

    fn audit_install_state(&self, host: &mut Host, report: &mut AuditReport) {
        let name = host.display_name().to_string();
        let reachable = host.availability.is_reachable();
        let availability = host.availability;
        let locked = host.is_locked();
        let Some(state) = host.install_state.as_mut() else {
            return;
        };

        if state.value == InstallState::Failed && reachable {
            info!("{} is {} after a failed install, marking completed", name, availability);
            *state = Decaying::fresh(InstallState::Completed);
            report.install_completed += 1;
            return;
        }
        if state.value.is_terminal() || !locked {
            return;
        }
        if reachable {
            info!("{} is reachable while {}, marking install completed", name, state.value);
            *state = Decaying::fresh(InstallState::Completed);
            report.install_completed += 1;
            return;
        }

        let threshold = if state.value == InstallState::Booting {
            self.config.audit.booting_fail_threshold
        } else {
            self.config.audit.install_fail_threshold
        };
        let age = state.tick();
        if age >= threshold {
            warn!("{} stuck in {} for {} audits, install failed", name, state.value, age);
            *state = Decaying::fresh(InstallState::Failed);
            self.metrics.record_install_failure();
            report.install_failed += 1;
        }
    }

    /// Returns true when a pending force-lock must be re-issued to mtce.
    fn audit_pending_action(&self, host: &mut Host, report: &mut AuditReport) -> bool {
        let name = host.display_name().to_string();
        let locked = host.is_locked();
        let Some(pending) = host.host_action.as_mut() else {
            if locked && is_locking_task(host.task.as_deref()) {
                host.task = None;
            }
            return false;
        };
        let action = pending.value;

        if action.is_lock() && locked {
            debug!("lock of {} completed, clearing", name);
            host.host_action = None;
            if is_locking_task(host.task.as_deref()) {
                host.task = None;
            }
            report.pending_cleared += 1;
            return false;
        }

        let age = pending.tick();
        let escalate = action == HostAction::ForceLock && age == self.config.audit.force_lock_escalation;

        if age >= self.config.audit.pending_clear_threshold {
            info!("pending {} on {} expired after {} audits", action, name, age);
            host.host_action = None;
            if action.is_lock() && is_locking_task(host.task.as_deref()) {
                host.task = None;
            }
            report.pending_cleared += 1;
        }
        escalate
    }
}

fn is_locking_task(task: Option<&str>) -> bool {
    matches!(
        task,
        Some(t) if Some(t) == HostAction::Lock.task_label() || Some(t) == HostAction::ForceLock.task_label()
    )
}

fn audit_vim_progress(host: &mut Host, report: &mut AuditReport) {
    let name = host.display_name().to_string();
    let Some(progress) = host.vim_progress.as_mut() else {
        return;
    };
    if VimCallback::is_terminal_status(&progress.value) {
        return;
    }
    if progress.age == 0 {
        progress.tick();
    } else {
        debug!("clearing VIM progress {} of {}", progress.value, name);
        host.vim_progress = None;
        report.vim_progress_cleared += 1;
    }
}
