//! Operator action dispatch.
//!
//! Each [`HostAction`] maps to an [`ActionPlan`]: the notification steps run
//! after the pending action is staged, and how the record is committed once
//! they succeed.

use super::LifecycleEngine;
use crate::error::ControllerError;
use inventory_types::{
    Administrative, Decaying, Host, HostAction, InstallState, InvProvision,
};
use tracing::{error, info, warn};

/// One notification run between staging and commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Generate configuration; never skipped by `force-*`
    Configure,
    /// Ask the VIM to act on the host's services
    Vim,
    /// Forward the action to mtce
    Mtce,
}

/// How the record is committed once every step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Two-phase lock: finishes on the VIM services-disabled callback
    AwaitServicesDisabled,
    /// Force-lock with the VIM unavailable: mtce locks the host right away
    ForceLocked,
    /// Administrative state becomes unlocked
    Unlocked,
    /// Install state restarts at preinstall
    Reinstall,
    /// Only the pending action is recorded
    Done,
}

/// Notification steps and commit for one operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPlan {
    pub action: HostAction,
    pub steps: &'static [Step],
    pub commit: Commit,
}

impl ActionPlan {
    /// The plan for `action`.
    pub fn for_action(action: HostAction) -> Self {
        let (steps, commit): (&'static [Step], Commit) = match action {
            HostAction::None => (&[], Commit::Done),
            HostAction::Lock | HostAction::ForceLock => (&[Step::Vim], Commit::AwaitServicesDisabled),
            HostAction::Unlock | HostAction::ForceUnlock => (&[Step::Configure, Step::Mtce], Commit::Unlocked),
            HostAction::Reinstall => (&[Step::Mtce], Commit::Reinstall),
            HostAction::Swact
            | HostAction::ForceSwact
            | HostAction::Reset
            | HostAction::Reboot
            | HostAction::PowerOn
            | HostAction::PowerOff
            | HostAction::SubfunctionConfig => (&[Step::Mtce], Commit::Done),
        };
        Self {
            action,
            steps,
            commit,
        }
    }
}

impl LifecycleEngine {
    /// Check, stage, notify and commit `action`. `current` is the record
    /// before this patch and is what a failed notification rolls back to.
    pub(super) async fn run_action(&self, current: Host, mut host: Host, action: HostAction) -> Result<Host, ControllerError> {
        let plan = ActionPlan::for_action(action);
        self.check(&host, action).await?;

        if action == HostAction::None {
            return self.reconciler.store.save_host(host).await;
        }

        // stage
        host.action = action;
        host.host_action = Some(Decaying::fresh(action));
        host.task = action.task_label().map(str::to_string);
        let mut host = self.reconciler.store.save_host(host).await?;
        info!("Staged {} on {}", action, host.display_name());

        // notify
        let mut commit = plan.commit;
        for step in plan.steps {
            if let Err(e) = self.run_step(&mut host, *step, action).await {
                if action == HostAction::ForceLock && *step == Step::Vim {
                    warn!(
                        "force-lock of {}: VIM unavailable, locking through mtce: {}",
                        host.display_name(),
                        e
                    );
                    commit = Commit::ForceLocked;
                    continue;
                }
                if action.is_forced() && *step != Step::Configure {
                    warn!(
                        "{} of {}: {:?} notification failed, proceeding: {}",
                        action,
                        host.display_name(),
                        step,
                        e
                    );
                    continue;
                }
                error!(
                    "{} of {} rejected at {:?}: {}",
                    action,
                    host.display_name(),
                    step,
                    e
                );
                self.roll_back(&current, &host).await;
                return Err(e);
            }
        }

        // commit
        host.action = HostAction::None;
        match commit {
            Commit::AwaitServicesDisabled => {
                info!("{} of {} waits for VIM services-disabled", action, host.display_name());
            }
            Commit::ForceLocked => self.complete_lock(&mut host, action).await,
            Commit::Unlocked => {
                host.administrative = Administrative::Unlocked;
                host.host_action = Some(Decaying::fresh(action));
            }
            Commit::Reinstall => {
                host.install_state = Some(Decaying::fresh(InstallState::Preinstall));
                host.host_action = Some(Decaying::fresh(action));
            }
            Commit::Done => {
                host.host_action = Some(Decaying::fresh(action));
            }
        }
        let host = self.reconciler.store.save_host(host).await?;
        info!("{} of {} accepted", action, host.display_name());
        Ok(host)
    }

    async fn run_step(&self, host: &mut Host, step: Step, action: HostAction) -> Result<(), ControllerError> {
        let notifier = &self.reconciler.notifier;
        match step {
            Step::Configure => {
                if host.invprovision == InvProvision::Unprovisioned {
                    *host = self.reconciler.configure_in_sequence(host.uuid).await?;
                }
                Ok(())
            }
            Step::Vim => notifier.vim_action(host, action).await,
            Step::Mtce => notifier.mtce_modify(host, action).await.map(|_| ()),
        }
    }

    /// Restore the pre-patch transition fields after a rejected notification
    /// and undo a configure step for a host that was not yet provisioned.
    async fn roll_back(&self, current: &Host, staged: &Host) {
        if current.invprovision == InvProvision::Unprovisioned
            && staged.invprovision == InvProvision::Provisioning
            && let Err(e) = self.reconciler.unconfigure_in_sequence(current.uuid).await
        {
            error!("unconfigure of {} failed: {}", current.display_name(), e);
        }

        let result = async {
            let mut host = self.reconciler.store.host(current.uuid).await?;
            host.action = HostAction::None;
            host.host_action = current.host_action.clone();
            host.task = current.task.clone();
            self.reconciler.store.save_host(host).await
        }
        .await;
        if let Err(e) = result {
            error!("rollback of {} failed: {}", current.display_name(), e);
        }
    }
}
