//! Unit tests for the lifecycle engine: actions, VIM callbacks and deletion

#[cfg(test)]
mod tests {
    use crate::config::{InventoryConfig, SystemMode};
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use coordinator_client::{MockFailure, MtceOp, VimOp};
    use inventory_types::{
        Administrative, Availability, CallerClass, HostAction, HostCreate, InstallState,
        InvProvision, Operational, PatchOp, Personality, PlatformReport,
    };

    fn action(value: &str) -> Vec<PatchOp> {
        vec![PatchOp::replace("/action", value)]
    }

    #[tokio::test]
    async fn test_unprovisioned_unlock_then_bind_then_unlock() {
        let h = harness();
        let host = h
            .reconciler
            .create_host(HostCreate {
                mgmt_mac: "08:00:27:10:00:01".to_string(),
                ..HostCreate::default()
            })
            .await
            .unwrap();

        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("unlock"))
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(m)) if m.contains("unprovisioned host")));
        assert_eq!(h.get(&host).await.host_action, None);

        let bind = vec![
            PatchOp::replace("/hostname", "worker-0"),
            PatchOp::replace("/personality", "worker"),
            PatchOp::replace("/mgmt_ip", "192.168.204.50"),
        ];
        let bound = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, bind)
            .await
            .unwrap();
        assert_eq!(bound.host.subfunctions.as_deref(), Some("worker"));
        assert_eq!(h.mtce.ops(), vec![MtceOp::Add]);
        assert_eq!(h.vim.ops(), vec![VimOp::Add]);

        // mtce reports the freshly installed host online
        h.lifecycle
            .patch_host(
                host.uuid,
                CallerClass::Mtce,
                vec![PatchOp::replace("/availability", "online")],
            )
            .await
            .unwrap();

        let unlocked = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("unlock"))
            .await
            .unwrap();
        assert_eq!(unlocked.host.administrative, Administrative::Unlocked);
        assert_eq!(unlocked.host.action, HostAction::None);
        assert_eq!(unlocked.host.invprovision, InvProvision::Provisioning);
        assert_eq!(unlocked.host_action_text.as_deref(), Some("unlock"));
        assert_eq!(h.mtce.actions().last().map(String::as_str), Some("unlock"));
    }

    #[tokio::test]
    async fn test_first_report_during_unlock_is_kept() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let uuid = host.uuid;

        let gate = h.mtce.hold_next();
        let lifecycle = h.lifecycle.clone();
        let unlock = tokio::spawn(async move {
            lifecycle
                .patch_host(uuid, CallerClass::Operator, action("unlock"))
                .await
        });
        gate.entered().await;

        // the agent's first report lands while mtce is still being told
        let reconciler = h.reconciler.clone();
        let report = tokio::spawn(async move {
            let report = PlatformReport {
                first_report: true,
                uptime_secs: Some(120),
                ..PlatformReport::default()
            };
            reconciler.platform_update_by_host(uuid, report).await
        });
        tokio::task::yield_now().await;
        gate.release();

        unlock.await.unwrap().unwrap();
        report.await.unwrap().unwrap();

        let after = h.get(&host).await;
        assert_eq!(after.administrative, Administrative::Unlocked);
        assert_eq!(after.invprovision, InvProvision::Provisioned);
        assert_eq!(after.uptime, 120);
        assert_eq!(
            h.mtce.actions(),
            vec!["unlock".to_string(), "none".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unlock_rejected_by_mtce_rolls_back() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        h.mtce.fail_next(MockFailure::Reject("not ready".to_string()));

        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("unlock"))
            .await;
        assert!(matches!(err, Err(ControllerError::External(_))));

        let after = h.get(&host).await;
        assert_eq!(after.administrative, Administrative::Locked);
        assert_eq!(after.host_action, None);
        assert_eq!(after.task, None);
        assert_eq!(after.invprovision, InvProvision::Unprovisioned);
    }

    #[tokio::test]
    async fn test_unlock_timeout_is_gateway_timeout() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        h.mtce.fail_next(MockFailure::Timeout);
        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("unlock"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_force_unlock_proceeds_despite_mtce_failure() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        h.mtce.fail_next(MockFailure::Reject("not ready".to_string()));
        let unlocked = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("force-unlock"))
            .await
            .unwrap();
        assert_eq!(unlocked.host.administrative, Administrative::Unlocked);
    }

    async fn unlocked_host(h: &Harness, hostname: &str, personality: Personality) -> inventory_types::Host {
        let mut host = h.bound_host(hostname, personality).await;
        host.administrative = Administrative::Unlocked;
        host.operational = Operational::Enabled;
        host.availability = Availability::Available;
        host.invprovision = InvProvision::Provisioned;
        h.put(&host).await;
        host
    }

    #[tokio::test]
    async fn test_lock_is_two_phase() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;

        let staged = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await
            .unwrap();
        assert_eq!(staged.host.administrative, Administrative::Unlocked);
        assert_eq!(staged.host.task.as_deref(), Some("Locking"));
        assert_eq!(
            h.vim.ops(),
            vec![VimOp::Action {
                action: HostAction::Lock,
                force: false
            }]
        );
        assert!(h.mtce.ops().is_empty());

        let locked = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Vim, action("services-disabled"))
            .await
            .unwrap();
        assert_eq!(locked.host.administrative, Administrative::Locked);
        assert_eq!(locked.host.task, None);
        assert_eq!(locked.vim_progress_status.as_deref(), Some("services-disabled"));
        assert_eq!(h.mtce.actions(), vec!["lock".to_string()]);

        // the completed lock stays visible until the next audit pass
        let pending = locked.host.host_action.unwrap();
        assert_eq!(pending.value, HostAction::Lock);
        assert_eq!(pending.age, 0);
        let report = h.auditor.run_once().await;
        assert_eq!(report.pending_cleared, 1);
        assert_eq!(h.get(&host).await.host_action, None);
    }

    #[tokio::test]
    async fn test_lock_rejected_by_vim_restores_state() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        h.vim.fail_next(MockFailure::Reject("instances cannot migrate".to_string()));

        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await;
        assert!(matches!(err, Err(ControllerError::External(_))));
        let after = h.get(&host).await;
        assert_eq!(after.host_action, None);
        assert_eq!(after.task, None);
    }

    #[tokio::test]
    async fn test_force_lock_completes_on_disable_failed() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;

        h.lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("force-lock"))
            .await
            .unwrap();
        let locked = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Vim, action("services-disable-failed"))
            .await
            .unwrap();
        assert_eq!(locked.host.administrative, Administrative::Locked);
        assert_eq!(h.mtce.actions(), vec!["force-lock".to_string()]);
    }

    #[tokio::test]
    async fn test_force_lock_goes_to_mtce_when_vim_unavailable() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        h.vim.fail_next(MockFailure::Timeout);

        let locked = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("force-lock"))
            .await
            .unwrap();
        assert_eq!(locked.host.administrative, Administrative::Locked);
        assert_eq!(locked.host.action, HostAction::None);
        assert_eq!(locked.host.task, None);
        assert_eq!(h.mtce.actions(), vec!["force-lock".to_string()]);

        // a late services-disabled does not lock twice
        h.lifecycle
            .patch_host(host.uuid, CallerClass::Vim, action("services-disabled"))
            .await
            .unwrap();
        assert_eq!(h.mtce.ops(), vec![MtceOp::Modify]);
    }

    #[tokio::test]
    async fn test_plain_lock_with_vim_unavailable_is_rejected() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        h.vim.fail_next(MockFailure::Timeout);

        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await;
        assert!(matches!(err, Err(ControllerError::Timeout(_))));
        assert!(h.mtce.ops().is_empty());
        assert_eq!(h.get(&host).await.administrative, Administrative::Unlocked);
    }

    #[tokio::test]
    async fn test_plain_lock_aborted_on_disable_failed() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        h.lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await
            .unwrap();
        let aborted = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Vim, action("services-disable-failed"))
            .await
            .unwrap();
        assert_eq!(aborted.host.administrative, Administrative::Unlocked);
        assert_eq!(aborted.host.host_action, None);
        assert!(h.mtce.ops().is_empty());
    }

    #[tokio::test]
    async fn test_active_controller_lock_rejected_on_duplex() {
        let h = harness();
        let host = unlocked_host(&h, "controller-0", Personality::Controller).await;
        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(m)) if m.contains("active controller")));
        assert!(h.vim.ops().is_empty());
    }

    #[tokio::test]
    async fn test_active_controller_lock_allowed_on_simplex() {
        let h = harness_with(InventoryConfig {
            system_mode: SystemMode::Simplex,
            ..InventoryConfig::default()
        });
        let host = unlocked_host(&h, "controller-0", Personality::Controller).await;
        h.lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_storage_lock_names_minimum_and_current_monitors() {
        let h = harness();
        let host = unlocked_host(&h, "storage-0", Personality::Storage).await;
        h.quorum.set(2, 2);

        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await;
        assert!(matches!(
            err,
            Err(ControllerError::Validation(m)) if m.contains("only 2 storage monitors") && m.contains("at least 2")
        ));

        h.quorum.set(3, 2);
        h.lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_configured_minimum_monitors_applies() {
        let mut config = InventoryConfig::default();
        config.quorum.min_monitors = 3;
        let h = harness_with(config);
        let host = unlocked_host(&h, "storage-0", Personality::Storage).await;
        h.quorum.set(3, 2);
        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(m)) if m.contains("at least 3")));
    }

    #[tokio::test]
    async fn test_reinstall_resets_install_state() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let reinstalled = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("reinstall"))
            .await
            .unwrap();
        let state = reinstalled.host.install_state.unwrap();
        assert_eq!(state.value, InstallState::Preinstall);
        assert_eq!(state.age, 0);
        assert_eq!(h.mtce.actions(), vec!["reinstall".to_string()]);
    }

    #[tokio::test]
    async fn test_reboot_requires_locked_host() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        let err = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("reboot"))
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(_))));
        assert!(h.mtce.ops().is_empty());
    }

    #[tokio::test]
    async fn test_swact_requires_enabled_peer() {
        let h = harness();
        let active = unlocked_host(&h, "controller-0", Personality::Controller).await;
        let err = h
            .lifecycle
            .patch_host(active.uuid, CallerClass::Operator, action("swact"))
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(_))));

        let mut peer = unlocked_host(&h, "controller-1", Personality::Controller).await;
        peer.availability = Availability::Degraded;
        h.put(&peer).await;
        assert!(
            h.lifecycle
                .patch_host(active.uuid, CallerClass::Operator, action("swact"))
                .await
                .is_err()
        );
        h.lifecycle
            .patch_host(active.uuid, CallerClass::Operator, action("force-swact"))
            .await
            .unwrap();
        assert_eq!(h.mtce.ops(), vec![MtceOp::Modify]);
    }

    #[tokio::test]
    async fn test_personality_write_once_for_every_caller() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let err = h
            .lifecycle
            .patch_host(
                host.uuid,
                CallerClass::Operator,
                vec![PatchOp::replace("/personality", "storage")],
            )
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(m)) if m.contains("already set")));

        let err = h
            .lifecycle
            .patch_host(
                host.uuid,
                CallerClass::Mtce,
                vec![PatchOp::replace("/personality", "storage")],
            )
            .await;
        assert!(matches!(err, Err(ControllerError::Validation(_))));
        assert_eq!(h.get(&host).await.personality, Some(Personality::Worker));
    }

    #[tokio::test]
    async fn test_duplicate_hostname_rejected() {
        let h = harness();
        h.bound_host("worker-0", Personality::Worker).await;
        let other = h
            .reconciler
            .create_host(HostCreate {
                mgmt_mac: "08:00:27:10:00:09".to_string(),
                ..HostCreate::default()
            })
            .await
            .unwrap();
        let err = h
            .lifecycle
            .patch_host(
                other.uuid,
                CallerClass::Operator,
                vec![PatchOp::replace("/hostname", "worker-0")],
            )
            .await;
        assert!(matches!(err, Err(ControllerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_bypass_fields_skip_pipeline() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        let patched = h
            .lifecycle
            .patch_host(
                host.uuid,
                CallerClass::Mtce,
                vec![PatchOp::replace("/uptime", 3600), PatchOp::replace("/task", "Booting")],
            )
            .await
            .unwrap();
        assert_eq!(patched.host.uptime, 3600);
        assert_eq!(patched.host.task.as_deref(), Some("Booting"));
        assert!(h.mtce.ops().is_empty());
        assert!(h.vim.ops().is_empty());
    }

    #[tokio::test]
    async fn test_services_disable_extend_resets_pending_age() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        h.lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("lock"))
            .await
            .unwrap();
        let mut aged = h.get(&host).await;
        if let Some(pending) = aged.host_action.as_mut() {
            pending.age = 5;
        }
        h.put(&aged).await;

        let extended = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Vim, action("services-disable-extend"))
            .await
            .unwrap();
        assert_eq!(extended.host.host_action.map(|p| p.age), Some(0));
    }

    #[tokio::test]
    async fn test_delete_requires_locked_idle_host() {
        let h = harness();
        let host = unlocked_host(&h, "worker-0", Personality::Worker).await;
        assert!(matches!(
            h.lifecycle.delete_host(host.uuid).await,
            Err(ControllerError::Validation(_))
        ));

        let mut locked = h.get(&host).await;
        locked.administrative = Administrative::Locked;
        locked.operational = Operational::Disabled;
        locked.availability = Availability::Offline;
        h.put(&locked).await;

        h.lifecycle.delete_host(host.uuid).await.unwrap();
        assert!(h.store.host(host.uuid).await.is_err());
        assert_eq!(h.vim.ops(), vec![VimOp::Delete]);
        assert_eq!(h.mtce.ops(), vec![MtceOp::Delete]);
    }

    #[tokio::test]
    async fn test_delete_kept_when_coordinator_refuses() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        h.vim.fail_next(MockFailure::Reject("busy".to_string()));
        assert!(h.lifecycle.delete_host(host.uuid).await.is_err());
        assert!(h.store.host(host.uuid).await.is_ok());
        assert!(h.mtce.ops().is_empty());
    }

    #[tokio::test]
    async fn test_patch_metrics_recorded() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let _ = h
            .lifecycle
            .patch_host(host.uuid, CallerClass::Operator, action("unlock"))
            .await;
        let text = h.metrics.encode_text().unwrap();
        assert!(text.contains("inventory_patch_requests_total"));
        assert!(text.contains("action=\"unlock\""));
    }
}
