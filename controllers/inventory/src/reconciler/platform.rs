//! Platform reports, subfunction binding, BM deprovision and serial console.

use super::Reconciler;
use crate::error::ControllerError;
use inventory_types::{
    Administrative, Decaying, Host, HostAction, InvProvision, PlatformReport, TtysDcdResponse,
    parse_subfunctions,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

impl Reconciler {
    /// Apply a platform report. The first report from an unlocked host that
    /// is still provisioning completes provisioning and notifies mtce.
    pub async fn platform_update_by_host(&self, uuid: Uuid, report: PlatformReport) -> Result<Host, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        let (host, promoted) = {
            let mut inner = self.store.write().await;
            let mut host = inner.host(uuid)?.clone();

            if let Some(name) = report.iscsi_initiator_name {
                host.iscsi_initiator_name = Some(name);
            }
            if let Some(uptime) = report.uptime_secs {
                host.uptime = uptime;
            }
            if let Some(state) = report.install_state {
                let changed = host.install_state.as_ref().map(|d| d.value) != Some(state);
                if changed {
                    debug!("install state of {} is now {}", host.display_name(), state);
                    host.install_state = Some(Decaying::fresh(state));
                }
            }

            let promoted = report.first_report
                && host.invprovision == InvProvision::Provisioning
                && host.administrative == Administrative::Unlocked;
            if promoted {
                info!("Host {} is provisioned", host.display_name());
                host.invprovision = InvProvision::Provisioned;
            }
            (inner.save_host(host)?, promoted)
        };

        if promoted {
            self.notifier.mtce_modify_best_effort(&host, HostAction::None).await;
        }
        Ok(host)
    }

    /// Subfunctions are bound once. Re-sending the bound value is a no-op.
    pub async fn subfunctions_update_by_host(&self, uuid: Uuid, subfunctions: &str) -> Result<Host, ControllerError> {
        let wanted = parse_subfunctions(subfunctions);
        if wanted.is_empty() {
            return Err(ControllerError::Validation(
                "subfunctions must not be empty".to_string(),
            ));
        }
        let normalized = wanted.join(",");

        let _sequence = self.locks.sequence(uuid).await;
        let mut inner = self.store.write().await;
        let mut host = inner.host(uuid)?.clone();
        match host.subfunctions.as_deref() {
            None => {
                info!("Binding subfunctions {} to {}", normalized, host.display_name());
                host.subfunctions = Some(normalized);
                inner.save_host(host)
            }
            Some(bound) if parse_subfunctions(bound) == wanted => Ok(host),
            Some(bound) => Err(ControllerError::Validation(format!(
                "Host {} subfunctions are already set to {bound}",
                host.display_name()
            ))),
        }
    }

    /// Tell mtce that subfunction configuration finished on the host.
    pub async fn notify_subfunctions_config(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let host = self.store.host(uuid).await?;
        self.notifier
            .mtce_modify(&host, HostAction::SubfunctionConfig)
            .await?;
        info!("Subfunction config of {} reported to mtce", host.display_name());
        Ok(host)
    }

    /// Clear BM controller fields and let mtce know it lost BM access.
    pub async fn bm_deprovision_by_host(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        let host = {
            let mut inner = self.store.write().await;
            let mut host = inner.host(uuid)?.clone();
            if host.bm_type.is_none() && host.bm_ip.is_none() && host.bm_username.is_none() {
                debug!("{} has no BM controller configured", host.display_name());
                return Ok(host);
            }
            info!("Deprovisioning BM controller of {}", host.display_name());
            host.bm_type = None;
            host.bm_ip = None;
            host.bm_username = None;
            inner.save_host(host)?
        };
        self.notifier.mtce_modify_best_effort(&host, HostAction::None).await;
        Ok(host)
    }

    /// Record the desired carrier-detect setting.
    pub async fn configure_ttys_dcd(&self, uuid: Uuid, ttys_dcd: bool) -> Result<TtysDcdResponse, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        let mut inner = self.store.write().await;
        let mut host = inner.host(uuid)?.clone();
        if host.ttys_dcd != Some(ttys_dcd) {
            info!("ttys_dcd of {} set to {}", host.display_name(), ttys_dcd);
            host.ttys_dcd = Some(ttys_dcd);
        }
        let host = inner.save_host(host)?;
        Ok(TtysDcdResponse {
            host_uuid: host.uuid,
            ttys_dcd: host.ttys_dcd,
        })
    }

    /// Stored carrier-detect setting, `None` when never configured.
    pub async fn get_host_ttys_dcd(&self, uuid: Uuid) -> Result<TtysDcdResponse, ControllerError> {
        let host = self.store.host(uuid).await?;
        if host.ttys_dcd.is_none() {
            warn!("ttys_dcd of {} was never configured", host.display_name());
        }
        Ok(TtysDcdResponse {
            host_uuid: host.uuid,
            ttys_dcd: host.ttys_dcd,
        })
    }
}
