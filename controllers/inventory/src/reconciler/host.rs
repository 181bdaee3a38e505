//! Host identity RPCs.

use super::Reconciler;
use crate::error::ControllerError;
use inventory_types::{Host, HostCreate, HostUpdate, InvProvision, normalize_mac};
use tracing::{debug, info};
use uuid::Uuid;

impl Reconciler {
    /// Host owning any of `macs`, management or port.
    pub async fn get_host_by_macs(&self, macs: &[String]) -> Result<Host, ControllerError> {
        self.store
            .read()
            .await
            .find_by_macs(macs)
            .cloned()
            .ok_or_else(|| {
                ControllerError::NotFound(format!("No host matches MACs {}", macs.join(", ")))
            })
    }

    /// Host by hostname.
    pub async fn get_host_by_hostname(&self, hostname: &str) -> Result<Host, ControllerError> {
        self.store
            .read()
            .await
            .find_by_hostname(hostname)
            .cloned()
            .ok_or_else(|| ControllerError::NotFound(format!("Host {hostname} could not be found")))
    }

    /// Create a host from a boot event. The same MAC never creates a second host.
    pub async fn create_host(&self, values: HostCreate) -> Result<Host, ControllerError> {
        let mac = normalize_mac(&values.mgmt_mac);
        if mac.is_empty() {
            return Err(ControllerError::Validation(
                "mgmt_mac is required to create a host".to_string(),
            ));
        }

        let mut inner = self.store.write().await;
        if let Some(existing) = inner.find_by_macs(std::slice::from_ref(&mac)) {
            debug!("host with MAC {} already exists as {}", mac, existing.uuid);
            return Ok(existing.clone());
        }
        if let Some(hostname) = values.hostname.as_deref()
            && inner.find_by_hostname(hostname).is_some()
        {
            return Err(ControllerError::Conflict(format!(
                "Host name {hostname} already in use"
            )));
        }

        let mut host = Host::new(mac);
        host.mgmt_ip = values.mgmt_ip;
        host.hostname = values.hostname;
        host.boot_device = values.boot_device;
        host.rootfs_device = values.rootfs_device;
        host.console = values.console;
        host.location = values.location;
        if let Some(personality) = values.personality {
            host.personality = Some(personality);
            host.subfunctions = Some(self.config.subfunctions_for(personality));
        }

        info!("Created host {} for MAC {}", host.uuid, host.mgmt_mac);
        inner.insert(host.clone());
        Ok(host)
    }

    /// Refresh reported (non-lifecycle) fields.
    pub async fn update_host(&self, uuid: Uuid, values: HostUpdate) -> Result<Host, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        let mut inner = self.store.write().await;
        let mut host = inner.host(uuid)?.clone();

        fn set<T: PartialEq>(field: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *field = value;
            }
        }
        set(&mut host.mgmt_ip, values.mgmt_ip);
        set(&mut host.boot_device, values.boot_device);
        set(&mut host.rootfs_device, values.rootfs_device);
        set(&mut host.console, values.console);
        set(&mut host.iscsi_initiator_name, values.iscsi_initiator_name);
        set(&mut host.serialid, values.serialid);
        set(&mut host.bm_type, values.bm_type);
        set(&mut host.bm_ip, values.bm_ip);
        set(&mut host.bm_username, values.bm_username);
        if let Some(uptime) = values.uptime {
            host.uptime = uptime;
        }

        inner.save_host(host)
    }

    /// Generate configuration for a host about to be unlocked.
    pub async fn configure_host(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        self.configure_in_sequence(uuid).await
    }

    /// [`configure_host`](Self::configure_host) for a caller already holding
    /// the host's sequence lock.
    pub(crate) async fn configure_in_sequence(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let mut inner = self.store.write().await;
        let mut host = inner.host(uuid)?.clone();

        let missing = host.missing_identity_fields();
        if !missing.is_empty() {
            return Err(ControllerError::Validation(format!(
                "Can not configure host {}: {} not set",
                host.display_name(),
                missing.join(", ")
            )));
        }
        if host.invprovision == InvProvision::Unprovisioned {
            info!("Configuring host {}", host.display_name());
            host.invprovision = InvProvision::Provisioning;
        }
        inner.save_host(host)
    }

    /// Undo [`configure_host`](Self::configure_host) for a host that never became provisioned.
    pub async fn unconfigure_host(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let _sequence = self.locks.sequence(uuid).await;
        self.unconfigure_in_sequence(uuid).await
    }

    pub(crate) async fn unconfigure_in_sequence(&self, uuid: Uuid) -> Result<Host, ControllerError> {
        let mut inner = self.store.write().await;
        let mut host = inner.host(uuid)?.clone();
        if host.invprovision == InvProvision::Provisioning {
            info!("Unconfiguring host {}", host.display_name());
            host.invprovision = InvProvision::Unprovisioned;
        }
        inner.save_host(host)
    }
}
