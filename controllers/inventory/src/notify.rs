//! Outbound notifications to mtce, the VIM and the quorum service.
//!
//! Wraps the coordinator traits with the configured timeouts and retry
//! counts and converts failures into [`ControllerError`].

use crate::config::InventoryConfig;
use crate::error::ControllerError;
use coordinator_client::{
    MtceApi, MtceClient, MtceHostRecord, MtceResponse, QuorumApi, QuorumClient, VimApi,
    VimClient, VimHostRecord,
};
use inventory_types::{Host, HostAction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Coordinator clients with their configured timeouts.
#[derive(Clone)]
pub struct Notifier {
    mtce: Arc<dyn MtceApi>,
    vim: Arc<dyn VimApi>,
    quorum: Arc<dyn QuorumApi>,
    mtce_timeout: Duration,
    mtce_retries: u32,
    vim_timeout: Duration,
    quorum_timeout: Duration,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("mtce_timeout", &self.mtce_timeout)
            .field("vim_timeout", &self.vim_timeout)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Notifier over explicit clients, for tests and custom wiring.
    pub fn new(
        config: &InventoryConfig,
        mtce: Arc<dyn MtceApi>,
        vim: Arc<dyn VimApi>,
        quorum: Arc<dyn QuorumApi>,
    ) -> Self {
        Self {
            mtce,
            vim,
            quorum,
            mtce_timeout: config.mtce_timeout(),
            mtce_retries: config.mtce.retries,
            vim_timeout: config.vim_timeout(),
            quorum_timeout: config.quorum_timeout(),
        }
    }

    /// Build the reqwest-backed clients from configuration.
    pub fn from_config(config: &InventoryConfig) -> Result<Self, ControllerError> {
        let mtce = MtceClient::new(&config.mtce.address, config.mtce.port, config.mtce.token.clone())
            .map_err(ControllerError::from)?;
        let vim = VimClient::new(config.vim.url.clone()).map_err(ControllerError::from)?;
        let quorum = QuorumClient::new(config.quorum.url.clone()).map_err(ControllerError::from)?;
        Ok(Self::new(config, Arc::new(mtce), Arc::new(vim), Arc::new(quorum)))
    }

    /// Register a newly bound host with mtce.
    pub async fn mtce_add(&self, host: &Host) -> Result<MtceResponse, ControllerError> {
        let record = MtceHostRecord::from_host(host, HostAction::None);
        debug!("mtce host_add {}", host.display_name());
        let response = self
            .mtce
            .host_add(&record, self.mtce_timeout, self.mtce_retries)
            .await?;
        require_pass(response, "host_add", host)
    }

    /// Send `action` for the host to mtce.
    pub async fn mtce_modify(&self, host: &Host, action: HostAction) -> Result<MtceResponse, ControllerError> {
        let record = MtceHostRecord::from_host(host, action);
        debug!("mtce host_modify {} action={}", host.display_name(), action);
        let response = self
            .mtce
            .host_modify(&record, self.mtce_timeout, self.mtce_retries)
            .await?;
        require_pass(response, "host_modify", host)
    }

    /// Remove a host from mtce.
    pub async fn mtce_delete(&self, host: &Host) -> Result<MtceResponse, ControllerError> {
        let record = MtceHostRecord::from_host(host, HostAction::None);
        let response = self
            .mtce
            .host_delete(&record, self.mtce_timeout, self.mtce_retries)
            .await?;
        require_pass(response, "host_delete", host)
    }

    /// Register a newly bound host with the VIM.
    pub async fn vim_add(&self, host: &Host) -> Result<(), ControllerError> {
        Ok(self
            .vim
            .vim_host_add(&VimHostRecord::from_host(host), self.vim_timeout)
            .await?)
    }

    /// Ask the VIM to carry out `action`, forced for `force-*` actions.
    pub async fn vim_action(&self, host: &Host, action: HostAction) -> Result<(), ControllerError> {
        debug!("vim host_action {} action={}", host.display_name(), action);
        Ok(self
            .vim
            .vim_host_action(
                &VimHostRecord::from_host(host),
                action,
                action.is_forced(),
                self.vim_timeout,
            )
            .await?)
    }

    /// Remove a host from the VIM.
    pub async fn vim_delete(&self, host: &Host) -> Result<(), ControllerError> {
        Ok(self
            .vim
            .vim_host_delete(&VimHostRecord::from_host(host), self.vim_timeout)
            .await?)
    }

    /// `(current_monitor_count, required_monitor_count)`
    pub async fn monitor_counts(&self) -> Result<(u32, u32), ControllerError> {
        Ok(self.quorum.monitor_status(self.quorum_timeout).await?.counts())
    }

    /// mtce modify whose failure is logged and otherwise ignored.
    pub async fn mtce_modify_best_effort(&self, host: &Host, action: HostAction) {
        if let Err(e) = self.mtce_modify(host, action).await {
            error!(
                "mtce notification for {} (action {}) failed: {}",
                host.display_name(),
                action,
                e
            );
        }
    }
}

/// A `fail` reply is a rejection even though the call itself succeeded.
fn require_pass(response: MtceResponse, op: &str, host: &Host) -> Result<MtceResponse, ControllerError> {
    if response.is_pass() {
        return Ok(response);
    }
    Err(ControllerError::External(format!(
        "mtce {op} for {} failed: {}",
        host.display_name(),
        response.reason.as_deref().unwrap_or("no reason given")
    )))
}
