//! Agent audit loop.
//!
//! Each audit matches this host to an inventory record, then reports facts:
//! the full snapshot once (again after a server-side failure) and the
//! recurring categories every `recurring_every` audits. Failures never end
//! the loop; they are absorbed into the [`Session`] and retried next audit.

use crate::collectors::{Collector, LldpFacts};
use crate::command::CommandRunner;
use crate::config::AgentConfig;
use crate::discovery;
use crate::error::AgentError;
use crate::netlock::NetworkLock;
use crate::session::Session;
use crate::ttys;
use inventory_client::InventoryRpc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Runs the periodic audit against the inventory reconciler.
pub struct Agent {
    config: Arc<AgentConfig>,
    client: Arc<dyn InventoryRpc>,
    runner: Arc<dyn CommandRunner>,
    collector: Collector,
}

impl Agent {
    /// Agent over an RPC client and command runner.
    pub fn new(config: Arc<AgentConfig>, client: Arc<dyn InventoryRpc>, runner: Arc<dyn CommandRunner>) -> Self {
        let collector = Collector::new(Arc::clone(&config), Arc::clone(&runner));
        Self {
            config,
            client,
            runner,
            collector,
        }
    }

    /// Audit forever, starting immediately.
    pub async fn run(&self) -> Result<(), AgentError> {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.audit_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("Agent audit started, interval {}s", self.config.audit_interval_secs);

        let mut session = Session::default();
        loop {
            interval.tick().await;
            self.audit(&mut session).await;
        }
    }

    /// One audit: match the host, report what is due, then apply host-side settings.
    pub async fn audit(&self, session: &mut Session) {
        session.audits += 1;

        let Some(uuid) = self.match_host(session).await else {
            return;
        };

        if !session.lldp_discovered
            && session.lldp_discovery.is_none()
            && !self.config.sentinels.initial_config_complete.exists()
        {
            let heard = discovery::discover_lldp(&self.config, self.runner.as_ref()).await;
            debug!("pre-configuration discovery found {} neighbours", heard.neighbours.len());
            session.lldp_discovery = Some(heard);
        }

        let result = self.report_facts(session, uuid).await;
        if !self.settle(session, "fact report", result) {
            return;
        }
        let result = self.report_platform(session, uuid).await;
        if !self.settle(session, "platform report", result) {
            return;
        }
        let result = self.report_subfunctions(session, uuid).await;
        if !self.settle(session, "subfunctions report", result) {
            return;
        }
        let result = self.sync_ttys_dcd(session, uuid).await;
        self.settle(session, "console sync", result);
    }

    async fn match_host(&self, session: &mut Session) -> Option<Uuid> {
        if let Some(uuid) = session.host_uuid() {
            return Some(uuid);
        }

        let macs = match self.collector.mgmt_macs() {
            Ok(macs) if !macs.is_empty() => macs,
            Ok(_) => {
                warn!("no management MAC found, cannot identify this host");
                return None;
            }
            Err(e) => {
                warn!("cannot read ports: {}", e);
                return None;
            }
        };

        match self.client.get_host_by_macs(&macs).await {
            Ok(host) => {
                info!("Matched inventory host {} ({})", host.display_name(), host.uuid);
                let uuid = host.uuid;
                session.matched(host);
                Some(uuid)
            }
            Err(e) if e.is_not_found() => {
                info!("host with MACs {} not known to inventory yet", macs.join(", "));
                None
            }
            Err(e) => {
                warn!("host lookup failed, retrying next audit: {}", e);
                None
            }
        }
    }

    async fn report_facts(&self, session: &mut Session, uuid: Uuid) -> Result<(), AgentError> {
        if session.needs_full_report() {
            self.send_full(uuid, session.lldp_discovery.as_ref()).await?;
            session.registered = true;
            session.resend_required = false;
            if session.lldp_discovery.take().is_some() {
                session.lldp_discovered = true;
            }
            info!("Full fact report accepted for {}", uuid);
        } else if session.recurring_due(self.config.recurring_every) {
            self.send_recurring(uuid).await?;
            debug!("recurring report sent for {}", uuid);
        }
        Ok(())
    }

    /// Send every fact category. LLDP facts heard during discovery are
    /// added to what the links report now.
    async fn send_full(&self, uuid: Uuid, discovered: Option<&LldpFacts>) -> Result<(), AgentError> {
        let mut snapshot = self.collector.snapshot().await?;
        if let Some(heard) = discovered {
            heard.extend_missing(&mut snapshot.lldp_agents, &mut snapshot.lldp_neighbours);
        }
        info!(
            "Reporting {} ports, {} PCI devices, {} NUMA nodes, {} cpus (hyperthreading {})",
            snapshot.ports.len(),
            snapshot.pci_devices.len(),
            snapshot.numa_nodes.len(),
            snapshot.cpus.len(),
            if snapshot.hyperthreaded() { "on" } else { "off" }
        );

        let client = &self.client;
        client.port_update_by_host(uuid, snapshot.ports).await?;
        client.pci_device_update_by_host(uuid, snapshot.pci_devices).await?;
        client.numas_update_by_host(uuid, snapshot.numa_nodes).await?;
        client.cpus_update_by_host(uuid, snapshot.cpus).await?;
        client.memory_update_by_host(uuid, snapshot.memory).await?;
        client.lldp_agent_update_by_host(uuid, snapshot.lldp_agents).await?;
        client.lldp_neighbour_update_by_host(uuid, snapshot.lldp_neighbours).await?;
        Ok(())
    }

    async fn send_recurring(&self, uuid: Uuid) -> Result<(), AgentError> {
        self.client
            .memory_update_by_host(uuid, self.collector.memory()?)
            .await?;
        match self.collector.lldp().await {
            Ok(lldp) => {
                self.client.lldp_agent_update_by_host(uuid, lldp.agents).await?;
                self.client
                    .lldp_neighbour_update_by_host(uuid, lldp.neighbours)
                    .await?;
            }
            Err(e) => debug!("LLDP skipped this cycle: {}", e),
        }
        Ok(())
    }

    /// Uptime goes out with every recurring report; the first report after
    /// the platform-ready flag appears is marked so the reconciler can
    /// promote the host.
    async fn report_platform(&self, session: &mut Session, uuid: Uuid) -> Result<(), AgentError> {
        let first = self.config.sentinels.platform_ready.exists() && !session.platform_ready_reported;
        if !first && !session.recurring_due(self.config.recurring_every) {
            return Ok(());
        }
        let host = self
            .client
            .platform_update_by_host(uuid, self.collector.platform(first))
            .await?;
        if first {
            info!("Platform ready reported, host is {}", host.invprovision);
            session.platform_ready_reported = true;
        }
        session.host = Some(host);
        Ok(())
    }

    async fn report_subfunctions(&self, session: &mut Session, uuid: Uuid) -> Result<(), AgentError> {
        if let Some(subfunctions) = self.config.subfunctions.as_deref()
            && !session.subfunctions_reported
        {
            self.client
                .subfunctions_update_by_host(uuid, subfunctions)
                .await?;
            session.subfunctions_reported = true;
        }
        if !session.subfunctions_notified && self.config.sentinels.subfunctions_config_complete.exists() {
            self.client.notify_subfunctions_config(uuid).await?;
            info!("Subfunction configuration complete");
            session.subfunctions_notified = true;
        }
        Ok(())
    }

    async fn sync_ttys_dcd(&self, session: &mut Session, uuid: Uuid) -> Result<(), AgentError> {
        let desired = self.client.get_host_ttys_dcd(uuid).await?.ttys_dcd;
        let Some(enabled) = desired else {
            return Ok(());
        };
        if session.ttys_dcd == Some(enabled) {
            return Ok(());
        }

        let _lock = NetworkLock::acquire(&self.config.lock).await;
        ttys::apply_ttys_dcd(self.runner.as_ref(), &self.config.tty_device, enabled).await?;
        info!(
            "Console {} carrier detect {}",
            self.config.tty_device,
            if enabled { "enabled" } else { "disabled" }
        );
        session.ttys_dcd = Some(enabled);
        Ok(())
    }

    /// Absorb a failed step. Returns false when the session lost its host
    /// and the rest of the audit must be skipped.
    fn settle(&self, session: &mut Session, what: &str, result: Result<(), AgentError>) -> bool {
        let Err(err) = result else {
            return true;
        };
        match &err {
            AgentError::Rpc(e) if e.is_timeout() => {
                warn!("{} timed out, retrying next audit: {}", what, e);
            }
            AgentError::Rpc(e) if e.is_not_found() => {
                warn!("{} failed, host no longer known: {}; rediscovering", what, e);
                session.reset();
            }
            AgentError::Rpc(e) if e.is_internal() => {
                error!("{} failed on the reconciler: {}; full resend next audit", what, e);
                session.resend_required = true;
            }
            _ => warn!("{} failed: {}", what, err),
        }
        session.host.is_some()
    }
}
