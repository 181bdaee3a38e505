//! Host Agent
//!
//! Runs on every host. Discovers hardware facts (CPU and NUMA topology,
//! memory, ports, PCI devices, LLDP) and reports them to the inventory
//! reconciler on a fixed audit interval.

mod agent;
mod collectors;
mod command;
mod config;
mod discovery;
mod error;
mod netlock;
mod session;
mod ttys;

#[cfg(test)]
mod agent_test;
#[cfg(test)]
mod test_utils;

use crate::agent::Agent;
use crate::command::HostCommandRunner;
use crate::config::AgentConfig;
use crate::error::AgentError;
use inventory_client::InventoryClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Host Agent");

    let config = AgentConfig::load()?;
    info!("Configuration:");
    info!("  Inventory URL: {}", config.inventory_url);
    info!("  Audit interval: {}s", config.audit_interval_secs);
    info!(
        "  Management interface: {}",
        config.mgmt_interface.as_deref().unwrap_or("all ports")
    );

    let client = InventoryClient::new(config.inventory_url.clone(), config.rpc_timeout())?;
    let agent = Agent::new(Arc::new(config), Arc::new(client), Arc::new(HostCommandRunner));
    agent.run().await?;

    Ok(())
}
