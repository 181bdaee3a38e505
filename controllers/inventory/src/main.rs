//! Inventory Controller
//!
//! Central authority for host records. Serves the agent RPCs and the host
//! lifecycle REST surface, forwards accepted actions to maintenance and the
//! VIM, and runs the periodic self-healing audits.

mod api;
mod audit;
mod config;
mod controller;
mod error;
mod identity;
mod lifecycle;
mod locks;
mod metrics;
mod notify;
mod reconciler;
mod store;

#[cfg(test)]
mod test_utils;

use crate::config::InventoryConfig;
use crate::error::ControllerError;
use crate::identity::ControllerIdentity;
use controller::Controller;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Inventory Controller");

    let config = InventoryConfig::load()?;
    info!("Configuration:");
    info!("  Hostname: {}", config.hostname);
    info!("  System: {} {}", config.system_type, config.system_mode);
    info!("  Listen: {}", config.listen_addr);
    info!("  mtce: {}:{}", config.mtce.address, config.mtce.port);
    info!("  VIM: {}", config.vim.url);

    let identity = Arc::new(ControllerIdentity::new());
    identity.set(config.hostname.clone())?;

    let controller = Controller::new(config, identity).await?;
    controller.run().await?;

    Ok(())
}
