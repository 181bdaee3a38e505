//! LLDP discovery on hosts that are not configured yet.
//!
//! Administratively down links cannot hear neighbours, so they are brought
//! up for a bounded polling window and put back down afterwards whatever
//! the outcome. What was heard is returned so it can go out with the full
//! report; once the links are down again it can no longer be read.

use crate::collectors::{lldp, ports};
use crate::command::CommandRunner;
use crate::config::AgentConfig;
use crate::collectors::LldpFacts;
use crate::netlock::NetworkLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Raise down interfaces, wait for neighbours, then restore the interfaces.
pub async fn discover_lldp(config: &AgentConfig, runner: &dyn CommandRunner) -> LldpFacts {
    let ports = match ports::collect_ports(&config.sysfs_root) {
        Ok(ports) => ports,
        Err(e) => {
            warn!("LLDP discovery skipped, ports unreadable: {}", e);
            return LldpFacts::default();
        }
    };

    let _lock = NetworkLock::acquire(&config.lock).await;
    let mut raised = Vec::new();
    for port in ports.iter().filter(|p| !ports::admin_up(&config.sysfs_root, &p.name)) {
        match set_link(runner, &port.name, "up").await {
            Ok(()) => raised.push(port.name.clone()),
            Err(e) => warn!("cannot bring {} up for LLDP: {}", port.name, e),
        }
    }
    if !raised.is_empty() {
        info!("brought {} up for LLDP discovery", raised.join(", "));
    }

    let heard = poll_neighbours(config, runner).await;

    for name in &raised {
        if let Err(e) = set_link(runner, name, "down").await {
            error!("failed to restore {} to down: {}", name, e);
        }
    }
    heard
}

async fn poll_neighbours(config: &AgentConfig, runner: &dyn CommandRunner) -> LldpFacts {
    let deadline = Instant::now() + Duration::from_secs(config.lldp.poll_window_secs);
    let interval = Duration::from_millis(config.lldp.poll_interval_ms);
    loop {
        match lldp::collect_lldp(runner, &config.lldp.lldpcli).await {
            Ok(facts) if !facts.neighbours.is_empty() => {
                info!("LLDP discovery heard {} neighbours", facts.neighbours.len());
                return facts;
            }
            Ok(_) => debug!("no LLDP neighbours yet"),
            Err(e) => debug!("lldpcli not ready: {}", e),
        }
        if Instant::now() + interval > deadline {
            info!("LLDP discovery window elapsed without neighbours");
            return LldpFacts::default();
        }
        tokio::time::sleep(interval).await;
    }
}

async fn set_link(runner: &dyn CommandRunner, name: &str, state: &str) -> Result<(), crate::error::AgentError> {
    runner.run("ip", &["link", "set", "dev", name, state]).await?;
    Ok(())
}
