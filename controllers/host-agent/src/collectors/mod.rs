//! Hardware fact collectors.
//!
//! Each collector only reads sysfs, procfs or the output of a host command.
//! Roots are configurable so collectors can run against a fixture tree.

pub mod cpu;
pub mod lldp;
pub mod memory;
pub mod numa;
pub mod pci;
pub mod platform;
pub mod ports;

use crate::command::CommandRunner;
use crate::config::AgentConfig;
use crate::error::AgentError;
use inventory_types::{FactSnapshot, PlatformReport, normalize_mac};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

pub use lldp::LldpFacts;

/// Collects every fact category for this host.
pub struct Collector {
    config: Arc<AgentConfig>,
    runner: Arc<dyn CommandRunner>,
}

impl Collector {
    /// Collector reading the roots named in `config`.
    pub fn new(config: Arc<AgentConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// MACs that can identify this host: the management interface when
    /// configured, otherwise every physical port.
    pub fn mgmt_macs(&self) -> Result<Vec<String>, AgentError> {
        let ports = ports::collect_ports(&self.config.sysfs_root)?;
        let macs = ports
            .into_iter()
            .filter(|p| {
                self.config
                    .mgmt_interface
                    .as_deref()
                    .is_none_or(|name| p.name == name)
            })
            .map(|p| normalize_mac(&p.mac))
            .filter(|mac| !mac.is_empty() && mac != "00:00:00:00:00:00")
            .collect();
        Ok(macs)
    }

    /// Full snapshot. LLDP is optional: when it cannot be read the LLDP lists are empty.
    pub async fn snapshot(&self) -> Result<FactSnapshot, AgentError> {
        let sysfs = &self.config.sysfs_root;
        let procfs = &self.config.procfs_root;
        let lldp = self.lldp().await.unwrap_or_else(|e| {
            warn!("LLDP facts unavailable: {}", e);
            LldpFacts::default()
        });

        Ok(FactSnapshot {
            ports: ports::collect_ports(sysfs)?,
            pci_devices: pci::collect_pci_devices(sysfs)?,
            numa_nodes: numa::collect_numa_nodes(sysfs)?,
            cpus: cpu::collect_cpus(sysfs, procfs)?,
            memory: memory::collect_memory(sysfs, procfs)?,
            lldp_agents: lldp.agents,
            lldp_neighbours: lldp.neighbours,
        })
    }

    /// Memory per NUMA node.
    pub fn memory(&self) -> Result<Vec<inventory_types::MemoryFact>, AgentError> {
        memory::collect_memory(&self.config.sysfs_root, &self.config.procfs_root)
    }

    /// LLDP agents and neighbours.
    pub async fn lldp(&self) -> Result<LldpFacts, AgentError> {
        lldp::collect_lldp(self.runner.as_ref(), &self.config.lldp.lldpcli).await
    }

    /// Platform report for this audit.
    pub fn platform(&self, first_report: bool) -> PlatformReport {
        platform::collect_platform(&self.config, first_report)
    }
}

/// File contents without surrounding whitespace; `None` when unreadable or empty.
pub(crate) fn read_trimmed(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(crate) fn read_parsed<T: FromStr>(path: &Path) -> Option<T> {
    read_trimmed(path)?.parse().ok()
}

/// Final component of a symlink's target, e.g. the driver behind `device/driver`.
pub(crate) fn link_name(path: &Path) -> Option<String> {
    let target = std::fs::read_link(path).ok()?;
    target.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Entries of `dir` named `{prefix}{n}`, sorted by `n`. A missing directory has none.
pub(crate) fn numbered_entries(dir: &Path, prefix: &str) -> Result<Vec<(u32, PathBuf)>, AgentError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(n) = name
            .to_str()
            .and_then(|s| s.strip_prefix(prefix))
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };
        found.push((n, entry.path()));
    }
    found.sort_by_key(|(n, _)| *n);
    Ok(found)
}

/// Parse a kernel cpu list such as `0-3,8,10-11`.
pub(crate) fn parse_cpu_list(list: &str) -> Result<Vec<u32>, AgentError> {
    let mut cpus = Vec::new();
    for part in list.trim().split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.parse().map_err(|_| AgentError::parse("cpu list", list))?;
                let end: u32 = end.parse().map_err(|_| AgentError::parse("cpu list", list))?;
                cpus.extend(start..=end);
            }
            None => cpus.push(part.parse().map_err(|_| AgentError::parse("cpu list", list))?),
        }
    }
    cpus.sort_unstable();
    cpus.dedup();
    Ok(cpus)
}
