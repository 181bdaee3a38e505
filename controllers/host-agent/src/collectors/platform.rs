//! Platform report: uptime and iSCSI initiator name.

use crate::config::AgentConfig;
use inventory_types::PlatformReport;
use std::path::Path;

/// Platform report built from sentinel files and uptime.
pub fn collect_platform(config: &AgentConfig, first_report: bool) -> PlatformReport {
    PlatformReport {
        first_report,
        install_state: None,
        iscsi_initiator_name: iscsi_initiator_name(&config.iscsi_initiator_file),
        uptime_secs: uptime_secs(&config.procfs_root),
    }
}

fn uptime_secs(procfs: &Path) -> Option<u64> {
    let text = std::fs::read_to_string(procfs.join("uptime")).ok()?;
    let seconds: f64 = text.split_whitespace().next()?.parse().ok()?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "whole seconds of a non-negative uptime")]
    let whole = seconds as u64;
    Some(whole)
}

fn iscsi_initiator_name(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| line.strip_prefix("InitiatorName="))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
