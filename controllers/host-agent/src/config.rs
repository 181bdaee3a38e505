//! Agent configuration.
//!
//! An optional YAML file named by `HOST_AGENT_CONFIG` is read first, then
//! environment variables override single keys.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Network-config lock policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub path: PathBuf,
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/run/hostops/network-config.lock"),
            attempts: 5,
            backoff_ms: 1000,
        }
    }
}

/// LLDP discovery on hosts that are not configured yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LldpConfig {
    /// Longest wait for neighbour data after links come up
    pub poll_window_secs: u64,
    pub poll_interval_ms: u64,
    pub lldpcli: String,
}

impl Default for LldpConfig {
    fn default() -> Self {
        Self {
            poll_window_secs: 30,
            poll_interval_ms: 5000,
            lldpcli: "lldpcli".to_string(),
        }
    }
}

/// Durable flags written by the platform's own configuration steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub initial_config_complete: PathBuf,
    pub platform_ready: PathBuf,
    pub subfunctions_config_complete: PathBuf,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            initial_config_complete: PathBuf::from("/etc/platform/.initial_config_complete"),
            platform_ready: PathBuf::from("/var/run/.platform_ready"),
            subfunctions_config_complete: PathBuf::from("/var/run/.worker_config_complete"),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub inventory_url: String,
    pub rpc_timeout_secs: u64,
    pub audit_interval_secs: u64,
    /// Memory and LLDP are resent every this many audits
    pub recurring_every: u64,
    /// Interface whose MAC identifies this host; all ports when unset
    pub mgmt_interface: Option<String>,
    /// Platform subfunctions, reported once after the host is matched
    pub subfunctions: Option<String>,
    pub sysfs_root: PathBuf,
    pub procfs_root: PathBuf,
    pub iscsi_initiator_file: PathBuf,
    pub tty_device: String,
    pub sentinels: SentinelConfig,
    pub lock: LockConfig,
    pub lldp: LldpConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            inventory_url: "http://127.0.0.1:6385".to_string(),
            rpc_timeout_secs: 10,
            audit_interval_secs: 60,
            recurring_every: 5,
            mgmt_interface: None,
            subfunctions: None,
            sysfs_root: PathBuf::from("/sys"),
            procfs_root: PathBuf::from("/proc"),
            iscsi_initiator_file: PathBuf::from("/etc/iscsi/initiatorname.iscsi"),
            tty_device: "/dev/ttyS0".to_string(),
            sentinels: SentinelConfig::default(),
            lock: LockConfig::default(),
            lldp: LldpConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from the environment, then the file named by `HOSTOPS_AGENT_CONFIG`.
    pub fn load() -> Result<Self, AgentError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Defaults, then the file from `HOSTOPS_AGENT_CONFIG`, then `HOSTOPS_AGENT_*` overrides, all read through `lookup`.
    pub fn from_sources<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("HOST_AGENT_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(v) = lookup("INVENTORY_URL") {
            config.inventory_url = v;
        }
        if let Some(v) = lookup("RPC_TIMEOUT_SECS") {
            config.rpc_timeout_secs = parse("RPC_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("AUDIT_INTERVAL_SECS") {
            config.audit_interval_secs = parse("AUDIT_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("MGMT_INTERFACE") {
            config.mgmt_interface = Some(v);
        }
        if let Some(v) = lookup("PLATFORM_SUBFUNCTIONS") {
            config.subfunctions = Some(v);
        }
        if let Some(v) = lookup("SYSFS_ROOT") {
            config.sysfs_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("PROCFS_ROOT") {
            config.procfs_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("NETWORK_LOCK_PATH") {
            config.lock.path = PathBuf::from(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AgentError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            AgentError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.audit_interval_secs == 0 {
            return Err(AgentError::InvalidConfig(
                "audit interval must be at least one second".to_string(),
            ));
        }
        if self.recurring_every == 0 {
            return Err(AgentError::InvalidConfig(
                "recurring report cadence must be at least 1".to_string(),
            ));
        }
        if self.lock.attempts == 0 {
            return Err(AgentError::InvalidConfig(
                "network lock needs at least one attempt".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout for one RPC.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AgentError> {
    value
        .trim()
        .parse()
        .map_err(|_| AgentError::InvalidConfig(format!("invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_sources(lookup(&[])).unwrap();
        assert_eq!(config.audit_interval_secs, 60);
        assert_eq!(config.recurring_every, 5);
        assert_eq!(config.lock.attempts, 5);
        assert_eq!(config.lldp.poll_window_secs, 30);
    }

    #[test]
    fn test_yaml_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "recurring_every: 3\nlock:\n  attempts: 2\nsubfunctions: controller,worker\n"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = AgentConfig::from_sources(lookup(&[
            ("HOST_AGENT_CONFIG", path.as_str()),
            ("INVENTORY_URL", "http://10.0.0.2:6385"),
            ("MGMT_INTERFACE", "eno1"),
        ]))
        .unwrap();
        assert_eq!(config.recurring_every, 3);
        assert_eq!(config.lock.attempts, 2);
        assert_eq!(config.lock.backoff_ms, 1000);
        assert_eq!(config.subfunctions.as_deref(), Some("controller,worker"));
        assert_eq!(config.inventory_url, "http://10.0.0.2:6385");
        assert_eq!(config.mgmt_interface.as_deref(), Some("eno1"));
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "recurring_every: 0").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let err = AgentConfig::from_sources(lookup(&[("HOST_AGENT_CONFIG", path.as_str())]));
        assert!(matches!(err, Err(AgentError::InvalidConfig(_))));
    }
}
