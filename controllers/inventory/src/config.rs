//! Controller configuration.
//!
//! Values come from an optional YAML file named by `INVENTORY_CONFIG`, then
//! individual environment variables override single keys. Every key has a
//! default so the controller starts with an empty environment.

use crate::error::ControllerError;
use inventory_types::Personality;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};

/// Duplex systems have two controllers; simplex systems have one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SystemMode {
    #[default]
    Duplex,
    Simplex,
}

/// All-in-one systems run the worker subfunction on controllers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SystemType {
    #[default]
    Standard,
    AllInOne,
}

/// Maintenance (mtce) endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtceConfig {
    pub address: String,
    pub port: u16,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for MtceConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 2112,
            token: None,
            timeout_secs: 10,
            retries: 3,
        }
    }
}

/// VIM endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VimConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for VimConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:30001".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Storage quorum endpoint and the monitor floor for locking storage hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Floor applied on top of the count the storage service reports
    pub min_monitors: u32,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5001".to_string(),
            timeout_secs: 5,
            min_monitors: 2,
        }
    }
}

/// Audit cadence and decay thresholds, counted in audit passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub interval_secs: u64,
    pub install_fail_threshold: u32,
    pub booting_fail_threshold: u32,
    pub pending_clear_threshold: u32,
    pub force_lock_escalation: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            install_fail_threshold: 15,
            booting_fail_threshold: 40,
            pending_clear_threshold: 10,
            force_lock_escalation: 2,
        }
    }
}

/// Default CPU role allocation, in physical cores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuAllocationConfig {
    pub platform_cores_controller: u32,
    pub platform_cores_other: u32,
    pub vswitch_cores: u32,
    pub shared_cores: u32,
}

impl Default for CpuAllocationConfig {
    fn default() -> Self {
        Self {
            platform_cores_controller: 2,
            platform_cores_other: 1,
            vswitch_cores: 1,
            shared_cores: 0,
        }
    }
}

/// Reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub listen_addr: SocketAddr,
    /// Hostname of the controller this reconciler runs on
    pub hostname: String,
    pub system_mode: SystemMode,
    pub system_type: SystemType,
    pub mtce: MtceConfig,
    pub vim: VimConfig,
    pub quorum: QuorumConfig,
    pub audit: AuditConfig,
    pub cpu: CpuAllocationConfig,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 6385)),
            hostname: "controller-0".to_string(),
            system_mode: SystemMode::default(),
            system_type: SystemType::default(),
            mtce: MtceConfig::default(),
            vim: VimConfig::default(),
            quorum: QuorumConfig::default(),
            audit: AuditConfig::default(),
            cpu: CpuAllocationConfig::default(),
        }
    }
}

impl InventoryConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ControllerError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for environment variables.
    pub fn from_sources<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("INVENTORY_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(v) = lookup("INVENTORY_LISTEN_ADDR") {
            config.listen_addr = parse("INVENTORY_LISTEN_ADDR", &v)?;
        }
        if let Some(v) = lookup("INVENTORY_HOSTNAME").or_else(|| lookup("HOSTNAME")) {
            config.hostname = v;
        }
        if let Some(v) = lookup("INVENTORY_SYSTEM_MODE") {
            config.system_mode = parse("INVENTORY_SYSTEM_MODE", &v)?;
        }
        if let Some(v) = lookup("INVENTORY_SYSTEM_TYPE") {
            config.system_type = parse("INVENTORY_SYSTEM_TYPE", &v)?;
        }
        if let Some(v) = lookup("MTCE_ADDRESS") {
            config.mtce.address = v;
        }
        if let Some(v) = lookup("MTCE_PORT") {
            config.mtce.port = parse("MTCE_PORT", &v)?;
        }
        if let Some(v) = lookup("MTCE_TOKEN") {
            config.mtce.token = Some(v);
        }
        if let Some(v) = lookup("VIM_URL") {
            config.vim.url = v;
        }
        if let Some(v) = lookup("QUORUM_URL") {
            config.quorum.url = v;
        }
        if let Some(v) = lookup("CEPH_MIN_MONITORS") {
            config.quorum.min_monitors = parse("CEPH_MIN_MONITORS", &v)?;
        }
        if let Some(v) = lookup("AUDIT_INTERVAL_SECS") {
            config.audit.interval_secs = parse("AUDIT_INTERVAL_SECS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ControllerError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            ControllerError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if self.hostname.trim().is_empty() {
            return Err(ControllerError::InvalidConfig(
                "controller hostname must not be empty".to_string(),
            ));
        }
        if self.audit.interval_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "audit interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout for one mtce attempt.
    pub fn mtce_timeout(&self) -> Duration {
        Duration::from_secs(self.mtce.timeout_secs)
    }

    /// Timeout for one VIM call.
    pub fn vim_timeout(&self) -> Duration {
        Duration::from_secs(self.vim.timeout_secs)
    }

    /// Timeout for one quorum query.
    pub fn quorum_timeout(&self) -> Duration {
        Duration::from_secs(self.quorum.timeout_secs)
    }

    /// Single-controller system.
    pub fn is_simplex(&self) -> bool {
        self.system_mode == SystemMode::Simplex
    }

    /// Subfunctions bound to a host of `personality` on this system.
    pub fn subfunctions_for(&self, personality: Personality) -> String {
        match (personality, self.system_type) {
            (Personality::Controller, SystemType::AllInOne) => "controller,worker".to_string(),
            (Personality::Controller, SystemType::Standard) => "controller".to_string(),
            (Personality::Worker, _) => "worker".to_string(),
            (Personality::Storage, _) => "storage".to_string(),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ControllerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ControllerError::InvalidConfig(format!("invalid value for {key}: {value}")))
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
    fn test_defaults_without_environment() {
        let config = InventoryConfig::from_sources(lookup(&[])).unwrap();
        assert_eq!(config.audit.install_fail_threshold, 15);
        assert_eq!(config.audit.booting_fail_threshold, 40);
        assert_eq!(config.audit.pending_clear_threshold, 10);
        assert_eq!(config.audit.force_lock_escalation, 2);
        assert_eq!(config.system_mode, SystemMode::Duplex);
    }

    #[test]
    fn test_env_overrides() {
        let config = InventoryConfig::from_sources(lookup(&[
            ("INVENTORY_HOSTNAME", "controller-1"),
            ("INVENTORY_SYSTEM_MODE", "simplex"),
            ("INVENTORY_SYSTEM_TYPE", "all-in-one"),
            ("MTCE_PORT", "2200"),
        ]))
        .unwrap();
        assert_eq!(config.hostname, "controller-1");
        assert!(config.is_simplex());
        assert_eq!(config.system_type, SystemType::AllInOne);
        assert_eq!(config.mtce.port, 2200);
    }

    #[test]
    fn test_subfunctions_follow_system_type() {
        let mut config = InventoryConfig::default();
        assert_eq!(config.subfunctions_for(Personality::Controller), "controller");
        config.system_type = SystemType::AllInOne;
        assert_eq!(
            config.subfunctions_for(Personality::Controller),
            "controller,worker"
        );
        assert_eq!(config.subfunctions_for(Personality::Storage), "storage");
    }

    #[test]
    fn test_invalid_env_value_rejected() {
        let err = InventoryConfig::from_sources(lookup(&[("MTCE_PORT", "not-a-port")]));
        assert!(matches!(err, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_yaml_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "hostname: controller-0\naudit:\n  install_fail_threshold: 5\nquorum:\n  min_monitors: 3\n"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = InventoryConfig::from_sources(lookup(&[
            ("INVENTORY_CONFIG", path.as_str()),
            ("AUDIT_INTERVAL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.audit.install_fail_threshold, 5);
        assert_eq!(config.audit.booting_fail_threshold, 40);
        assert_eq!(config.audit.interval_secs, 30);
        assert_eq!(config.quorum.min_monitors, 3);
    }
}
