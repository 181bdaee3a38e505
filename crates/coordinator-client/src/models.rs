//! Wire records exchanged with mtce, the VIM and the storage quorum service.

use inventory_types::{Host, HostAction, parse_subfunctions};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host record as mtce expects it on add/modify/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtceHostRecord {
    pub uuid: Uuid,
    pub hostname: Option<String>,
    pub personality: Option<String>,
    pub subfunctions: Option<String>,
    pub mgmt_mac: String,
    pub mgmt_ip: Option<String>,
    pub administrative: String,
    pub operational: String,
    pub availability: String,
    pub action: String,
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_username: Option<String>,
    pub uptime: u64,
}

impl MtceHostRecord {
    /// Snapshot of `host` carrying `action` as the requested operation.
    pub fn from_host(host: &Host, action: HostAction) -> Self {
        Self {
            uuid: host.uuid,
            hostname: host.hostname.clone(),
            personality: host.personality.map(|p| p.to_string()),
            subfunctions: host.subfunctions.clone(),
            mgmt_mac: host.mgmt_mac.clone(),
            mgmt_ip: host.mgmt_ip.clone(),
            administrative: host.administrative.to_string(),
            operational: host.operational.to_string(),
            availability: host.availability.to_string(),
            action: action.to_string(),
            task: host.task.clone(),
            bm_type: host.bm_type.clone(),
            bm_ip: host.bm_ip.clone(),
            bm_username: host.bm_username.clone(),
            uptime: host.uptime,
        }
    }
}

/// mtce reply: `status` is `pass` or `fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtceResponse {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl MtceResponse {
    /// Successful response.
    pub fn pass() -> Self {
        Self {
            status: "pass".to_string(),
            reason: None,
            action: None,
        }
    }

    /// Failed response with a reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            reason: Some(reason.into()),
            action: None,
        }
    }

    /// Status is `pass`, in any case.
    pub fn is_pass(&self) -> bool {
        self.status.eq_ignore_ascii_case("pass")
    }
}

/// Host record sent to the VIM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VimHostRecord {
    pub uuid: Uuid,
    pub hostname: Option<String>,
    pub personality: Option<String>,
    pub subfunctions: Vec<String>,
    pub administrative: String,
    pub operational: String,
    pub availability: String,
}

impl VimHostRecord {
    /// VIM view of a host record.
    pub fn from_host(host: &Host) -> Self {
        Self {
            uuid: host.uuid,
            hostname: host.hostname.clone(),
            personality: host.personality.map(|p| p.to_string()),
            subfunctions: host
                .subfunctions
                .as_deref()
                .map(parse_subfunctions)
                .unwrap_or_default(),
            administrative: host.administrative.to_string(),
            operational: host.operational.to_string(),
            availability: host.availability.to_string(),
        }
    }
}

/// Body of a VIM host action request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VimActionRequest {
    #[serde(flatten)]
    pub host: VimHostRecord,
    pub action: String,
    pub force: bool,
}

/// Storage monitor quorum as reported by the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumStatus {
    pub current_monitors: u32,
    pub required_monitors: u32,
}

impl QuorumStatus {
    /// `(current_monitor_count, required_monitor_count)`
    pub fn counts(self) -> (u32, u32) {
        (self.current_monitors, self.required_monitors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_types::Personality;

    #[test]
    fn test_mtce_record_from_host() {
        let mut host = Host::new("08:00:27:aa:bb:cc");
        host.hostname = Some("worker-0".to_string());
        host.personality = Some(Personality::Worker);
        let record = MtceHostRecord::from_host(&host, HostAction::Unlock);
        assert_eq!(record.personality.as_deref(), Some("worker"));
        assert_eq!(record.action, "unlock");
        assert_eq!(record.administrative, "locked");
    }

    #[test]
    fn test_vim_record_splits_subfunctions() {
        let mut host = Host::new("08:00:27:aa:bb:cc");
        host.subfunctions = Some("controller,worker".to_string());
        let record = VimHostRecord::from_host(&host);
        assert_eq!(record.subfunctions, vec!["controller", "worker"]);
    }

    #[test]
    fn test_mtce_response_status() {
        assert!(MtceResponse::pass().is_pass());
        assert!(!MtceResponse::fail("busy").is_pass());
    }
}
