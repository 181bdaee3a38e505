//! Canonical host record.
//!
//! A host is created the first time a boot event reports its management MAC
//! and is bound to a personality and hostname exactly once by an explicit
//! provisioning patch.

use crate::action::HostAction;
use crate::decay::{Decaying, INSTALL_MARKER, PENDING_ACTION_MARKER, VIM_PROGRESS_MARKER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Primary role of a host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Personality {
    Controller,
    #[serde(alias = "compute")]
    #[strum(to_string = "worker", serialize = "compute")]
    Worker,
    Storage,
}

/// Administrative state, driven by lock/unlock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Administrative {
    #[default]
    Locked,
    Unlocked,
}

/// Operational state, reported by mtce.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Operational {
    #[default]
    Disabled,
    Enabled,
}

/// Availability state, reported by mtce.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Availability {
    #[default]
    Offline,
    Online,
    #[serde(rename = "intest")]
    #[strum(serialize = "intest")]
    InTest,
    Degraded,
    Available,
    Failed,
    PowerOff,
    NotInstalled,
    #[serde(rename = "offduty")]
    #[strum(serialize = "offduty")]
    OffDuty,
}

impl Availability {
    /// Whether the host is up far enough to answer the agent.
    pub fn is_reachable(self) -> bool {
        matches!(
            self,
            Availability::Online | Availability::Degraded | Availability::Available
        )
    }
}

/// Tri-state provisioning marker, distinct from the administrative lock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InvProvision {
    #[default]
    Unprovisioned,
    Provisioning,
    Provisioned,
}

/// Install progress of a host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InstallState {
    Preinstall,
    Installing,
    Postinstall,
    Booting,
    Failed,
    Completed,
}

impl InstallState {
    /// Terminal states are never decayed by the install-state audit.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallState::Failed | InstallState::Completed)
    }
}

/// Split a comma-set of subfunctions into its members.
pub fn parse_subfunctions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical host record as held by the inventory controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub uuid: Uuid,
    pub hostname: Option<String>,
    pub personality: Option<Personality>,
    /// Comma-set, e.g. `controller,worker`
    pub subfunctions: Option<String>,
    pub mgmt_mac: String,
    pub mgmt_ip: Option<String>,

    pub administrative: Administrative,
    pub operational: Operational,
    pub availability: Availability,

    /// Transient command; always `none` at rest
    pub action: HostAction,
    /// Persisted pending-action marker with its audit age
    pub host_action: Option<Decaying<HostAction>>,
    pub task: Option<String>,
    pub vim_progress: Option<Decaying<String>>,
    pub install_state: Option<Decaying<InstallState>>,
    pub invprovision: InvProvision,

    pub bm_type: Option<String>,
    pub bm_ip: Option<String>,
    pub bm_username: Option<String>,
    pub boot_device: Option<String>,
    pub rootfs_device: Option<String>,
    pub console: Option<String>,
    pub iscsi_initiator_name: Option<String>,
    pub uptime: u64,
    pub location: Option<serde_json::Value>,
    pub serialid: Option<String>,
    /// Desired serial-console carrier-detect setting
    pub ttys_dcd: Option<bool>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Host {
    /// A freshly discovered host: locked, disabled, offline, unprovisioned.
    pub fn new(mgmt_mac: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            hostname: None,
            personality: None,
            subfunctions: None,
            mgmt_mac: normalize_mac(&mgmt_mac.into()),
            mgmt_ip: None,
            administrative: Administrative::Locked,
            operational: Operational::Disabled,
            availability: Availability::Offline,
            action: HostAction::None,
            host_action: None,
            task: None,
            vim_progress: None,
            install_state: None,
            invprovision: InvProvision::Unprovisioned,
            bm_type: None,
            bm_ip: None,
            bm_username: None,
            boot_device: None,
            rootfs_device: None,
            console: None,
            iscsi_initiator_name: None,
            uptime: 0,
            location: None,
            serialid: None,
            ttys_dcd: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hostname or a placeholder for log and error messages.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or("<unprovisioned>")
    }

    /// Administratively locked.
    pub fn is_locked(&self) -> bool {
        self.administrative == Administrative::Locked
    }

    /// Whether `name` is among the bound subfunctions.
    pub fn has_subfunction(&self, name: &str) -> bool {
        self.subfunctions
            .as_deref()
            .map(|s| parse_subfunctions(s).iter().any(|f| f == name))
            .unwrap_or(false)
    }

    /// Identity fields that must all be bound before unlock is accepted.
    pub fn missing_identity_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.hostname.as_deref()) {
            missing.push("hostname");
        }
        if self.personality.is_none() {
            missing.push("personality");
        }
        if is_blank(self.subfunctions.as_deref()) {
            missing.push("subfunctions");
        }
        if self.mgmt_mac.trim().is_empty() {
            missing.push("mgmt_mac");
        }
        if is_blank(self.mgmt_ip.as_deref()) {
            missing.push("mgmt_ip");
        }
        missing
    }

    /// `host_action` as callers of the legacy text field see it.
    pub fn host_action_label(&self) -> Option<String> {
        self.host_action
            .as_ref()
            .map(|d| d.label(PENDING_ACTION_MARKER))
    }

    /// Legacy text form of the install decay counter.
    pub fn install_state_info(&self) -> Option<String> {
        self.install_state
            .as_ref()
            .map(|d| INSTALL_MARKER.repeat(d.age as usize))
    }

    /// Legacy text form of the VIM progress status.
    pub fn vim_progress_status(&self) -> Option<String> {
        self.vim_progress
            .as_ref()
            .map(|d| d.label(VIM_PROGRESS_MARKER))
    }

    /// REST representation with decay labels rendered.
    pub fn view(&self) -> HostView {
        HostView {
            host_action_text: self.host_action_label(),
            install_state_info: self.install_state_info(),
            vim_progress_status: self.vim_progress_status(),
            host: self.clone(),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Lower-case, colon separated MAC used as the natural key.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase().replace('-', ":")
}

/// Host as returned by the lifecycle REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostView {
    #[serde(flatten)]
    pub host: Host,
    pub host_action_text: Option<String>,
    pub install_state_info: Option<String>,
    pub vim_progress_status: Option<String>,
}

/// Values carried by a boot event that first reports a management MAC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostCreate {
    pub mgmt_mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgmt_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<Personality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootfs_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
}

/// Reported (non-lifecycle) fields the agent may refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgmt_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootfs_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscsi_initiator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bm_username: Option<String>,
}
