//! Host actions.
//!
//! Operator actions drive the lifecycle state machine. VIM callbacks arrive
//! over the same `action` field but report external status instead of
//! operator intent.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Operator-initiated action kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HostAction {
    #[default]
    None,
    Lock,
    ForceLock,
    Unlock,
    ForceUnlock,
    Reset,
    Reboot,
    Swact,
    ForceSwact,
    Reinstall,
    PowerOn,
    PowerOff,
    #[serde(rename = "subfunction_config")]
    #[strum(serialize = "subfunction_config")]
    SubfunctionConfig,
}

impl HostAction {
    /// `force-*` variants log coordinator failures and proceed.
    pub fn is_forced(self) -> bool {
        matches!(
            self,
            HostAction::ForceLock | HostAction::ForceUnlock | HostAction::ForceSwact
        )
    }

    /// `lock` or `force-lock`.
    pub fn is_lock(self) -> bool {
        matches!(self, HostAction::Lock | HostAction::ForceLock)
    }

    /// Human-readable in-progress label written to `task`.
    pub fn task_label(self) -> Option<&'static str> {
        match self {
            HostAction::None => None,
            HostAction::Lock => Some("Locking"),
            HostAction::ForceLock => Some("Force Locking"),
            HostAction::Unlock | HostAction::ForceUnlock => Some("Unlocking"),
            HostAction::Reset => Some("Resetting"),
            HostAction::Reboot => Some("Rebooting"),
            HostAction::Swact | HostAction::ForceSwact => Some("Swacting"),
            HostAction::Reinstall => Some("Reinstalling"),
            HostAction::PowerOn => Some("Powering-on"),
            HostAction::PowerOff => Some("Powering-off"),
            HostAction::SubfunctionConfig => Some("Configuring subfunctions"),
        }
    }
}

/// Status callbacks the VIM delivers through the `action` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum VimCallback {
    ServicesEnabled,
    ServicesDisabled,
    ServicesDisableFailed,
    ServicesDisableExtend,
    ServicesDeleteFailed,
}

impl VimCallback {
    /// Statuses that are final and never decayed by the audit.
    pub fn is_terminal_status(status: &str) -> bool {
        status == VimCallback::ServicesEnabled.as_ref()
            || status == VimCallback::ServicesDisabled.as_ref()
    }
}

/// Any value accepted in the `action` field of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedAction {
    Host(HostAction),
    Vim(VimCallback),
}

impl FromStr for RequestedAction {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(action) = HostAction::from_str(s) {
            return Ok(RequestedAction::Host(action));
        }
        VimCallback::from_str(s)
            .map(RequestedAction::Vim)
            .map_err(|_| TypesError::invalid("action", s))
    }
}

impl fmt::Display for RequestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedAction::Host(a) => write!(f, "{a}"),
            RequestedAction::Vim(v) => write!(f, "{v}"),
        }
    }
}
