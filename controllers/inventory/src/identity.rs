//! The reconciler's own identity.
//!
//! Set once at startup from configuration. The host whose hostname matches
//! is the active controller.

use crate::error::ControllerError;
use inventory_types::Host;
use std::sync::OnceLock;

/// Hostname of the controller this reconciler runs on.
#[derive(Debug, Default)]
pub struct ControllerIdentity {
    hostname: OnceLock<String>,
}

impl ControllerIdentity {
    /// Identity not yet known.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity already set to `hostname`.
    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        let identity = Self::new();
        let _ = identity.hostname.set(hostname.into());
        identity
    }

    /// Assign the identity. A second assignment is an error.
    pub fn set(&self, hostname: impl Into<String>) -> Result<(), ControllerError> {
        self.hostname.set(hostname.into()).map_err(|rejected| {
            ControllerError::Internal(format!(
                "controller identity already set, refusing {rejected}"
            ))
        })
    }

    /// Own hostname, once set.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.get().map(String::as_str)
    }

    /// Whether `host` is the controller this reconciler runs on.
    pub fn is_active_controller(&self, host: &Host) -> bool {
        match (self.hostname(), host.hostname.as_deref()) {
            (Some(own), Some(name)) => own == name,
            _ => false,
        }
    }
}
