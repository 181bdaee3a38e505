//! Audit-driven decay counters.
//!
//! Pending transitions, install progress and VIM progress are aged by one on
//! every audit pass until a threshold forces resolution. The age is stored as
//! an integer; the legacy text form (value followed by one marker per pass)
//! is rendered on read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker appended to `host_action` per audit pass.
pub const PENDING_ACTION_MARKER: &str = "-";
/// Marker making up `install_state_info`.
pub const INSTALL_MARKER: &str = "+";
/// Marker appended to `vim_progress_status` per audit pass.
pub const VIM_PROGRESS_MARKER: &str = "..";

/// A value together with the number of audits it has survived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decaying<T> {
    pub value: T,
    pub age: u32,
}

impl<T> Decaying<T> {
    /// Not yet aged by any audit.
    pub fn fresh(value: T) -> Self {
        Self { value, age: 0 }
    }

    /// Age by one audit pass and return the new age.
    pub fn tick(&mut self) -> u32 {
        self.age = self.age.saturating_add(1);
        self.age
    }

    /// Survived at least `threshold` audits.
    pub fn reached(&self, threshold: u32) -> bool {
        self.age >= threshold
    }
}

impl<T: fmt::Display> Decaying<T> {
    /// Value followed by one `marker` per audit survived.
    pub fn label(&self, marker: &str) -> String {
        format!("{}{}", self.value, marker.repeat(self.age as usize))
    }
}
