//! Agent session state, threaded explicitly through each audit.

use crate::collectors::LldpFacts;
use inventory_types::Host;
use uuid::Uuid;

/// What the agent has learned and reported so far.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Host record matched by management MAC
    pub host: Option<Host>,
    /// The full fact report has been accepted
    pub registered: bool,
    /// A server-side failure requires an unconditional full resend
    pub resend_required: bool,
    /// Audits run since the agent started
    pub audits: u64,
    pub platform_ready_reported: bool,
    pub subfunctions_reported: bool,
    pub subfunctions_notified: bool,
    /// Pre-configuration LLDP discovery reached the reconciler
    pub lldp_discovered: bool,
    /// Heard during discovery, held until a full report carries it
    pub lldp_discovery: Option<LldpFacts>,
    /// Carrier-detect setting last applied to the console tty
    pub ttys_dcd: Option<bool>,
}

impl Session {
    /// UUID of the matched host.
    pub fn host_uuid(&self) -> Option<Uuid> {
        self.host.as_ref().map(|h| h.uuid)
    }

    /// Record the host the reconciler matched by MAC.
    pub fn matched(&mut self, host: Host) {
        self.host = Some(host);
    }

    /// Forget the matched identity so the next audit rediscovers it.
    pub fn reset(&mut self) {
        *self = Session {
            audits: self.audits,
            ..Session::default()
        };
    }

    /// Full report not yet accepted, or the reconciler asked for a resend.
    pub fn needs_full_report(&self) -> bool {
        !self.registered || self.resend_required
    }

    /// True every `every` audits. Zero disables.
    pub fn recurring_due(&self, every: u64) -> bool {
        every > 0 && self.audits % every == 0
    }
}
