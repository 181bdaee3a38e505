//! Prometheus metrics for the inventory controller.
//!
//! Exposed in text format at `GET /metrics`.

use crate::error::ControllerError;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

/// Prometheus metrics of the reconciler.
#[derive(Clone)]
pub struct InventoryMetrics {
    registry: Registry,
    /// RPC calls by `method` and `outcome`
    rpc_requests_total: CounterVec,
    /// Lifecycle patches by `action` and `outcome`
    patch_requests_total: CounterVec,
    /// Audit passes by `audit`
    audit_passes_total: CounterVec,
    /// Install states forced to failed by the install audit
    install_failures_total: Counter,
}

impl InventoryMetrics {
    /// Register every metric on a fresh registry.
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let rpc_requests_total = CounterVec::new(
            Opts::new("inventory_rpc_requests_total", "Total agent RPC requests"),
            &["method", "outcome"],
        )?;
        registry.register(Box::new(rpc_requests_total.clone()))?;

        let patch_requests_total = CounterVec::new(
            Opts::new(
                "inventory_patch_requests_total",
                "Total host lifecycle patch requests",
            ),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(patch_requests_total.clone()))?;

        let audit_passes_total = CounterVec::new(
            Opts::new("inventory_audit_passes_total", "Total audit passes"),
            &["audit"],
        )?;
        registry.register(Box::new(audit_passes_total.clone()))?;

        let install_failures_total = Counter::with_opts(Opts::new(
            "inventory_install_failures_total",
            "Install states forced to failed after exceeding the decay threshold",
        ))?;
        registry.register(Box::new(install_failures_total.clone()))?;

        Ok(Self {
            registry,
            rpc_requests_total,
            patch_requests_total,
            audit_passes_total,
            install_failures_total,
        })
    }

    /// Count an RPC by method and outcome.
    pub fn record_rpc(&self, method: &str, outcome: &str) {
        self.rpc_requests_total
            .with_label_values(&[method, outcome])
            .inc();
    }

    /// Count a patch by action and outcome.
    pub fn record_patch(&self, action: &str, outcome: &str) {
        self.patch_requests_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Count one pass of the named audit.
    pub fn record_audit(&self, audit: &str) {
        self.audit_passes_total.with_label_values(&[audit]).inc();
    }

    /// Count an install moved to failed by the audit.
    pub fn record_install_failure(&self) {
        self.install_failures_total.inc();
    }

    /// Text exposition format.
    pub fn encode_text(&self) -> Result<String, ControllerError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ControllerError::Internal(e.to_string()))
    }
}
