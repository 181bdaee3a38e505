//! Recording coordinator mocks for unit testing
//!
//! Each mock keeps the calls it received and can be primed to time out or
//! reject the next call, so lifecycle paths can be tested end to end. The
//! mtce mock can also hold a call open while a test races other writes
//! against it.

use crate::coordinator_trait::{MtceApi, QuorumApi, VimApi};
use crate::error::CoordinatorError;
use crate::models::{MtceHostRecord, MtceResponse, QuorumStatus, VimHostRecord};
use inventory_types::HostAction;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted outcome for the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    Timeout,
    Reject(String),
}

impl MockFailure {
    fn into_error(self, service: &'static str) -> CoordinatorError {
        match self {
            MockFailure::Timeout => CoordinatorError::timeout(service, "injected timeout"),
            MockFailure::Reject(reason) => CoordinatorError::rejected(service, reason),
        }
    }
}

/// Kind of mtce call received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtceOp {
    Add,
    Modify,
    Delete,
}

/// Holds one mtce call until released.
#[derive(Debug, Clone, Default)]
pub struct MockGate {
    entered: Arc<Notify>,
    released: Arc<Notify>,
}

impl MockGate {
    /// Resolves once the held call has arrived.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held call complete.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

/// Recording mtce client.
#[derive(Debug, Clone, Default)]
pub struct MockMtce {
    calls: Arc<Mutex<Vec<(MtceOp, MtceHostRecord)>>>,
    failures: Arc<Mutex<VecDeque<MockFailure>>>,
    gate: Arc<Mutex<Option<MockGate>>>,
}

impl MockMtce {
    /// Mock that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `failure`.
    pub fn fail_next(&self, failure: MockFailure) {
        guard(&self.failures).push_back(failure);
    }

    /// Calls received, in order.
    pub fn calls(&self) -> Vec<(MtceOp, MtceHostRecord)> {
        guard(&self.calls).clone()
    }

    /// Operations received, without their records
    pub fn ops(&self) -> Vec<MtceOp> {
        guard(&self.calls).iter().map(|(op, _)| *op).collect()
    }

    /// `action` carried by each call, in order
    pub fn actions(&self) -> Vec<String> {
        guard(&self.calls).iter().map(|(_, r)| r.action.clone()).collect()
    }

    /// Hold the next call open until the returned gate is released.
    pub fn hold_next(&self) -> MockGate {
        let gate = MockGate::default();
        *guard(&self.gate) = Some(gate.clone());
        gate
    }

    async fn handle(&self, op: MtceOp, record: &MtceHostRecord) -> Result<MtceResponse, CoordinatorError> {
        guard(&self.calls).push((op, record.clone()));
        let held = guard(&self.gate).take();
        if let Some(gate) = held {
            gate.entered.notify_one();
            gate.released.notified().await;
        }
        match guard(&self.failures).pop_front() {
            Some(failure) => Err(failure.into_error("mtce")),
            None => Ok(MtceResponse::pass()),
        }
    }
}

#[async_trait::async_trait]
impl MtceApi for MockMtce {
    async fn host_add(&self, record: &MtceHostRecord, _timeout: Duration, _retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.handle(MtceOp::Add, record).await
    }

    async fn host_modify(&self, record: &MtceHostRecord, _timeout: Duration, _retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.handle(MtceOp::Modify, record).await
    }

    async fn host_delete(&self, record: &MtceHostRecord, _timeout: Duration, _retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.handle(MtceOp::Delete, record).await
    }
}

/// Kind of VIM call received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimOp {
    Add,
    Action { action: HostAction, force: bool },
    Delete,
}

/// Recording VIM client.
#[derive(Debug, Clone, Default)]
pub struct MockVim {
    calls: Arc<Mutex<Vec<(VimOp, Uuid)>>>,
    failures: Arc<Mutex<VecDeque<MockFailure>>>,
}

impl MockVim {
    /// Mock that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `failure`.
    pub fn fail_next(&self, failure: MockFailure) {
        guard(&self.failures).push_back(failure);
    }

    /// Calls received with the host UUID, in order.
    pub fn calls(&self) -> Vec<(VimOp, Uuid)> {
        guard(&self.calls).clone()
    }

    /// Operations received, without their host.
    pub fn ops(&self) -> Vec<VimOp> {
        guard(&self.calls).iter().map(|(op, _)| *op).collect()
    }

    fn handle(&self, op: VimOp, uuid: Uuid) -> Result<(), CoordinatorError> {
        guard(&self.calls).push((op, uuid));
        match guard(&self.failures).pop_front() {
            Some(failure) => Err(failure.into_error("vim")),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl VimApi for MockVim {
    async fn vim_host_add(&self, host: &VimHostRecord, _timeout: Duration) -> Result<(), CoordinatorError> {
        self.handle(VimOp::Add, host.uuid)
    }

    async fn vim_host_action(&self, host: &VimHostRecord, action: HostAction, force: bool, _timeout: Duration) -> Result<(), CoordinatorError> {
        self.handle(VimOp::Action { action, force }, host.uuid)
    }

    async fn vim_host_delete(&self, host: &VimHostRecord, _timeout: Duration) -> Result<(), CoordinatorError> {
        self.handle(VimOp::Delete, host.uuid)
    }
}

/// Quorum client with settable monitor counts.
#[derive(Debug, Clone)]
pub struct MockQuorum {
    status: Arc<Mutex<QuorumStatus>>,
    failures: Arc<Mutex<VecDeque<MockFailure>>>,
}

impl Default for MockQuorum {
    fn default() -> Self {
        Self::new(3, 2)
    }
}

impl MockQuorum {
    /// Mock reporting the given monitor counts.
    pub fn new(current_monitors: u32, required_monitors: u32) -> Self {
        Self {
            status: Arc::new(Mutex::new(QuorumStatus {
                current_monitors,
                required_monitors,
            })),
            failures: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Change the reported monitor counts.
    pub fn set(&self, current_monitors: u32, required_monitors: u32) {
        *guard(&self.status) = QuorumStatus {
            current_monitors,
            required_monitors,
        };
    }

    /// Make the next query fail with `failure`.
    pub fn fail_next(&self, failure: MockFailure) {
        guard(&self.failures).push_back(failure);
    }
}

#[async_trait::async_trait]
impl QuorumApi for MockQuorum {
    async fn monitor_status(&self, _timeout: Duration) -> Result<QuorumStatus, CoordinatorError> {
        if let Some(failure) = guard(&self.failures).pop_front() {
            return Err(failure.into_error("quorum"));
        }
        Ok(*guard(&self.status))
    }
}
