//! Coordinator traits for mocking
//!
//! The lifecycle engine only sees these traits; the reqwest clients implement
//! them and tests use the recording mocks.

use crate::error::CoordinatorError;
use crate::models::{MtceHostRecord, MtceResponse, QuorumStatus, VimHostRecord};
use inventory_types::HostAction;
use std::time::Duration;

/// Maintenance daemon operations.
#[async_trait::async_trait]
pub trait MtceApi: Send + Sync {
    async fn host_add(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError>;
    async fn host_modify(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError>;
    async fn host_delete(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError>;
}

/// Virtual infrastructure manager operations.
#[async_trait::async_trait]
pub trait VimApi: Send + Sync {
    async fn vim_host_add(&self, host: &VimHostRecord, timeout: Duration) -> Result<(), CoordinatorError>;
    async fn vim_host_action(&self, host: &VimHostRecord, action: HostAction, force: bool, timeout: Duration) -> Result<(), CoordinatorError>;
    async fn vim_host_delete(&self, host: &VimHostRecord, timeout: Duration) -> Result<(), CoordinatorError>;
}

/// Storage monitor quorum query.
#[async_trait::async_trait]
pub trait QuorumApi: Send + Sync {
    async fn monitor_status(&self, timeout: Duration) -> Result<QuorumStatus, CoordinatorError>;
}
