//! Coordinator Clients
//!
//! Timeout-bounded request/reply clients for the services that act on host
//! lifecycle transitions:
//!
//! - **mtce**: maintenance daemon, `host_add` / `host_modify` / `host_delete`
//!   with Fibonacci-spaced retries
//! - **VIM**: virtual infrastructure manager, host add / action / delete
//! - **Quorum**: storage monitor counts used by the lock guard
//!
//! A call that times out may still have been applied by the coordinator;
//! callers rely on the periodic audit to converge.

pub mod backoff;
pub mod client;
#[path = "trait.rs"]
pub mod coordinator_trait;
pub mod error;
#[cfg(feature = "test-util")]
pub mod mock;
pub mod models;

pub use backoff::FibonacciBackoff;
pub use client::{MtceClient, QuorumClient, VimClient};
pub use coordinator_trait::{MtceApi, QuorumApi, VimApi};
pub use error::CoordinatorError;
#[cfg(feature = "test-util")]
pub use mock::{MockFailure, MockGate, MockMtce, MockQuorum, MockVim, MtceOp, VimOp};
pub use models::*;
