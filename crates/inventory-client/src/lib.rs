//! Inventory RPC Client
//!
//! Client used by the per-host agent to report identity and hardware facts to
//! the central inventory reconciler.
//!
//! # Example
//!
//! ```no_run
//! use inventory_client::{InventoryClient, InventoryRpc};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InventoryClient::new(
//!     "http://inventory:6385".to_string(),
//!     Duration::from_secs(10),
//! )?;
//!
//! // Match this host by its management MACs
//! let host = client
//!     .get_host_by_macs(&["08:00:27:aa:bb:cc".to_string()])
//!     .await?;
//!
//! // Report memory
//! client.memory_update_by_host(host.uuid, vec![]).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
#[path = "trait.rs"]
pub mod inventory_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::InventoryClient;
pub use common::HttpClient;
pub use error::RpcError;
pub use inventory_trait::InventoryRpc;
#[cfg(feature = "test-util")]
pub use mock::MockInventoryClient;
