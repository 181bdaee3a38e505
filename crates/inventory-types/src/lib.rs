//! HostOps shared data contracts
//!
//! Types exchanged between the per-host agent, the central inventory
//! controller and the lifecycle REST surface.
//!
//! - [`host`]: the canonical host record and its lifecycle enumerations
//! - [`action`]: operator actions and VIM callback pseudo-actions
//! - [`decay`]: audit-driven decay counters with labels rendered on read
//! - [`facts`]: hardware fact snapshots reported by the agent
//! - [`rpc`]: agent↔reconciler request/response envelopes
//! - [`patch`]: lifecycle patch documents and caller classes

pub mod action;
pub mod decay;
pub mod error;
pub mod facts;
pub mod host;
pub mod patch;
pub mod rpc;

pub use action::*;
pub use decay::*;
pub use error::*;
pub use facts::*;
pub use host::*;
pub use patch::*;
pub use rpc::*;
