//! Agent error types.

use inventory_client::RpcError;
use thiserror::Error;

/// Errors raised by the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A host command exited non-zero or could not be spawned
    #[error("{program} failed: {message}")]
    Command { program: String, message: String },

    /// A sysfs file or command output had an unexpected shape
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentError {
    /// A value that could not be parsed.
    pub fn parse(what: impl std::fmt::Display, value: impl std::fmt::Display) -> Self {
        AgentError::Parse(format!("cannot parse {what}: '{value}'"))
    }
}
