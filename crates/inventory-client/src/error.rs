//! Inventory RPC client errors

use inventory_types::{ErrorBody, ErrorKind};
use thiserror::Error;

/// Errors that can occur when calling the inventory reconciler
#[derive(Debug, Error)]
pub enum RpcError {
    /// Transport failure (connection refused, reset, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not complete within the RPC timeout.
    /// The reconciler may still have applied it.
    #[error("RPC timed out: {0}")]
    Timeout(String),

    /// Host (or other addressed record) unknown to the reconciler
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by a precondition
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Server-side failure while applying the call
    #[error("Reconciler error: {0}")]
    Internal(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpcError {
    /// Whether the call timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout(_))
    }

    /// Whether the reconciler answered not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::NotFound(_))
    }

    /// Server-side failures force the agent to resend everything.
    pub fn is_internal(&self) -> bool {
        matches!(self, RpcError::Internal(_))
    }

    /// Rebuild the client error from a reconciler error body.
    pub fn from_body(body: ErrorBody) -> Self {
        match body.kind {
            ErrorKind::NotFound => RpcError::NotFound(body.message),
            ErrorKind::Conflict => RpcError::Conflict(body.message),
            ErrorKind::Validation => RpcError::Validation(body.message),
            ErrorKind::Timeout => RpcError::Timeout(body.message),
            ErrorKind::External | ErrorKind::Internal => RpcError::Internal(body.message),
        }
    }

    /// Error for a kind with no structured body, used by status fallbacks and mocks.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::from_body(ErrorBody {
            kind,
            message: message.into(),
        })
    }
}
