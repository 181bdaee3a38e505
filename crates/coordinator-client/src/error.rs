//! Coordinator client errors

use thiserror::Error;

/// Errors talking to a coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No reply within the call timeout. The coordinator may still act on it.
    #[error("{service} request timed out: {detail}")]
    Timeout { service: &'static str, detail: String },

    /// The coordinator answered and refused the request
    #[error("{service} rejected request: {reason}")]
    Rejected { service: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoordinatorError {
    /// Whether the call timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoordinatorError::Timeout { .. })
    }

    /// The call did not complete within its timeout.
    pub fn timeout(service: &'static str, detail: impl Into<String>) -> Self {
        CoordinatorError::Timeout {
            service,
            detail: detail.into(),
        }
    }

    /// The coordinator answered but refused.
    pub fn rejected(service: &'static str, reason: impl Into<String>) -> Self {
        CoordinatorError::Rejected {
            service,
            reason: reason.into(),
        }
    }

    /// Transport and timeout failures are worth retrying; rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoordinatorError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            CoordinatorError::Timeout { .. } => true,
            CoordinatorError::Rejected { .. } | CoordinatorError::Serialization(_) => false,
        }
    }
}
