//! Controller error types.
//!
//! Every failure the RPC and lifecycle surfaces can report maps onto one
//! [`ErrorKind`] and an HTTP status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coordinator_client::CoordinatorError;
use inventory_types::{ErrorBody, ErrorKind, TypesError};
use thiserror::Error;

/// Errors returned by the reconciler, mapped to HTTP status codes.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Host or child record unknown
    #[error("{0}")]
    NotFound(String),

    /// Natural key already bound elsewhere
    #[error("{0}")]
    Conflict(String),

    /// Precondition or input rejected; message is shown to the operator
    #[error("{0}")]
    Validation(String),

    /// A coordinator did not answer in time
    #[error("{0}")]
    Timeout(String),

    /// A coordinator answered and refused
    #[error("{0}")]
    External(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ControllerError {
    /// Not found error for a host UUID.
    pub fn host_not_found(uuid: impl std::fmt::Display) -> Self {
        ControllerError::NotFound(format!("Host {uuid} could not be found"))
    }

    /// Category carried in RPC error bodies.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::NotFound(_) => ErrorKind::NotFound,
            ControllerError::Conflict(_) => ErrorKind::Conflict,
            ControllerError::Validation(_) => ErrorKind::Validation,
            ControllerError::Timeout(_) => ErrorKind::Timeout,
            ControllerError::External(_) => ErrorKind::External,
            ControllerError::InvalidConfig(_)
            | ControllerError::Metrics(_)
            | ControllerError::Io(_)
            | ControllerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::External => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoordinatorError> for ControllerError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::Timeout { .. } => ControllerError::Timeout(err.to_string()),
            CoordinatorError::Rejected { .. } | CoordinatorError::Http(_) => {
                ControllerError::External(err.to_string())
            }
            CoordinatorError::Serialization(_) => ControllerError::Internal(err.to_string()),
        }
    }
}

impl From<TypesError> for ControllerError {
    fn from(err: TypesError) -> Self {
        ControllerError::Validation(err.to_string())
    }
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ControllerError::host_not_found("abc").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ControllerError::Validation("no".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ControllerError::from(CoordinatorError::timeout("mtce", "slow")).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ControllerError::from(CoordinatorError::rejected("vim", "busy")).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
