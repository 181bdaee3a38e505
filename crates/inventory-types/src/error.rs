//! Errors raised while interpreting wire values.

use thiserror::Error;

/// Errors that can occur when parsing HostOps wire values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    /// A string did not name a known enumeration value
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    /// A patch operation is malformed
    #[error("invalid patch operation: {0}")]
    InvalidPatch(String),
}

impl TypesError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
