//! JSON-patch style documents accepted by `PATCH /v1/hosts/{uuid}`.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// JSON patch operation kinds accepted on hosts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
}

/// One `{path, op, value}` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub path: String,
    pub op: PatchOpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl PatchOp {
    /// A `replace` of `path` with `value`.
    pub fn replace(path: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            path: path.to_string(),
            op: PatchOpKind::Replace,
            value: Some(value.into()),
        }
    }

    /// Top-level field the operation targets (`/hostname` → `hostname`).
    ///
    /// Nested paths are rejected.
    pub fn field(&self) -> Result<&str, TypesError> {
        let field = self
            .path
            .strip_prefix('/')
            .ok_or_else(|| TypesError::InvalidPatch(format!("path must start with '/': {}", self.path)))?;
        if field.is_empty() || field.contains('/') {
            return Err(TypesError::InvalidPatch(format!(
                "unsupported path: {}",
                self.path
            )));
        }
        Ok(field)
    }

    /// Value as a string, `None` for `remove` or a JSON null.
    pub fn string_value(&self) -> Result<Option<String>, TypesError> {
        if self.op == PatchOpKind::Remove {
            return Ok(None);
        }
        match &self.value {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(TypesError::InvalidPatch(format!(
                "{} expects a scalar value, got {other}",
                self.path
            ))),
        }
    }
}

/// A JSON patch document.
pub type PatchDocument = Vec<PatchOp>;

/// Class of the party issuing a patch; selects allowlist and lock domain.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CallerClass {
    #[default]
    Operator,
    Mtce,
    Vim,
}

impl CallerClass {
    /// HTTP header carrying the caller class.
    pub const HEADER: &'static str = "x-caller";

    /// mtce and VIM share the coordinator lock domain.
    pub fn is_coordinator(self) -> bool {
        matches!(self, CallerClass::Mtce | CallerClass::Vim)
    }
}
