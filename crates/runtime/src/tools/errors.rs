use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Precondition errors a tool may raise instead of returning a result.
///
/// Everything else a tool can go wrong with is reported as a failed
/// [`ToolResult`](super::ToolResult), not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("tool not found: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
