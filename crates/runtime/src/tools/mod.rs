//! Tool capabilities, their descriptors and the registry of enabled tools.

pub mod errors;
mod registry;
mod r#trait;
mod types;

pub use errors::ToolError;
pub use r#trait::Tool;
pub use registry::{ToolRegistry, ToolSet};
pub use types::{
    ParamType, ParameterSpec, Parameters, ToolCall, ToolOutcome, ToolOutput, ToolResult, ToolSpec,
    ToolView, optional_str, optional_u64, required_str,
};
