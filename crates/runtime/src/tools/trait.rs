//! Tool capability trait.

use crate::tools::{Parameters, ToolError, ToolResult, ToolSpec};
use async_trait::async_trait;

/// Trait for tool capabilities.
///
/// This is the boundary between the orchestrator and side effects. A tool
/// reports failure by returning an unsuccessful [`ToolResult`]; the only
/// errors it raises are parameter preconditions.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static descriptor of this tool.
    fn spec(&self) -> &ToolSpec;

    /// Execute the tool with the given parameters.
    async fn execute(&self, parameters: &Parameters) -> Result<ToolResult, ToolError>;

    fn name(&self) -> &str {
        &self.spec().name
    }
}
