//! Tool dispatch: runs parsed calls against the enabled tools and renders the
//! results as transcript fragments.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::format::{render_failure, render_output, render_view_summary};
use crate::tools::{Parameters, ToolCall, ToolOutput, ToolResult, ToolSet};

/// Executes tool calls with an iteration bound and one-hop chaining.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    max_iterations: usize,
}

impl ToolDispatcher {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one dispatch pass.
    ///
    /// `iteration` counts passes and is incremented once per pass that does
    /// any work. Calls run sequentially in the given order. Every failure is
    /// converted to a fragment; nothing escapes. Cancellation is checked
    /// before each tool and stops the pass, keeping fragments produced so far.
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        tools: &ToolSet,
        iteration: &mut usize,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        if calls.is_empty() {
            return Vec::new();
        }
        if *iteration >= self.max_iterations {
            info!(
                iteration = *iteration,
                max = self.max_iterations,
                "tool iteration bound reached, dispatch skipped"
            );
            return Vec::new();
        }
        *iteration += 1;
        debug!(iteration = *iteration, calls = calls.len(), "dispatch pass");

        let mut fragments = Vec::new();
        for call in calls {
            if cancel.is_cancelled() {
                debug!("dispatch cancelled");
                break;
            }

            let Some(tool) = tools.get(&call.name) else {
                warn!(tool = %call.name, "tool not found");
                fragments.push(render_failure(&call.name, Some("tool not found")));
                continue;
            };

            let result = match tool.execute(&call.parameters).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %call.name, "tool precondition failed: {e}");
                    fragments.push(render_failure(&call.name, Some(&e.to_string())));
                    continue;
                }
            };

            let Some(output) = result.output() else {
                fragments.push(render_failure(&call.name, result.error()));
                continue;
            };
            push_success(&mut fragments, &call.name, output);

            if let Some(next) = chain_target(&result) {
                if cancel.is_cancelled() {
                    break;
                }
                self.run_chain(&mut fragments, &call.name, next, tools).await;
            }
        }
        fragments
    }

    async fn run_chain(
        &self,
        fragments: &mut Vec<String>,
        from: &str,
        (next, parameters): (&str, Parameters),
        tools: &ToolSet,
    ) {
        let Some(tool) = tools.get(next) else {
            warn!(from, to = next, "chained tool not enabled, chain dropped");
            return;
        };
        debug!(from, to = next, "chaining");
        match tool.execute(&parameters).await {
            Ok(result) => match result.output() {
                Some(output) => push_success(fragments, next, output),
                None => warn!(
                    from,
                    to = next,
                    "chained tool failed: {}",
                    result.error().unwrap_or("unknown error")
                ),
            },
            Err(e) => warn!(from, to = next, "chained tool failed: {e}"),
        }
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new(5)
    }
}

fn push_success(fragments: &mut Vec<String>, tool: &str, output: &ToolOutput) {
    fragments.push(render_output(tool, output));
    if let ToolOutput::RichView(view) = output {
        fragments.push(render_view_summary(view));
    }
}

/// The follow-up tool and its parameters, when the result asks for a chain.
fn chain_target(result: &ToolResult) -> Option<(&str, Parameters)> {
    if !result.should_chain() {
        return None;
    }
    let next = result.suggested_next_tool()?;
    match result.output()? {
        ToolOutput::ChainedData(serde_json::Value::Object(parameters)) => {
            Some((next, parameters.clone()))
        }
        _ => None,
    }
}
