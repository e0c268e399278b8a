//! `queryRefine`: turns a conversational question into search terms and
//! hands them to the search tool.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use runtime::tools::{ParamType, ParameterSpec, required_str};
use runtime::{Parameters, Tool, ToolError, ToolOutput, ToolResult, ToolSpec};
use serde_json::json;

static FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:hey|hi|ok|okay|so|um|uh|please|can you|could you|would you|will you|i want to know|i'd like to know|tell me|search for|search|look up|find out|find|show me|what is|what's|who is|who's|about|me|the)\b[\s,]*)+",
    )
    .unwrap()
});
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[?!.,;:"]+"#).unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub struct QueryRefine {
    spec: ToolSpec,
    next_tool: String,
}

impl QueryRefine {
    pub fn new() -> Self {
        let spec = ToolSpec::new(
            "queryRefine",
            "Rewrite a conversational question into concise web search terms, then search.",
        )
        .param(ParameterSpec::required(
            "query",
            ParamType::String,
            "The question as the user asked it.",
        ));
        Self {
            spec,
            next_tool: "searchDuckduckgo".to_string(),
        }
    }

    /// Tool that receives the refined query.
    pub fn next_tool(mut self, name: impl Into<String>) -> Self {
        self.next_tool = name.into();
        self
    }

    pub fn refine(query: &str) -> String {
        let stripped = FILLER.replace(query.trim(), "");
        let stripped = PUNCTUATION.replace_all(&stripped, " ");
        SPACES.replace_all(stripped.trim(), " ").to_lowercase()
    }
}

impl Default for QueryRefine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for QueryRefine {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: &Parameters) -> Result<ToolResult, ToolError> {
        let query = required_str(parameters, "query")?;
        let refined = Self::refine(query);
        if refined.is_empty() {
            return Ok(ToolResult::failure(format!("nothing to search for in {query:?}")));
        }
        Ok(
            ToolResult::success(ToolOutput::ChainedData(json!({ "query": refined })))
                .chain(Some(self.next_tool.clone()))
                .with_metadata("original", json!(query)),
        )
    }
}
