//! Tool-related types.

use super::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter mapping passed to a tool. Keys keep their insertion order.
pub type Parameters = Map<String, Value>;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// One entry of a tool's parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            allowed: None,
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    /// Restrict the parameter to a fixed set of values.
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Immutable descriptor of an invocable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Ordered parameter schema.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }
}

/// A parsed, not yet executed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Parameters,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Renderer-agnostic description of how a result should be displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolView {
    /// Render-hint tag, e.g. `date` or `search_results`.
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Map<String, Value>,
    pub template: String,
}

impl ToolView {
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        let kind = kind.into();
        Self {
            template: kind.clone(),
            kind,
            data,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }
}

/// Payload of a successful tool run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Data(Value),
    Text(String),
    RichView(ToolView),
    WebContent(String),
    /// Parameters for a follow-up tool.
    ChainedData(Value),
}

/// Whether the tool succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutcome {
    Success { output: ToolOutput },
    Error { message: String },
}

/// Outcome of a tool execution.
///
/// Constructed through [`ToolResult::success`] and [`ToolResult::failure`], so
/// an error message exists exactly when the run failed, and a suggested next
/// tool exists only when chaining was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    outcome: ToolOutcome,
    should_chain: bool,
    suggested_next_tool: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl ToolResult {
    pub fn success(output: ToolOutput) -> Self {
        Self {
            outcome: ToolOutcome::Success { output },
            should_chain: false,
            suggested_next_tool: None,
            metadata: Map::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::success(ToolOutput::Text(text.into()))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: ToolOutcome::Error {
                message: message.into(),
            },
            should_chain: false,
            suggested_next_tool: None,
            metadata: Map::new(),
        }
    }

    /// Request a follow-up invocation. Ignored on failed results.
    pub fn chain(mut self, next_tool: Option<String>) -> Self {
        if self.is_success() {
            self.should_chain = true;
            self.suggested_next_tool = next_tool;
        }
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn outcome(&self) -> &ToolOutcome {
        &self.outcome
    }

    pub fn output(&self) -> Option<&ToolOutput> {
        match &self.outcome {
            ToolOutcome::Success { output } => Some(output),
            ToolOutcome::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Error { message } => Some(message),
        }
    }

    pub fn should_chain(&self) -> bool {
        self.should_chain
    }

    pub fn suggested_next_tool(&self) -> Option<&str> {
        self.suggested_next_tool.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// Fetch a required string parameter.
pub fn required_str<'a>(params: &'a Parameters, name: &str) -> Result<&'a str, ToolError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(ToolError::MissingParameter(name.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ToolError::invalid(
            name,
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

/// Fetch an optional string parameter.
pub fn optional_str<'a>(params: &'a Parameters, name: &str) -> Result<Option<&'a str>, ToolError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::invalid(
            name,
            format!("expected string, got {}", json_type(other)),
        )),
    }
}

/// Fetch an optional unsigned integer parameter. Numeric strings are accepted.
pub fn optional_u64(params: &Parameters, name: &str) -> Result<Option<u64>, ToolError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ToolError::invalid(name, "expected a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ToolError::invalid(name, format!("not an integer: {s}"))),
        Some(other) => Err(ToolError::invalid(
            name,
            format!("expected integer, got {}", json_type(other)),
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn failure_has_error_and_no_chain() {
        let result = ToolResult::failure("boom").chain(Some("search".into()));
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("boom"));
        assert!(!result.should_chain());
        assert_eq!(result.suggested_next_tool(), None);
    }

    #[test]
    fn success_chain_sets_next_tool() {
        let result = ToolResult::success(ToolOutput::ChainedData(json!({"query": "x"})))
            .chain(Some("searchDuckduckgo".into()));
        assert!(result.is_success());
        assert_eq!(result.error(), None);
        assert!(result.should_chain());
        assert_eq!(result.suggested_next_tool(), Some("searchDuckduckgo"));
    }

    #[test]
    fn parameter_helpers() {
        let p = params(json!({"query": "rust", "limit": "4", "flag": true}));
        assert_eq!(required_str(&p, "query").unwrap(), "rust");
        assert_eq!(optional_u64(&p, "limit").unwrap(), Some(4));
        assert_eq!(
            required_str(&p, "missing"),
            Err(ToolError::MissingParameter("missing".into()))
        );
        assert!(matches!(
            required_str(&p, "flag"),
            Err(ToolError::InvalidParameter { .. })
        ));
        assert_eq!(optional_str(&p, "missing").unwrap(), None);
    }

    #[test]
    fn tool_output_serializes_tagged() {
        let out = ToolOutput::Text("hi".into());
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({"kind": "text", "value": "hi"})
        );
    }
}
