//! Tool-call extraction from generated text.
//!
//! Two tiers, tried in order:
//!
//! 1. **Structured**: every `<tool_call>{"name": ..., "parameters": {...}}</tool_call>`
//!    block, left to right. A block with malformed JSON is skipped.
//! 2. **Heuristic**: only when tier 1 found nothing. An ordered list of
//!    [`Heuristic`] strategies is run against the lower-cased text and the
//!    first one that produces a call wins.
//!
//! Parsing never fails: unusable input yields an empty list.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{HeuristicConfig, SyntaxConfig};
use crate::tools::{Parameters, ToolCall};

/// A fallback strategy that recognizes a tool intent in plain text.
pub trait Heuristic: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Inspect the lower-cased text and propose at most one call.
    fn detect(&self, lowered: &str) -> Option<ToolCall>;
}

/// Date/time intent: any trigger phrase maps to the date tool with a view
/// display type.
#[derive(Debug, Clone)]
pub struct DateIntent {
    tool: String,
    triggers: Vec<String>,
}

impl DateIntent {
    pub fn new(tool: impl Into<String>, triggers: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            triggers: lowercase_all(triggers),
        }
    }
}

impl Heuristic for DateIntent {
    fn name(&self) -> &str {
        "date"
    }

    fn detect(&self, lowered: &str) -> Option<ToolCall> {
        let hit = self
            .triggers
            .iter()
            .any(|t| !t.is_empty() && lowered.contains(t.as_str()));
        if !hit {
            return None;
        }
        let mut parameters = Parameters::new();
        parameters.insert("displayType".into(), Value::String("view".into()));
        Some(ToolCall::new(self.tool.clone(), parameters))
    }
}

/// Search intent: the text after the first matching trigger becomes the
/// `query` parameter of the search tool.
#[derive(Debug, Clone)]
pub struct SearchIntent {
    tool: String,
    triggers: Vec<String>,
    min_chars: usize,
}

impl SearchIntent {
    pub fn new(tool: impl Into<String>, triggers: Vec<String>, min_chars: usize) -> Self {
        Self {
            tool: tool.into(),
            triggers: lowercase_all(triggers),
            min_chars,
        }
    }
}

impl Heuristic for SearchIntent {
    fn name(&self) -> &str {
        "search"
    }

    fn detect(&self, lowered: &str) -> Option<ToolCall> {
        for trigger in self.triggers.iter().filter(|t| !t.is_empty()) {
            let Some(pos) = lowered.find(trigger.as_str()) else {
                continue;
            };
            let query = lowered[pos + trigger.len()..]
                .trim()
                .trim_end_matches('?')
                .trim();
            if query.chars().count() < self.min_chars {
                continue;
            }
            let mut parameters = Parameters::new();
            parameters.insert("query".into(), Value::String(query.to_string()));
            return Some(ToolCall::new(self.tool.clone(), parameters));
        }
        None
    }
}

fn lowercase_all(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}

#[derive(Debug, Deserialize)]
struct StructuredCall {
    name: String,
    #[serde(alias = "arguments")]
    parameters: Map<String, Value>,
}

/// Decode one `{"name": ..., "parameters": {...}}` object.
///
/// `arguments` is accepted in place of `parameters`. A blank name decodes
/// to `Ok(None)`.
pub(crate) fn decode_call(json: &str) -> serde_json::Result<Option<ToolCall>> {
    let call: StructuredCall = serde_json::from_str(json)?;
    let name = call.name.trim();
    Ok((!name.is_empty()).then(|| ToolCall::new(name, call.parameters)))
}

/// Extracts tool-call candidates from a finished block of generated text.
pub struct ToolCallParser {
    open_marker: String,
    close_marker: String,
    heuristics: Vec<Box<dyn Heuristic>>,
}

impl ToolCallParser {
    /// Build a parser with the default date and search heuristics.
    pub fn new(syntax: &SyntaxConfig, heuristics: &HeuristicConfig) -> Self {
        Self::structured_only(syntax)
            .with_heuristic(DateIntent::new(
                heuristics.date_tool.clone(),
                heuristics.date_triggers.clone(),
            ))
            .with_heuristic(SearchIntent::new(
                heuristics.search_tool.clone(),
                heuristics.search_triggers.clone(),
                heuristics.min_query_chars,
            ))
    }

    /// Build a parser with no heuristic fallback.
    pub fn structured_only(syntax: &SyntaxConfig) -> Self {
        Self {
            open_marker: syntax.open_marker.clone(),
            close_marker: syntax.close_marker.clone(),
            heuristics: Vec::new(),
        }
    }

    /// Append a fallback strategy. Strategies run in the order added.
    pub fn with_heuristic(mut self, heuristic: impl Heuristic + 'static) -> Self {
        self.heuristics.push(Box::new(heuristic));
        self
    }

    /// Extract zero or more calls, in source order.
    pub fn parse(&self, text: &str) -> Vec<ToolCall> {
        let calls = self.parse_structured(text);
        if !calls.is_empty() {
            return calls;
        }
        self.parse_heuristic(text)
    }

    fn parse_structured(&self, text: &str) -> Vec<ToolCall> {
        let mut calls = Vec::new();
        if self.open_marker.is_empty() || self.close_marker.is_empty() {
            return calls;
        }

        let mut rest = text;
        while let Some(start) = rest.find(&self.open_marker) {
            let after_open = &rest[start + self.open_marker.len()..];
            let Some(end) = after_open.find(&self.close_marker) else {
                debug!("unterminated tool call marker");
                break;
            };
            let body = after_open[..end].trim();
            match decode_call(body) {
                Ok(Some(call)) => {
                    debug!(tool = %call.name, "structured tool call");
                    calls.push(call);
                }
                Ok(None) => warn!("structured tool call without a name skipped"),
                Err(e) => warn!("malformed structured tool call skipped: {e}"),
            }
            rest = &after_open[end + self.close_marker.len()..];
        }
        calls
    }

    fn parse_heuristic(&self, text: &str) -> Vec<ToolCall> {
        let lowered = text.to_lowercase();
        let mut calls: Vec<ToolCall> = Vec::new();
        for heuristic in &self.heuristics {
            let Some(call) = heuristic.detect(&lowered) else {
                continue;
            };
            if calls.iter().any(|c| c.name == call.name) {
                continue;
            }
            debug!(heuristic = heuristic.name(), tool = %call.name, "heuristic tool call");
            calls.push(call);
            break;
        }
        calls
    }
}

impl std::fmt::Debug for ToolCallParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallParser")
            .field("open_marker", &self.open_marker)
            .field("close_marker", &self.close_marker)
            .field(
                "heuristics",
                &self.heuristics.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ToolCallParser {
        ToolCallParser::new(&SyntaxConfig::default(), &HeuristicConfig::default())
    }

    fn query(call: &ToolCall) -> &str {
        call.parameters["query"].as_str().unwrap()
    }

    #[test]
    fn structured_call_is_extracted() {
        let text = r#"Let me check. <tool_call>{"name":"searchDuckduckgo","parameters":{"query":"rust ownership"}}</tool_call>"#;
        let calls = parser().parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "searchDuckduckgo");
        assert_eq!(query(&calls[0]), "rust ownership");
    }

    #[test]
    fn structured_calls_keep_source_order() {
        let text = concat!(
            r#"<tool_call>{"name":"a","parameters":{}}</tool_call> then "#,
            r#"<tool_call>{"name":"b","parameters":{"x":1}}</tool_call>"#,
        );
        let names: Vec<_> = parser().parse(text).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn malformed_block_does_not_stop_scanning() {
        let text = concat!(
            r#"<tool_call>{"name": "a", "parameters": </tool_call>"#,
            r#"<tool_call>{"name":"b","parameters":{}}</tool_call>"#,
        );
        let calls = parser().parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "b");
    }

    #[test]
    fn arguments_alias_is_accepted_and_parameters_are_required() {
        let text = concat!(
            r#"<tool_call>{"name":"a","arguments":{"query":"rust"}}</tool_call>"#,
            r#"<tool_call>{"name":"b"}</tool_call>"#,
            r#"<tool_call>{"name":"c","parameters":"rust"}</tool_call>"#,
        );
        let calls = parser().parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "a");
        assert_eq!(query(&calls[0]), "rust");
    }

    #[test]
    fn structured_match_suppresses_heuristics() {
        let text = r#"What's today's date? <tool_call>{"name":"searchDuckduckgo","parameters":{"query":"x y z"}}</tool_call>"#;
        let calls = parser().parse(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "searchDuckduckgo");
    }

    #[test]
    fn date_heuristic_short_circuits_search() {
        let calls = parser().parse("What's today's date? Also, what is rust?");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "getTodayDate");
        assert_eq!(calls[0].parameters["displayType"], "view");
    }

    #[test]
    fn search_heuristic_takes_text_after_trigger() {
        let calls = parser().parse("Let me look up Rust Ownership Rules?");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "searchDuckduckgo");
        assert_eq!(query(&calls[0]), "rust ownership rules");
    }

    #[test]
    fn short_remainder_falls_through_to_next_trigger() {
        // "search for" leaves "it" (too short); "who is" is tried next.
        let calls = parser().parse("who is ada lovelace, search for it");
        assert_eq!(calls.len(), 1);
        assert_eq!(query(&calls[0]), "ada lovelace, search for it");

        assert!(parser().parse("search for ok?").is_empty());
    }

    #[test]
    fn heuristics_can_be_replaced() {
        let parser = ToolCallParser::structured_only(&SyntaxConfig::default())
            .with_heuristic(SearchIntent::new("web", vec!["Google".into()], 1));
        let calls = parser.parse("google cats");
        assert_eq!(calls[0].name, "web");
        assert_eq!(query(&calls[0]), "cats");
        assert!(parser.parse("what's the date").is_empty());
    }

    #[test]
    fn parse_is_total() {
        let inputs = [
            "",
            "<tool_call>",
            "</tool_call>",
            "<tool_call></tool_call>",
            "<tool_call>{</tool_call>",
            "<tool_call>[1,2]</tool_call><tool_call>",
            "<tool_call>{\"name\":\"\",\"parameters\":{}}</tool_call>",
            "\u{0}\u{FFFD}<tool_call>\u{1F600}</tool_call>",
            "İstanbul search for ǅemal",
            "what is",
        ];
        for input in inputs {
            let _ = parser().parse(input);
        }
        assert!(parser().parse("").is_empty());
    }

    #[test]
    fn empty_markers_disable_structured_tier() {
        let syntax = SyntaxConfig {
            open_marker: String::new(),
            close_marker: String::new(),
            ..SyntaxConfig::default()
        };
        let parser = ToolCallParser::structured_only(&syntax);
        assert!(parser.parse(r#"{"name":"a","parameters":{}}"#).is_empty());
    }
}
