//! Assistant configuration.
//!
//! Vocabularies and defaults the orchestrator depends on are injected here
//! rather than embedded in the parser and formatter, so tests can swap them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level assistant configuration, usually the `[assistant]` table of
/// `ember.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// System persona block.
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Static user-context block appended after the persona.
    #[serde(default)]
    pub user_context: String,

    /// Model used when none has been selected explicitly.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum dispatch passes before tool calls are ignored.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Directory holding downloaded model artifacts, one entry per model id.
    /// When set, the artifact of a replaced model is removed before loading.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    #[serde(default)]
    pub syntax: SyntaxConfig,

    #[serde(default)]
    pub heuristics: HeuristicConfig,
}

fn default_persona() -> String {
    "You are Ember, a helpful on-device assistant. Be concise and direct. \
     When a tool would answer the question better than you can, call it."
        .to_string()
}

fn default_model() -> String {
    "qwen2.5:3b".to_string()
}

fn default_max_tool_iterations() -> usize {
    5
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            user_context: String::new(),
            model: default_model(),
            max_tool_iterations: default_max_tool_iterations(),
            model_dir: None,
            syntax: SyntaxConfig::default(),
            heuristics: HeuristicConfig::default(),
        }
    }
}

/// The model's tool-call syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxConfig {
    #[serde(default = "default_open_marker")]
    pub open_marker: String,

    #[serde(default = "default_close_marker")]
    pub close_marker: String,

    /// Chat-template control tokens stripped from output and used as stop
    /// sequences.
    #[serde(default = "default_control_tokens")]
    pub control_tokens: Vec<String>,
}

fn default_open_marker() -> String {
    "<tool_call>".to_string()
}

fn default_close_marker() -> String {
    "</tool_call>".to_string()
}

fn default_control_tokens() -> Vec<String> {
    ["<|im_end|>", "<|im_start|>", "<|eot_id|>", "<|end|>", "<end_of_turn>"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            open_marker: default_open_marker(),
            close_marker: default_close_marker(),
            control_tokens: default_control_tokens(),
        }
    }
}

/// Trigger vocabularies for the heuristic parsing tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    #[serde(default = "default_date_tool")]
    pub date_tool: String,

    #[serde(default = "default_date_triggers")]
    pub date_triggers: Vec<String>,

    #[serde(default = "default_search_tool")]
    pub search_tool: String,

    /// Checked in order; the first trigger found wins.
    #[serde(default = "default_search_triggers")]
    pub search_triggers: Vec<String>,

    /// Minimum length of the text following a search trigger.
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

fn default_date_tool() -> String {
    "getTodayDate".to_string()
}

fn default_date_triggers() -> Vec<String> {
    [
        "today's date",
        "todays date",
        "what's the date",
        "what is the date",
        "what day is it",
        "current date",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_search_tool() -> String {
    "searchDuckduckgo".to_string()
}

fn default_search_triggers() -> Vec<String> {
    [
        "search for",
        "look up",
        "find information about",
        "who is",
        "what is",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_min_query_chars() -> usize {
    3
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            date_tool: default_date_tool(),
            date_triggers: default_date_triggers(),
            search_tool: default_search_tool(),
            search_triggers: default_search_triggers(),
            min_query_chars: default_min_query_chars(),
        }
    }
}
