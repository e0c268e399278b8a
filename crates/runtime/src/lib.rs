//! Ember runtime: tool-augmented streaming generation.
//!
//! This crate turns the raw text stream of a local language model into a
//! bounded, ordered sequence of tool invocations and a clean transcript.
//!
//! # Overview
//!
//! - **Assistant**: the orchestrator. Runs one turn at a time, publishes
//!   [`Snapshot`]s and can be cancelled mid-turn.
//! - **ModelBackend**: a trait abstracting streaming model providers
//!   (Ollama, etc.).
//! - **ToolRegistry**: the catalog of [`Tool`]s and the enabled subset.
//! - **ToolCallParser**, **ToolDispatcher**, **OutputFormatter**: the
//!   stages a finished response passes through.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::{Assistant, AssistantConfig, OllamaBackend, ToolRegistry, TurnOutcome};
//!
//! # async fn example() {
//! let backend = Arc::new(OllamaBackend::builder().build());
//! let registry = Arc::new(ToolRegistry::new(my_tools()).with_all_selected());
//! let assistant = Assistant::new(backend, registry, AssistantConfig::default());
//!
//! if let TurnOutcome::Completed { output } = assistant.generate("What's today's date?").await {
//!     println!("{output}");
//! }
//! # }
//! ```

mod assistant;
pub mod config;
mod dispatch;
mod error;
pub mod format;
pub mod model;
mod parser;
mod prompt;
mod providers;
pub mod tools;

#[cfg(test)]
mod testing;

// Orchestrator
pub use assistant::{Assistant, Phase, Snapshot, TurnId, TurnOutcome, artifact_path};

// Configuration
pub use config::{AssistantConfig, HeuristicConfig, SyntaxConfig};

// Pipeline stages
pub use dispatch::ToolDispatcher;
pub use format::OutputFormatter;
pub use parser::{DateIntent, Heuristic, SearchIntent, ToolCallParser};
pub use prompt::build_prompt;

// Model stream types
pub use model::{
    EventStream, LoadProgress, ModelBackend, ModelError, ModelInfo, PromptContext, StreamEvent,
};

// Providers
pub use providers::{DEFAULT_OLLAMA_URL, OllamaBackend, OllamaBackendBuilder};

// Tool types
pub use tools::{
    Parameters, Tool, ToolCall, ToolError, ToolOutput, ToolRegistry, ToolResult, ToolSet,
    ToolSpec, ToolView,
};

// Error types
pub use error::{Error, Result};
