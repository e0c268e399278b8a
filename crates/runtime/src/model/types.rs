//! Model stream types and backend trait.
//!
//! The orchestrator never sees weights, tokenizers or decoding. It opens a
//! stream of [`StreamEvent`]s for a [`PromptContext`] and consumes it.

use super::errors::ModelError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event emitted by an open model stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A piece of generated text.
    Chunk(String),
    /// Throughput information, usually sent once near the end.
    Info { tokens_per_second: f64 },
    /// A tool call the backend detected on its own. Opaque to the core.
    ToolCallNative(Value),
}

/// Stream of events for one generation. Ends normally or with a single error.
pub type EventStream = BoxStream<'static, Result<StreamEvent, ModelError>>;

/// Everything the backend needs to start generating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    /// System block: persona, tool catalog and user context.
    pub system: String,
    /// The user's prompt text.
    pub prompt: String,
    /// Sequences that end generation when produced.
    pub stop: Vec<String>,
}

/// Progress report while a model is being fetched or loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProgress {
    pub label: String,
    /// Completed fraction in `[0, 1]`.
    pub fraction: f64,
}

impl LoadProgress {
    pub fn new(label: impl Into<String>, fraction: f64) -> Self {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label: label.into(),
            fraction,
        }
    }
}

/// Callback receiving load progress.
pub type ProgressFn<'a> = &'a (dyn Fn(LoadProgress) + Send + Sync);

/// A model a backend knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Trait for streaming model backends.
///
/// Implementations must be cheap to share: the orchestrator holds one behind
/// an `Arc` and calls it from a single consumer task.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Make `model_id` ready for generation, reporting progress as it goes.
    async fn load(&self, model_id: &str, progress: ProgressFn<'_>) -> Result<(), ModelError>;

    /// Open a generation stream for the given prompt.
    async fn open(&self, model_id: &str, context: PromptContext) -> Result<EventStream, ModelError>;

    /// Models available to this backend.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_progress_clamps_fraction() {
        assert_eq!(LoadProgress::new("pull", 1.7).fraction, 1.0);
        assert_eq!(LoadProgress::new("pull", -0.2).fraction, 0.0);
        assert_eq!(LoadProgress::new("pull", f64::NAN).fraction, 0.0);
        assert_eq!(LoadProgress::new("pull", 0.25).fraction, 0.25);
    }
}
