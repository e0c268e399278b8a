//! Model provider adapters.
//!
//! Each provider implements [`ModelBackend`](crate::model::ModelBackend) for
//! its specific API.

mod ollama;

pub use ollama::{DEFAULT_OLLAMA_URL, OllamaBackend, OllamaBackendBuilder};
