//! Ollama backend.
//!
//! Talks to a local Ollama daemon over its HTTP API. Both pulling a model and
//! generating text stream newline-delimited JSON.

use std::fmt;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    EventStream, LoadProgress, ModelBackend, ModelError, ModelInfo, ProgressFn, PromptContext,
    StreamEvent,
};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    eval_count: Option<u64>,
    /// Nanoseconds.
    eval_duration: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullLine {
    #[serde(default)]
    status: String,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
    size: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    url: String,
    keep_alive: Option<String>,
    client: Option<reqwest::Client>,
}

impl OllamaBackendBuilder {
    pub fn new() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            keep_alive: None,
            client: None,
        }
    }

    /// Base URL of the daemon.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// How long the daemon keeps the model in memory, e.g. `"10m"`.
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> OllamaBackend {
        OllamaBackend {
            client: self.client.unwrap_or_default(),
            url: self.url.trim_end_matches('/').to_string(),
            keep_alive: self.keep_alive,
        }
    }
}

impl Default for OllamaBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ollama API backend.
pub struct OllamaBackend {
    client: reqwest::Client,
    url: String,
    keep_alive: Option<String>,
}

impl OllamaBackend {
    pub fn builder() -> OllamaBackendBuilder {
        OllamaBackendBuilder::new()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.url)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;
        check_status(response).await
    }
}

impl fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ollama({})", self.url)
    }
}

#[async_trait::async_trait]
impl ModelBackend for OllamaBackend {
    async fn load(&self, model_id: &str, progress: ProgressFn<'_>) -> Result<(), ModelError> {
        let installed = self.list_models().await?;
        if installed.iter().any(|m| m.id == model_id) {
            debug!(model = %model_id, "model already present");
            progress(LoadProgress::new("ready", 1.0));
            return Ok(());
        }

        let response = self
            .post(
                "pull",
                &PullRequest {
                    model: model_id,
                    stream: true,
                },
            )
            .await
            .map_err(|e| ModelError::Load(e.to_string()))?;

        let lines = ndjson_lines(response.bytes_stream());
        futures::pin_mut!(lines);
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| ModelError::Load(e.to_string()))?;
            progress(pull_progress(&line)?);
        }
        progress(LoadProgress::new("ready", 1.0));
        Ok(())
    }

    async fn open(
        &self,
        model_id: &str,
        context: PromptContext,
    ) -> Result<EventStream, ModelError> {
        let request = GenerateRequest {
            model: model_id,
            prompt: &context.prompt,
            system: Some(context.system.as_str()).filter(|s| !s.is_empty()),
            stream: true,
            keep_alive: self.keep_alive.as_deref(),
            options: (!context.stop.is_empty()).then_some(GenerateOptions {
                stop: &context.stop,
            }),
        };
        let response = self.post("generate", &request).await?;

        let lines = ndjson_lines(response.bytes_stream());
        let stream = async_stream::stream! {
            futures::pin_mut!(lines);
            while let Some(line) = lines.next().await {
                let events = match line {
                    Ok(line) => generate_events(&line),
                    Err(e) => Err(e),
                };
                match events {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        let response = self
            .client
            .get(self.endpoint("tags"))
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;
        let tags: TagsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name,
                size_bytes: m.size,
            })
            .collect())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Api(format!("{status}: {body}")))
}

/// Split a byte stream into trimmed, non-empty lines.
fn ndjson_lines<S, B, E>(
    bytes: S,
) -> impl Stream<Item = Result<String, ModelError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut buf: Vec<u8> = Vec::new();
        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(chunk.as_ref()),
                Err(e) => {
                    yield Err(ModelError::Stream(e.to_string()));
                    return;
                }
            }
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line).trim().to_string();
                if !line.is_empty() {
                    yield Ok(line);
                }
            }
        }
        let rest = String::from_utf8_lossy(&buf).trim().to_string();
        if !rest.is_empty() {
            yield Ok(rest);
        }
    }
}

/// Events carried by one line of `/api/generate` output.
fn generate_events(line: &str) -> Result<Vec<StreamEvent>, ModelError> {
    let parsed: GenerateLine =
        serde_json::from_str(line).map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
    if let Some(error) = parsed.error {
        return Err(ModelError::Stream(error));
    }
    let mut events = Vec::new();
    if !parsed.response.is_empty() {
        events.push(StreamEvent::Chunk(parsed.response));
    }
    if parsed.done {
        match (parsed.eval_count, parsed.eval_duration) {
            (Some(count), Some(duration)) if duration > 0 => {
                let tokens_per_second = count as f64 / (duration as f64 / 1e9);
                events.push(StreamEvent::Info { tokens_per_second });
            }
            _ => debug!("generation finished without timing"),
        }
    }
    Ok(events)
}

/// Progress carried by one line of `/api/pull` output.
fn pull_progress(line: &str) -> Result<LoadProgress, ModelError> {
    let parsed: PullLine =
        serde_json::from_str(line).map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
    if let Some(error) = parsed.error {
        return Err(ModelError::Load(error));
    }
    let fraction = match (parsed.completed, parsed.total) {
        (Some(done), Some(total)) if total > 0 => done as f64 / total as f64,
        _ if parsed.status == "success" => 1.0,
        _ => 0.0,
    };
    Ok(LoadProgress::new(parsed.status, fraction))
}
