//! The generation orchestrator.
//!
//! An [`Assistant`] drives one turn at a time: it builds the augmented
//! prompt, consumes the model stream, then parses, dispatches and formats
//! tool calls found in the finished text. State is published as
//! [`Snapshot`]s on a watch channel; the running turn is the only writer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::dispatch::ToolDispatcher;
use crate::format::{OutputFormatter, dedupe};
use crate::model::{LoadProgress, ModelBackend, ModelError, StreamEvent};
use crate::parser::ToolCallParser;
use crate::prompt::build_prompt;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// Identifies one turn in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(pub Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the current turn is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Streaming,
    Aggregating,
    Dispatching,
    Finalizing,
    Failed,
    Cancelled,
}

/// Observable state of the assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    /// Live partial text while streaming, the final transcript afterwards.
    pub output: String,
    /// Throughput, e.g. `"12.5 tokens/s"`.
    pub stat: String,
    pub running: bool,
    pub is_loading: bool,
    pub loading_progress: Option<LoadProgress>,
    pub tool_iteration: usize,
}

/// How a call to [`Assistant::generate`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { output: String },
    Failed { error: String },
    Cancelled,
    /// Another turn was already running.
    Rejected,
}

enum Stop {
    Cancelled,
    Failed(Error),
}

impl From<Error> for Stop {
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

impl From<ModelError> for Stop {
    fn from(error: ModelError) -> Self {
        Self::Failed(error.into())
    }
}

/// Clears the running flag when a turn ends, however it ends.
struct RunningGuard<'a> {
    running: &'a AtomicBool,
    state: &'a watch::Sender<Snapshot>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        // The flag is cleared under the channel lock so a turn started right
        // after cannot have its first publish overwritten.
        self.state.send_modify(|s| {
            s.running = false;
            s.is_loading = false;
            s.phase = Phase::Idle;
            self.running.store(false, Ordering::Release);
        });
    }
}

/// Tool-augmented streaming generation orchestrator.
pub struct Assistant {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    config: AssistantConfig,
    parser: ToolCallParser,
    dispatcher: ToolDispatcher,
    formatter: OutputFormatter,
    state: watch::Sender<Snapshot>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
    selected_model: Mutex<String>,
    loaded_model: Mutex<Option<String>>,
}

impl Assistant {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        config: AssistantConfig,
    ) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            backend,
            registry,
            parser: ToolCallParser::new(&config.syntax, &config.heuristics),
            dispatcher: ToolDispatcher::new(config.max_tool_iterations),
            formatter: OutputFormatter::new(&config.syntax),
            selected_model: Mutex::new(config.model.clone()),
            config,
            state,
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            loaded_model: Mutex::new(None),
        }
    }

    /// Replace the tool-call parser, e.g. to change the heuristic tier.
    pub fn with_parser(mut self, parser: ToolCallParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Receive every published [`Snapshot`].
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// The latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Model used by the next turn.
    pub fn model(&self) -> String {
        self.selected_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Select the model for the next turn. It is loaded lazily.
    pub fn select_model(&self, model_id: &str) -> Result<()> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(Error::Config("model id must not be empty".into()));
        }
        *self
            .selected_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = model_id.to_string();
        info!(model = %model_id, "model selected");
        Ok(())
    }

    /// Cancel the running turn, if any.
    pub fn cancel(&self) {
        // Same lock `generate` claims the turn under, so the token seen here
        // always belongs to the running turn.
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_running() {
            debug!("cancel requested");
            token.cancel();
        }
    }

    /// Run one turn for `prompt`.
    ///
    /// Returns [`TurnOutcome::Rejected`] without side effects if a turn is
    /// already running.
    pub async fn generate(&self, prompt: &str) -> TurnOutcome {
        let cancel = {
            let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            if self
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("generate rejected, a turn is already running");
                return TurnOutcome::Rejected;
            }
            *slot = CancellationToken::new();
            slot.clone()
        };
        let _guard = RunningGuard {
            running: &self.running,
            state: &self.state,
        };

        let id = TurnId::new();
        let span = info_span!("turn", id = %id);
        async {
            info!("turn started");
            match self.run_turn(prompt, &cancel).await {
                Ok(output) => {
                    info!("turn completed");
                    TurnOutcome::Completed { output }
                }
                Err(Stop::Cancelled) => {
                    info!("turn cancelled");
                    self.set_phase(Phase::Cancelled);
                    TurnOutcome::Cancelled
                }
                Err(Stop::Failed(e)) => {
                    warn!("turn failed: {e}");
                    let error = e.to_string();
                    self.state.send_modify(|s| {
                        s.phase = Phase::Failed;
                        s.output = format!("Failed: {error}");
                    });
                    TurnOutcome::Failed { error }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_turn(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, Stop> {
        self.state.send_modify(|s| {
            s.running = true;
            s.output.clear();
            s.stat.clear();
            s.tool_iteration = 0;
        });
        let mut iteration = 0;

        let model = self.model();
        self.ensure_model_loaded(&model, cancel).await?;

        self.set_phase(Phase::Streaming);
        let context = build_prompt(&self.config, &self.registry.snapshot(), prompt);
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Stop::Cancelled),
            opened = self.backend.open(&model, context) => opened?,
        };

        let mut text = String::new();
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Stop::Cancelled),
                event = stream.next() => event,
            };
            match event {
                None => break,
                Some(Ok(StreamEvent::Chunk(chunk))) => {
                    text.push_str(&chunk);
                    self.state.send_modify(|s| s.output.clone_from(&text));
                }
                Some(Ok(StreamEvent::Info { tokens_per_second })) => {
                    let stat = format!("{tokens_per_second:.1} tokens/s");
                    self.state.send_modify(|s| s.stat = stat);
                }
                Some(Ok(StreamEvent::ToolCallNative(payload))) => {
                    debug!(%payload, "native tool call event ignored");
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
        drop(stream);
        debug!(chars = text.len(), "stream finished");

        self.set_phase(Phase::Aggregating);
        if cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        let calls = self.parser.parse(&text);

        self.set_phase(Phase::Dispatching);
        let tools = self.registry.snapshot();
        let fragments = self
            .dispatcher
            .dispatch(&calls, &tools, &mut iteration, cancel)
            .await;
        if cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }

        let cleaned = dedupe(&self.formatter.clean(&text));
        let output = self.formatter.render(&cleaned, &fragments);
        self.state.send_modify(|s| {
            s.phase = Phase::Finalizing;
            s.output.clone_from(&output);
            s.tool_iteration = iteration;
        });
        Ok(output)
    }

    /// Load the model if it is not the one loaded last, reclaiming the
    /// previous model's artifact first.
    async fn ensure_model_loaded(
        &self,
        model: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), Stop> {
        let loaded = self
            .loaded_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if loaded.as_deref() == Some(model) {
            return Ok(());
        }
        if let (Some(stale), Some(dir)) = (loaded.as_deref(), self.config.model_dir.as_deref()) {
            match remove_artifact(dir, stale) {
                Ok(true) => info!(model = %stale, "stale model artifact removed"),
                Ok(false) => debug!(model = %stale, "no stale model artifact"),
                Err(e) => warn!(model = %stale, "failed to remove stale model artifact: {e}"),
            }
        }

        info!(model = %model, "loading model");
        self.state.send_modify(|s| {
            s.phase = Phase::Loading;
            s.is_loading = true;
            s.loading_progress = Some(LoadProgress::new(format!("Loading {model}"), 0.0));
        });
        let progress = |p: LoadProgress| {
            self.state.send_modify(|s| s.loading_progress = Some(p));
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Stop::Cancelled),
            done = self.backend.load(model, &progress) => done.map_err(Stop::from),
        };
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.loading_progress = None;
        });
        result?;

        *self
            .loaded_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(model.to_string());
        Ok(())
    }

    fn set_phase(&self, phase: Phase) {
        self.state.send_modify(|s| s.phase = phase);
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("model", &self.model())
            .field("running", &self.is_running())
            .field("selected_tools", &self.registry.selected())
            .finish_non_exhaustive()
    }
}

/// On-disk location of a model's artifact under `dir`.
pub fn artifact_path(dir: &Path, model_id: &str) -> PathBuf {
    dir.join(model_id.replace(['/', '\\', ':'], "_"))
}

/// Remove a model's artifact. Returns `Ok(false)` if there was none.
fn remove_artifact(dir: &Path, model_id: &str) -> Result<bool> {
    let path = artifact_path(dir, model_id);
    let meta = match std::fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(&path)?;
    } else {
        std::fs::remove_file(&path)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, StaticTool, Step, chunk};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::new([
                StaticTool::view(
                    "getTodayDate",
                    "date",
                    json!({"formatted": "Sunday, October 18, 2026"}),
                )
                .into_dyn(),
                StaticTool::echo("searchDuckduckgo").into_dyn(),
                StaticTool::chaining("queryRefine", json!({"query": "x"}), "searchDuckduckgo")
                    .into_dyn(),
            ])
            .with_all_selected(),
        )
    }

    fn assistant(backend: ScriptedBackend) -> (Arc<Assistant>, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let assistant = Assistant::new(backend.clone(), registry(), AssistantConfig::default());
        (Arc::new(assistant), backend)
    }

    fn completed(outcome: TurnOutcome) -> String {
        match outcome {
            TurnOutcome::Completed { output } => output,
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_turn() {
        let (assistant, backend) = assistant(ScriptedBackend::new().script(vec![
            chunk("Hello"),
            chunk(", world.<|im_end|>"),
            Step::Event(StreamEvent::Info { tokens_per_second: 12.345 }),
        ]));
        let output = completed(assistant.generate("hi").await);

        assert_eq!(output, "Hello, world.");
        let snapshot = assistant.snapshot();
        assert_eq!(snapshot.output, "Hello, world.");
        assert_eq!(snapshot.stat, "12.3 tokens/s");
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.running);
        assert_eq!(snapshot.tool_iteration, 0);
        assert_eq!(backend.prompts()[0].prompt, "hi");
    }

    #[tokio::test]
    async fn date_question_renders_date_fragment() {
        let (assistant, _) = assistant(
            ScriptedBackend::new().script(vec![chunk("What's today's date")]),
        );
        let output = completed(assistant.generate("What's today's date").await);
        assert!(output.contains("📅 Today's Date: Sunday, October 18, 2026"));
        assert_eq!(assistant.snapshot().tool_iteration, 1);
    }

    #[tokio::test]
    async fn structured_call_is_dispatched_and_stripped() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![
            chunk("Searching.\n<tool_call>{\"name\":\"searchDuckduckgo\","),
            chunk("\"parameters\":{\"query\":\"rust ownership\"}}</tool_call>"),
        ]));
        let output = completed(assistant.generate("tell me about rust").await);
        assert_eq!(output, "Searching.\n\nsearchDuckduckgo: query: rust ownership");
    }

    #[tokio::test]
    async fn dispatched_call_json_never_reaches_the_output() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk(
            r#"Ok. <tool_call>{"name":"searchDuckduckgo","arguments":{"query":"rust"}}</tool_call>"#,
        )]));
        let output = completed(assistant.generate("rust").await);
        assert_eq!(output, "Ok.\n\nsearchDuckduckgo: query: rust");
    }

    #[tokio::test]
    async fn call_without_parameters_is_not_dispatched() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk(
            r#"Ok. <tool_call>{"name":"getTodayDate"}</tool_call>"#,
        )]));
        let output = completed(assistant.generate("hi").await);
        assert!(!output.contains("📅"));
        assert_eq!(assistant.snapshot().tool_iteration, 0);
    }

    #[tokio::test]
    async fn zero_iteration_bound_disables_dispatch() {
        let backend = Arc::new(ScriptedBackend::new().script(vec![chunk(
            r#"Looking. <tool_call>{"name":"searchDuckduckgo","parameters":{"query":"x"}}</tool_call>"#,
        )]));
        let config = AssistantConfig {
            max_tool_iterations: 0,
            ..AssistantConfig::default()
        };
        let assistant = Assistant::new(backend, registry(), config);

        let output = completed(assistant.generate("x").await);
        assert_eq!(output, "Looking.");
        assert_eq!(assistant.snapshot().tool_iteration, 0);
    }

    #[tokio::test]
    async fn unknown_tool_still_completes() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk(
            "<tool_call>{\"name\":\"frobnicate\",\"parameters\":{}}</tool_call>",
        )]));
        let output = completed(assistant.generate("do it").await);
        assert_eq!(output, "❌ frobnicate failed: tool not found");
    }

    #[tokio::test]
    async fn chained_fragment_follows_its_trigger() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk(
            r#"<tool_call>{"name":"queryRefine","parameters":{"query":"so, x?"}}</tool_call>"#,
        )]));
        let output = completed(assistant.generate("x").await);
        assert_eq!(output, "🔗 queryRefine: query: x\n\nsearchDuckduckgo: query: x");
    }

    #[tokio::test]
    async fn calls_render_in_source_order() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk(concat!(
            r#"<tool_call>{"name":"searchDuckduckgo","parameters":{"query":"A"}}</tool_call>"#,
            r#"<tool_call>{"name":"searchDuckduckgo","parameters":{"query":"B"}}</tool_call>"#,
        ))]));
        let output = completed(assistant.generate("both").await);
        let a = output.find("query: A").unwrap();
        let b = output.find("query: B").unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn echoed_answer_is_deduplicated() {
        let (assistant, _) = assistant(
            ScriptedBackend::new().script(vec![chunk("Rust is fast. Rust is fast.")]),
        );
        assert_eq!(completed(assistant.generate("rust?").await), "Rust is fast.");
    }

    #[tokio::test]
    async fn native_tool_call_events_are_ignored() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![
            Step::Event(StreamEvent::ToolCallNative(
                json!({"name": "getTodayDate", "parameters": {}}),
            )),
            chunk("No tools here."),
        ]));
        assert_eq!(completed(assistant.generate("hi").await), "No tools here.");
        assert_eq!(assistant.snapshot().tool_iteration, 0);
    }

    #[tokio::test]
    async fn stream_error_fails_turn_and_recovers() {
        let (assistant, _) = assistant(
            ScriptedBackend::new()
                .script(vec![
                    chunk("partial"),
                    Step::Fail(ModelError::Stream("connection reset".into())),
                ])
                .script(vec![chunk("second try")]),
        );

        let outcome = assistant.generate("one").await;
        assert_eq!(
            outcome,
            TurnOutcome::Failed {
                error: "stream: connection reset".into()
            }
        );
        let snapshot = assistant.snapshot();
        assert_eq!(snapshot.output, "Failed: stream: connection reset");
        assert!(!snapshot.running);
        assert!(!assistant.is_running());

        assert_eq!(completed(assistant.generate("two").await), "second try");
    }

    #[tokio::test]
    async fn open_error_fails_turn() {
        let (assistant, _) = assistant(
            ScriptedBackend::new().fail_open(ModelError::Network("refused".into())),
        );
        let outcome = assistant.generate("hi").await;
        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert_eq!(assistant.snapshot().output, "Failed: network: refused");
    }

    #[tokio::test]
    async fn load_error_fails_turn_and_load_is_retried() {
        let (assistant, backend) = assistant(
            ScriptedBackend::new()
                .fail_load(ModelError::Load("no space left".into()))
                .script(vec![chunk("ok")]),
        );
        let outcome = assistant.generate("hi").await;
        assert_eq!(
            outcome,
            TurnOutcome::Failed {
                error: "load: no space left".into()
            }
        );
        assert!(!assistant.snapshot().is_loading);

        assert_eq!(completed(assistant.generate("hi").await), "ok");
        assert_eq!(backend.loads().len(), 2);
    }

    #[tokio::test]
    async fn second_generate_while_running_is_rejected() {
        let gate = Arc::new(Notify::new());
        let (assistant, backend) = assistant(ScriptedBackend::new().script(vec![
            chunk("first"),
            Step::Wait(gate.clone()),
        ]));

        let mut rx = assistant.subscribe();
        let running = tokio::spawn({
            let assistant = assistant.clone();
            async move { assistant.generate("one").await }
        });
        rx.wait_for(|s| s.output == "first").await.unwrap();

        assert_eq!(assistant.generate("two").await, TurnOutcome::Rejected);
        assert_eq!(assistant.generate("three").await, TurnOutcome::Rejected);
        assert_eq!(backend.prompts().len(), 1);

        gate.notify_one();
        assert_eq!(completed(running.await.unwrap()), "first");
        assert!(!assistant.is_running());
    }

    #[tokio::test]
    async fn cancel_keeps_partial_output_and_skips_dispatch() {
        let gate = Arc::new(Notify::new());
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![
            chunk("What's today's date"),
            Step::Wait(gate.clone()),
            chunk(" and more"),
        ]));

        let mut rx = assistant.subscribe();
        let running = tokio::spawn({
            let assistant = assistant.clone();
            async move { assistant.generate("date?").await }
        });
        rx.wait_for(|s| s.output == "What's today's date").await.unwrap();

        assistant.cancel();
        let outcome = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Cancelled);

        let snapshot = assistant.snapshot();
        assert_eq!(snapshot.output, "What's today's date");
        assert_eq!(snapshot.tool_iteration, 0);
        assert!(!snapshot.running);
    }

    #[tokio::test]
    async fn cancel_when_idle_does_not_affect_next_turn() {
        let (assistant, _) = assistant(ScriptedBackend::new().script(vec![chunk("fine")]));
        assistant.cancel();
        assert_eq!(completed(assistant.generate("hi").await), "fine");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_right_after_turn_starts_is_not_lost() {
        let gate = Arc::new(Notify::new());
        let (assistant, _) = assistant(
            ScriptedBackend::new().script(vec![Step::Wait(gate.clone()), chunk("late")]),
        );

        let running = tokio::spawn({
            let assistant = assistant.clone();
            async move { assistant.generate("hi").await }
        });
        while !assistant.is_running() {
            tokio::task::yield_now().await;
        }
        assistant.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(assistant.snapshot().output, "");
    }

    #[tokio::test]
    async fn model_is_loaded_once_and_reloaded_on_change() {
        let dir = std::env::temp_dir().join(format!("ember-models-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let stale = artifact_path(&dir, "qwen2.5:3b");
        std::fs::write(&stale, b"weights").unwrap();

        let backend = Arc::new(ScriptedBackend::new());
        let config = AssistantConfig {
            model_dir: Some(dir.clone()),
            ..AssistantConfig::default()
        };
        let assistant = Assistant::new(backend.clone(), registry(), config);

        completed(assistant.generate("a").await);
        completed(assistant.generate("b").await);
        assert_eq!(backend.loads(), vec!["qwen2.5:3b"]);
        assert!(stale.exists());

        assistant.select_model("llama3.2:1b").unwrap();
        completed(assistant.generate("c").await);
        assert_eq!(backend.loads(), vec!["qwen2.5:3b", "llama3.2:1b"]);
        assert!(!stale.exists());

        // Nothing left to remove; the failure path only logs.
        assistant.select_model("qwen2.5:3b").unwrap();
        completed(assistant.generate("d").await);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn empty_model_id_is_rejected() {
        let (assistant, _) = assistant(ScriptedBackend::new());
        assert!(matches!(assistant.select_model("  "), Err(Error::Config(_))));
        assert_eq!(assistant.model(), "qwen2.5:3b");
    }
}
