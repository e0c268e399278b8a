//! Scripted model backend and tool doubles for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::model::{
    EventStream, LoadProgress, ModelBackend, ModelError, ModelInfo, ProgressFn, PromptContext,
    StreamEvent,
};
use crate::tools::{
    Parameters, Tool, ToolCall, ToolError, ToolOutput, ToolResult, ToolSpec, ToolView,
};

pub fn call(name: &str, parameters: Value) -> ToolCall {
    match parameters {
        Value::Object(map) => ToolCall::new(name, map),
        _ => ToolCall::new(name, Parameters::new()),
    }
}

enum Behavior {
    Respond(ToolResult),
    Reject(ToolError),
    Echo,
}

/// A tool with a fixed response that records the parameters it was given.
pub struct StaticTool {
    spec: ToolSpec,
    behavior: Behavior,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl StaticTool {
    fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            spec: ToolSpec::new(name, format!("test tool {name}")),
            behavior,
            calls: Arc::default(),
        }
    }

    pub fn text(name: &str, text: &str) -> Self {
        Self::new(name, Behavior::Respond(ToolResult::text(text)))
    }

    pub fn failing(name: &str, error: &str) -> Self {
        Self::new(name, Behavior::Respond(ToolResult::failure(error)))
    }

    pub fn rejecting(name: &str, error: ToolError) -> Self {
        Self::new(name, Behavior::Reject(error))
    }

    pub fn chaining(name: &str, data: Value, next: &str) -> Self {
        let result =
            ToolResult::success(ToolOutput::ChainedData(data)).chain(Some(next.to_string()));
        Self::new(name, Behavior::Respond(result))
    }

    pub fn view(name: &str, kind: &str, data: Value) -> Self {
        let Value::Object(data) = data else {
            panic!("view data must be an object");
        };
        let result = ToolResult::success(ToolOutput::RichView(ToolView::new(kind, data)));
        Self::new(name, Behavior::Respond(result))
    }

    /// Responds with `"{name}: key: value, ..."` built from its parameters.
    pub fn echo(name: &str) -> Self {
        Self::new(name, Behavior::Echo)
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }

    pub fn into_dyn(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, parameters: &Parameters) -> Result<ToolResult, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push(Value::Object(parameters.clone()));
        match &self.behavior {
            Behavior::Respond(result) => Ok(result.clone()),
            Behavior::Reject(error) => Err(error.clone()),
            Behavior::Echo => {
                let args: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => format!("{k}: {s}"),
                        other => format!("{k}: {other}"),
                    })
                    .collect();
                Ok(ToolResult::text(format!("{}: {}", self.spec.name, args.join(", "))))
            }
        }
    }
}

/// One step of a scripted stream.
pub enum Step {
    Event(StreamEvent),
    Fail(ModelError),
    /// Hold the stream open until the gate is notified.
    Wait(Arc<Notify>),
}

pub fn chunk(text: &str) -> Step {
    Step::Event(StreamEvent::Chunk(text.to_string()))
}

/// A backend that replays one queued script per `open` call.
///
/// Once the queue is empty, every further stream yields nothing.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    open_error: Mutex<Option<ModelError>>,
    load_error: Mutex<Option<ModelError>>,
    prompts: Mutex<Vec<PromptContext>>,
    loads: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().push_back(steps);
        self
    }

    pub fn fail_open(self, error: ModelError) -> Self {
        *self.open_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_load(self, error: ModelError) -> Self {
        *self.load_error.lock().unwrap() = Some(error);
        self
    }

    pub fn prompts(&self) -> Vec<PromptContext> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn load(&self, model_id: &str, progress: ProgressFn<'_>) -> Result<(), ModelError> {
        self.loads.lock().unwrap().push(model_id.to_string());
        progress(LoadProgress::new("pulling", 0.5));
        if let Some(error) = self.load_error.lock().unwrap().take() {
            return Err(error);
        }
        progress(LoadProgress::new("ready", 1.0));
        Ok(())
    }

    async fn open(
        &self,
        _model_id: &str,
        context: PromptContext,
    ) -> Result<EventStream, ModelError> {
        self.prompts.lock().unwrap().push(context);
        if let Some(error) = self.open_error.lock().unwrap().take() {
            return Err(error);
        }
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        let stream = async_stream::stream! {
            for step in steps {
                match step {
                    Step::Event(event) => yield Ok(event),
                    Step::Fail(error) => {
                        yield Err(error);
                        return;
                    }
                    Step::Wait(gate) => gate.notified().await,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            size_bytes: None,
        }])
    }
}
