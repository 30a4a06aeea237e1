//! The think/act loop behind every agent.
//!
//! A run appends exactly one assistant turn to the incoming log. Each
//! iteration streams one step from the model, records text and tool calls as
//! parts of that turn, executes the calls, and records their terminal
//! snapshots. The loop ends when a step produces no tool calls.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{FuturesOrdered, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::{RunEventEmitter, RunEventPayload, RunEventSink, RunLifecycle};
use super::types::{RunId, RunResult};
use crate::config::RuntimeConfig;
use crate::delegation::{AgentKind, DelegateTool, Orchestrator, Specialist};
use crate::derive::{derive_session_facts, DelegateCatalog, SessionFacts};
use crate::error::{OrchestraError, Result};
use crate::instructions::compose_instructions;
use crate::log::{LogDelta, MessageLog};
use crate::provider::{ModelDelta, ModelProvider, ProviderRequest};
use crate::tools::validation::validate_arguments;
use crate::tools::{Tool, ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::{GenerationSettings, Part, ToolInvocation, ToolInvocationState, Turn};

/// Request payload to start a run.
#[derive(Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    /// The log so far. Validated before the run starts.
    pub turns: Vec<Turn>,
    /// Custom instructions for this request, appended to the baseline.
    pub instructions: Option<String>,
    pub event_sink: Option<RunEventSink>,
}

impl RunRequest {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            turns,
            instructions: None,
            event_sink: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("run_id", &self.run_id)
            .field("turns", &self.turns.len())
            .field("instructions", &self.instructions)
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}

/// Handle for a run spawned with [`ToolLoopAgent::start`].
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    cancel: CancellationToken,
    join: JoinHandle<RunResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Token shared with every tool call and delegation of this run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the run. Returns false if it was already cancelled.
    pub fn abort(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub async fn wait(self) -> RunResult {
        match self.join.await {
            Ok(result) => result,
            Err(err) => RunResult::failed(
                self.run_id,
                format!("run task ended abnormally: {err}"),
                Vec::new(),
            ),
        }
    }
}

/// An agent: baseline instructions, tools and a model capability.
///
/// `K` is [`Specialist`] or [`Orchestrator`]. Only orchestrators can be
/// built with delegation tools, and a delegation tool only wraps
/// specialists, so delegation is at most one hop deep.
pub struct ToolLoopAgent<K = Specialist> {
    id: String,
    display_name: String,
    baseline: String,
    custom_instructions: Option<String>,
    tools: ToolRegistry,
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    settings: GenerationSettings,
    _kind: PhantomData<fn() -> K>,
}

impl<K> fmt::Debug for ToolLoopAgent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolLoopAgent")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("tools", &self.tools.names())
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl<K: AgentKind> ToolLoopAgent<K> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Instructions sent to the model when a request carries none of its own.
    pub fn instructions(&self) -> String {
        self.instructions_with(None)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Delegation tools of this agent mapped to the specialists' display names.
    pub fn delegate_catalog(&self) -> DelegateCatalog {
        self.tools.delegate_catalog()
    }

    fn instructions_with(&self, custom: Option<&str>) -> String {
        compose_instructions(
            &self.baseline,
            custom.or(self.custom_instructions.as_deref()),
        )
    }

    /// Run the loop in the current task.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> RunResult {
        let run_id = request.run_id;
        let emitter = RunEventEmitter::new(run_id, request.event_sink.clone());
        emitter.lifecycle(RunLifecycle::Started);
        tracing::info!(run_id = %run_id, agent = %self.id, turns = request.turns.len(), "run started");

        let log = match MessageLog::from_turns(request.turns.clone()) {
            Ok(log) => log,
            Err(err) => return self.finish(run_id, Err(err), request.turns, &emitter),
        };
        let mut writer = LogWriter::new(log, cancel.clone(), &emitter);
        let outcome = self
            .drive(&mut writer, request.instructions.as_deref(), &cancel)
            .await;
        self.finish(run_id, outcome, writer.into_turns(), &emitter)
    }

    /// Spawn the loop on the runtime and return a handle to it.
    pub fn start(self: &Arc<Self>, request: RunRequest) -> RunHandle {
        let run_id = request.run_id;
        let cancel = CancellationToken::new();
        let agent = Arc::clone(self);
        let token = cancel.clone();
        let join = tokio::spawn(async move { agent.run(request, token).await });
        RunHandle {
            run_id,
            cancel,
            join,
        }
    }

    /// Run a single-prompt session and return the final text.
    ///
    /// Fails with [`OrchestraError::Canceled`] if `cancel` fires, otherwise
    /// with whatever ended the run.
    pub async fn generate(&self, prompt: impl Into<String>, cancel: CancellationToken) -> Result<String> {
        let request = RunRequest::new(vec![Turn::user(prompt)]);
        let emitter = RunEventEmitter::new(request.run_id, None);
        tracing::debug!(run_id = %request.run_id, agent = %self.id, "generate");
        let log = MessageLog::from_turns(request.turns)?;
        let mut writer = LogWriter::new(log, cancel.clone(), &emitter);
        self.drive(&mut writer, None, &cancel).await
    }

    fn finish(
        &self,
        run_id: RunId,
        outcome: Result<String>,
        turns: Vec<Turn>,
        emitter: &RunEventEmitter,
    ) -> RunResult {
        match outcome {
            Ok(text) => {
                emitter.lifecycle(RunLifecycle::Completed);
                tracing::info!(run_id = %run_id, agent = %self.id, "run completed");
                RunResult::completed(run_id, text, turns)
            }
            Err(err) if err.is_canceled() => {
                emitter.lifecycle(RunLifecycle::Canceled);
                tracing::info!(run_id = %run_id, agent = %self.id, "run canceled");
                RunResult::canceled(run_id, turns)
            }
            Err(err) => {
                emitter.lifecycle(RunLifecycle::Failed {
                    error: err.to_string(),
                });
                tracing::warn!(run_id = %run_id, agent = %self.id, error = %err, "run failed");
                RunResult::failed(run_id, err.to_string(), turns)
            }
        }
    }

    async fn drive(
        &self,
        writer: &mut LogWriter<'_>,
        custom_instructions: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let instructions = self.instructions_with(custom_instructions);
        let tools = self.tools.definitions();

        writer.apply(LogDelta::AppendTurn {
            turn: Turn::assistant(Vec::new()),
        })?;
        let turn_index = writer.log().len() - 1;

        for iteration in 1..=self.config.max_iterations {
            let request = ProviderRequest {
                agent_id: self.id.clone(),
                instructions: instructions.clone(),
                turns: writer.log().turns().to_vec(),
                tools: tools.clone(),
                settings: self.settings.clone(),
            };
            let step = self.think(&request, writer, turn_index, cancel).await?;
            tracing::debug!(
                agent = %self.id,
                iteration,
                tool_calls = step.calls.len(),
                text_len = step.text.len(),
                "iteration complete"
            );
            if step.calls.is_empty() && step.recorded_errors == 0 {
                return Ok(step.text);
            }
            if step.calls.is_empty() {
                continue;
            }
            self.act(step.calls, writer, turn_index, cancel).await?;
        }

        Err(OrchestraError::IterationLimit {
            max_iterations: self.config.max_iterations,
        })
    }

    /// Stream one model step into the assistant turn.
    async fn think(
        &self,
        request: &ProviderRequest,
        writer: &mut LogWriter<'_>,
        turn_index: usize,
        cancel: &CancellationToken,
    ) -> Result<Step> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OrchestraError::Canceled),
            stream = self.provider.stream(request, cancel.clone()) => stream?,
        };

        let mut text = TextBuffer::default();
        let mut seen: Vec<(usize, String)> = Vec::new();
        loop {
            let delta = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OrchestraError::Canceled),
                delta = stream.next() => delta,
            };
            let Some(delta) = delta else {
                break;
            };
            match delta? {
                ModelDelta::TextDelta { text: chunk } => text.push(&chunk),
                ModelDelta::ToolInputStart { call_id, tool_name } => {
                    text.flush(writer, turn_index)?;
                    let part = Part::ToolInvocation(ToolInvocation::streaming(&call_id, tool_name));
                    let part_index = writer.append_part(turn_index, part)?;
                    seen.push((part_index, call_id));
                }
                ModelDelta::ToolInputDelta { call_id, delta } => {
                    tracing::trace!(%call_id, len = delta.len(), "tool input delta");
                }
                ModelDelta::ToolCall {
                    call_id,
                    tool_name,
                    input,
                } => {
                    text.flush(writer, turn_index)?;
                    let invocation = ToolInvocation::available(&call_id, tool_name, input);
                    match seen.iter().find(|(_, id)| *id == call_id) {
                        Some(&(part_index, _)) => writer.apply(LogDelta::AdvanceInvocation {
                            turn_index,
                            part_index,
                            invocation,
                        })?,
                        None => {
                            let part_index =
                                writer.append_part(turn_index, Part::ToolInvocation(invocation))?;
                            seen.push((part_index, call_id));
                        }
                    }
                }
                ModelDelta::Finish => break,
            }
        }
        text.flush(writer, turn_index)?;

        let mut calls = Vec::with_capacity(seen.len());
        let mut recorded_errors = 0;
        for (part_index, call_id) in seen {
            let Some(invocation) = writer.log().latest(&call_id).cloned() else {
                continue;
            };
            if invocation.state == ToolInvocationState::InputStreaming {
                tracing::warn!(%call_id, tool_name = %invocation.tool_name, "tool input never completed");
                let failed = invocation.with_error(
                    OrchestraError::ToolInput {
                        tool_name: invocation.tool_name.clone(),
                        message: "arguments were never completed".to_string(),
                    }
                    .to_string(),
                );
                writer.apply(LogDelta::AdvanceInvocation {
                    turn_index,
                    part_index,
                    invocation: failed,
                })?;
                recorded_errors += 1;
                continue;
            }
            calls.push((part_index, invocation));
        }

        Ok(Step {
            text: text.into_text(),
            calls,
            recorded_errors,
        })
    }

    /// Execute the calls of one step and record their terminal snapshots in call order.
    async fn act(
        &self,
        calls: Vec<(usize, ToolInvocation)>,
        writer: &mut LogWriter<'_>,
        turn_index: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let session = derive_session_facts(writer.log().turns());

        if !self.config.parallel_tool_calls {
            for (part_index, invocation) in calls {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(OrchestraError::Canceled),
                    outcome = self.dispatch(invocation, session.clone(), cancel) => outcome,
                };
                writer.apply(LogDelta::AdvanceInvocation {
                    turn_index,
                    part_index,
                    invocation: outcome?,
                })?;
            }
            return Ok(());
        }

        let mut pending: FuturesOrdered<_> = calls
            .into_iter()
            .map(|(part_index, invocation)| {
                let session = session.clone();
                async move { (part_index, self.dispatch(invocation, session, cancel).await) }
            })
            .collect();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OrchestraError::Canceled),
                next = pending.next() => next,
            };
            let Some((part_index, outcome)) = next else {
                break;
            };
            writer.apply(LogDelta::AdvanceInvocation {
                turn_index,
                part_index,
                invocation: outcome?,
            })?;
        }
        Ok(())
    }

    /// Run one tool call to its terminal snapshot.
    ///
    /// Tool failures become `output-error` snapshots; only cancellation is
    /// returned as an error.
    async fn dispatch(
        &self,
        invocation: ToolInvocation,
        session: SessionFacts,
        cancel: &CancellationToken,
    ) -> Result<ToolInvocation> {
        let Some(entry) = self.tools.resolve(&invocation.tool_name) else {
            let err = OrchestraError::ToolNotFound(invocation.tool_name.clone());
            tracing::warn!(call_id = %invocation.call_id, error = %err, "unknown tool");
            return Ok(invocation.with_error(err.to_string()));
        };
        let tool = entry.as_tool();

        if let Err(message) = validate_arguments(&invocation.input, &tool.parameters().schema) {
            let err = OrchestraError::ToolInput {
                tool_name: invocation.tool_name.clone(),
                message,
            };
            tracing::warn!(call_id = %invocation.call_id, error = %err, "tool input rejected");
            return Ok(invocation.with_error(err.to_string()));
        }

        tracing::debug!(
            agent = %self.id,
            call_id = %invocation.call_id,
            tool_name = %invocation.tool_name,
            delegate = entry.is_delegate(),
            "dispatching tool call"
        );
        let ctx = ToolExecutionContext {
            tool_call_id: Some(invocation.call_id.clone()),
            tool_name: Some(invocation.tool_name.clone()),
            cancel: cancel.clone(),
            session,
        };
        match tool
            .execute(&ToolArguments::new(invocation.input.clone()), &ctx)
            .await
        {
            Ok(output) => Ok(invocation.with_output(output)),
            Err(err) if err.is_canceled() => Err(err),
            Err(err) => {
                let err = match err {
                    err @ (OrchestraError::ToolExecution { .. }
                    | OrchestraError::Delegation { .. }) => err,
                    other => OrchestraError::tool_execution(tool.name(), other.to_string()),
                };
                tracing::warn!(
                    agent = %self.id,
                    call_id = %invocation.call_id,
                    error = %err,
                    "tool call failed"
                );
                Ok(invocation.with_error(err.to_string()))
            }
        }
    }
}

struct Step {
    text: String,
    calls: Vec<(usize, ToolInvocation)>,
    /// Calls closed as `output-error` while streaming. The model still has to see them.
    recorded_errors: usize,
}

/// Collects streamed text and writes it out as one part per contiguous run.
#[derive(Default)]
struct TextBuffer {
    pending: String,
    step_text: String,
}

impl TextBuffer {
    fn push(&mut self, chunk: &str) {
        self.pending.push_str(chunk);
    }

    fn flush(&mut self, writer: &mut LogWriter<'_>, turn_index: usize) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending);
        self.step_text.push_str(&text);
        writer.append_part(turn_index, Part::Text { text })?;
        Ok(())
    }

    fn into_text(self) -> String {
        self.step_text
    }
}

/// The only path from the loop to the log.
///
/// Refuses every write once the run's token is cancelled, so nothing lands
/// in the log after the cancellation point.
struct LogWriter<'a> {
    log: MessageLog,
    cancel: CancellationToken,
    emitter: &'a RunEventEmitter,
}

impl<'a> LogWriter<'a> {
    fn new(log: MessageLog, cancel: CancellationToken, emitter: &'a RunEventEmitter) -> Self {
        Self {
            log,
            cancel,
            emitter,
        }
    }

    fn log(&self) -> &MessageLog {
        &self.log
    }

    fn into_turns(self) -> Vec<Turn> {
        self.log.into_turns()
    }

    fn apply(&mut self, delta: LogDelta) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(OrchestraError::Canceled);
        }
        self.log.apply(&delta)?;
        self.emitter.emit(RunEventPayload::Log { delta });
        Ok(())
    }

    /// Append a part to `turn_index` and return its position.
    fn append_part(&mut self, turn_index: usize, part: Part) -> Result<usize> {
        let part_index = self
            .log
            .turns()
            .get(turn_index)
            .map_or(0, |turn| turn.parts.len());
        self.apply(LogDelta::AppendPart { turn_index, part })?;
        Ok(part_index)
    }
}

/// Builder for [`ToolLoopAgent`].
pub struct AgentBuilder<K> {
    id: String,
    display_name: Option<String>,
    baseline: String,
    custom_instructions: Option<String>,
    tools: ToolRegistry,
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    error: Option<OrchestraError>,
    _kind: PhantomData<fn() -> K>,
}

impl AgentBuilder<Specialist> {
    /// Start building an agent that can be delegated to.
    pub fn specialist(id: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self::with_provider(id, provider)
    }
}

impl AgentBuilder<Orchestrator> {
    /// Start building an agent that can delegate to specialists.
    pub fn orchestrator(id: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self::with_provider(id, provider)
    }

    /// Register a delegation tool.
    pub fn delegate(mut self, tool: DelegateTool) -> Self {
        if let Err(err) = self.tools.register_delegate(Arc::new(tool)) {
            self.error.get_or_insert(err);
        }
        self
    }
}

impl<K: AgentKind> AgentBuilder<K> {
    fn with_provider(id: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            baseline: String::new(),
            custom_instructions: None,
            tools: ToolRegistry::new(),
            provider,
            config: RuntimeConfig::default(),
            error: None,
            _kind: PhantomData,
        }
    }

    /// Human-readable name, e.g. "Weather Agent". Defaults to the id.
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Fixed baseline instructions.
    pub fn instructions(mut self, baseline: impl Into<String>) -> Self {
        self.baseline = baseline.into();
        self
    }

    /// Caller-supplied text appended after the baseline, unmodified.
    pub fn custom_instructions(mut self, custom: Option<impl Into<String>>) -> Self {
        self.custom_instructions = custom.map(Into::into);
        self
    }

    pub fn tool(self, tool: impl Tool + 'static) -> Self {
        self.shared_tool(Arc::new(tool))
    }

    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        if let Err(err) = self.tools.register_local(tool) {
            self.error.get_or_insert(err);
        }
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ToolLoopAgent<K>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.id.trim().is_empty() {
            return Err(OrchestraError::Configuration(
                "agent id must not be empty".to_string(),
            ));
        }
        self.config.validate()?;
        let settings = self.config.generation_settings();
        Ok(ToolLoopAgent {
            display_name: self.display_name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            baseline: self.baseline,
            custom_instructions: self.custom_instructions,
            tools: self.tools,
            provider: self.provider,
            config: self.config,
            settings,
            _kind: PhantomData,
        })
    }
}
