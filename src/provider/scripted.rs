//! Deterministic provider that replays scripted steps.
//!
//! Used by the test suite and handy for demos without a live model. Each
//! agent id gets its own queue of steps, consumed one per think step; a
//! shared fallback queue serves agents without a script.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{ModelDelta, ModelProvider, ModelStream, ProviderRequest};
use crate::error::OrchestraError;

const PROVIDER_NAME: &str = "scripted";

/// What the provider does for one think step.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Stream these deltas in order.
    Reply(Vec<ModelDelta>),
    /// Fail the step with a provider error.
    Fail(String),
    /// Produce nothing until the request is cancelled.
    Stall,
}

impl ScriptStep {
    /// A final text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply(vec![ModelDelta::text(text), ModelDelta::Finish])
    }

    /// A step that only calls tools, in the given order.
    pub fn tool_calls<'a>(
        calls: impl IntoIterator<Item = (&'a str, &'a str, serde_json::Value)>,
    ) -> Self {
        let mut deltas: Vec<ModelDelta> = calls
            .into_iter()
            .map(|(call_id, tool_name, input)| ModelDelta::tool_call(call_id, tool_name, input))
            .collect();
        deltas.push(ModelDelta::Finish);
        Self::Reply(deltas)
    }
}

/// Replays [`ScriptStep`]s and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<ScriptStep>>>,
    fallback: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue steps for one agent id.
    pub fn script(self, agent_id: impl Into<String>, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        lock(&self.scripts)
            .entry(agent_id.into())
            .or_default()
            .extend(steps);
        self
    }

    /// Queue a step for agents without their own script.
    pub fn then(self, step: ScriptStep) -> Self {
        lock(&self.fallback).push_back(step);
        self
    }

    /// Sleep this long before every delta.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_for(&self, agent_id: &str) -> Vec<ProviderRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.agent_id == agent_id)
            .cloned()
            .collect()
    }

    /// Steps still queued for an agent id.
    pub fn remaining(&self, agent_id: &str) -> usize {
        lock(&self.scripts).get(agent_id).map_or(0, VecDeque::len)
    }

    fn next_step(&self, agent_id: &str) -> Option<ScriptStep> {
        if let Some(step) = lock(&self.scripts)
            .get_mut(agent_id)
            .and_then(VecDeque::pop_front)
        {
            return Some(step);
        }
        lock(&self.fallback).pop_front()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn stream(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<ModelStream, OrchestraError> {
        lock(&self.requests).push(request.clone());
        let step = self.next_step(&request.agent_id).ok_or_else(|| {
            OrchestraError::provider(
                PROVIDER_NAME,
                format!("script exhausted for agent '{}'", request.agent_id),
            )
        })?;

        match step {
            ScriptStep::Fail(message) => Err(OrchestraError::provider(PROVIDER_NAME, message)),
            ScriptStep::Stall => Ok(futures::stream::once(async move {
                cancel.cancelled().await;
                Err(OrchestraError::Canceled)
            })
            .boxed()),
            ScriptStep::Reply(deltas) => {
                let delay = self.delay;
                Ok(futures::stream::iter(deltas)
                    .then(move |delta| {
                        let cancel = cancel.clone();
                        async move {
                            if let Some(delay) = delay {
                                tokio::select! {
                                    _ = cancel.cancelled() => return Err(OrchestraError::Canceled),
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                            Ok(delta)
                        }
                    })
                    .boxed())
            }
        }
    }
}
