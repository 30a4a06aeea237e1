//! Shared test helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use orchestra::agent_loop::{RunEvent, RunEventPayload, RunEventSink};
use orchestra::derive::{derive_active_delegate, DelegateCatalog};
use orchestra::error::OrchestraError;
use orchestra::log::MessageLog;
use orchestra::provider::{ModelDelta, ModelProvider, ModelStream, ProviderRequest};
use orchestra::types::{Role, Turn};

/// Provider that answers every step with the text of the last user turn.
pub struct MirrorProvider;

#[async_trait]
impl ModelProvider for MirrorProvider {
    fn provider_name(&self) -> &str {
        "mirror"
    }

    async fn stream(
        &self,
        request: &ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<ModelStream, OrchestraError> {
        let text = request
            .turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(Turn::text)
            .unwrap_or_default();
        let deltas = vec![Ok(ModelDelta::text(text)), Ok(ModelDelta::Finish)];
        Ok(futures::stream::iter(deltas).boxed())
    }
}

pub fn remember(category: &str, fact: &str) -> serde_json::Value {
    json!({ "category": category, "fact": fact })
}

pub fn set_mode(mode: &str, reason: &str) -> serde_json::Value {
    json!({ "mode": mode, "reason": reason })
}

pub fn task(task: &str) -> serde_json::Value {
    json!({ "task": task })
}

/// Sink collecting every event of a run.
pub fn recording_sink() -> (RunEventSink, Arc<Mutex<Vec<RunEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: RunEventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
    (sink, events)
}

/// Sink that replays log deltas onto a copy of `turns` and records the
/// active delegate display name after each one.
pub fn active_delegate_probe(
    turns: Vec<Turn>,
    catalog: DelegateCatalog,
) -> (RunEventSink, Arc<Mutex<Vec<Option<String>>>>) {
    let mirror = Mutex::new(MessageLog::from_turns(turns).unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_sink = seen.clone();
    let sink: RunEventSink = Arc::new(move |event: RunEvent| {
        if let RunEventPayload::Log { delta } = event.payload {
            let mut log = mirror.lock().unwrap();
            log.apply(&delta).unwrap();
            let active = derive_active_delegate(log.turns(), &catalog);
            seen_in_sink.lock().unwrap().push(active.display_name);
        }
    });
    (sink, seen)
}
