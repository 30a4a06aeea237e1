mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;

use orchestra::agent_loop::{event_channel, RunEventPayload, RunLifecycle};
use orchestra::agents::{self, default_delegate_catalog};
use orchestra::log::LogDelta;
use orchestra::prelude::*;
use orchestra::provider::{ScriptStep, ScriptedProvider};

use common::{active_delegate_probe, remember, set_mode, task};

fn orchestrator(provider: &Arc<ScriptedProvider>) -> ToolLoopAgent<Orchestrator> {
    agents::orchestrator(provider.clone(), RuntimeConfig::default(), None).unwrap()
}

fn invocation<'a>(turn: &'a Turn, tool_name: &str) -> &'a ToolInvocation {
    turn.tool_invocations()
        .find(|invocation| invocation.tool_name == tool_name)
        .unwrap()
}

#[tokio::test]
async fn facts_from_one_run_reach_specialists_in_the_next() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "orchestrator",
                [
                    ScriptStep::tool_calls([
                        ("f1", "rememberFact", remember("name", "Ronny")),
                        ("f2", "rememberFact", remember("location", "Madrid")),
                        ("m1", "setMode", set_mode("focus", "waiting for a question")),
                    ]),
                    ScriptStep::text("Nice to meet you, Ronny. What can I do?"),
                    ScriptStep::tool_calls([
                        ("d1", "delegateWeather", task("Weather in Madrid today?")),
                        ("d2", "delegateCalculator", task("What is 12 * 7?")),
                    ]),
                    ScriptStep::text("It's 22°C in Madrid, and 12 * 7 = 84."),
                ],
            )
            .script(
                "weather",
                [
                    ScriptStep::tool_calls([
                        ("w1", "weather", json!({ "location": "Madrid" })),
                        ("w2", "convertToCelsius", json!({ "fahrenheit": 72 })),
                    ]),
                    ScriptStep::text("Madrid: 22°C."),
                ],
            )
            .script(
                "calculator",
                [
                    ScriptStep::tool_calls([("k1", "calculate", json!({ "expression": "12 * 7" }))]),
                    ScriptStep::text("12 * 7 = 84"),
                ],
            ),
    );
    let agent = orchestrator(&provider);
    let catalog = agent.delegate_catalog();

    let first = agent
        .run(
            RunRequest::new(vec![Turn::user("I'm Ronny, I live in Madrid")]),
            CancellationToken::new(),
        )
        .await;
    assert_eq!(first.status, RunStatus::Completed);
    let after_first = SessionState::derive(&first.turns, &catalog);
    assert_eq!(after_first.facts.name.as_deref(), Some("Ronny"));
    assert_eq!(after_first.mode.mode, ModeValue::Focus);

    let mut turns = first.turns.clone();
    turns.push(Turn::user("What's the weather, and what's 12 * 7?"));
    let second = agent
        .run(RunRequest::new(turns), CancellationToken::new())
        .await;

    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.text, "It's 22°C in Madrid, and 12 * 7 = 84.");

    let turn = second.turns.last().unwrap();
    let weather = invocation(turn, "delegateWeather");
    let calculator = invocation(turn, "delegateCalculator");
    assert_eq!(weather.state, ToolInvocationState::OutputAvailable);
    assert_eq!(weather.output, Some(json!("Madrid: 22°C.")));
    assert_eq!(calculator.output, Some(json!("12 * 7 = 84")));

    let weather_prompt = provider.requests_for("weather")[0].turns[0].text();
    assert_eq!(
        weather_prompt,
        "[User: Ronny | Location: Madrid] Weather in Madrid today?"
    );
    let calculator_request = &provider.requests_for("calculator")[1];
    let calculated = calculator_request.turns[1].tool_invocations().next().unwrap();
    assert_eq!(calculated.output, Some(json!({ "expression": "12 * 7", "result": 84 })));

    let state = SessionState::derive(&second.turns, &catalog);
    assert!(after_first.facts.is_subset_of(&state.facts));
    assert!(state.active_delegate.is_empty());
    assert_eq!(state.mode.reason.as_deref(), Some("waiting for a question"));
}

#[tokio::test]
async fn active_delegate_tracks_the_in_flight_call() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "orchestrator",
                [
                    ScriptStep::tool_calls([("d1", "delegateWeather", task("Weather in Oslo?"))]),
                    ScriptStep::text("Cold."),
                ],
            )
            .script("weather", [ScriptStep::text("Oslo: -3°C.")]),
    );
    let agent = orchestrator(&provider);
    let turns = vec![Turn::user("Weather in Oslo?")];
    let (sink, seen) = active_delegate_probe(turns.clone(), default_delegate_catalog());

    let result = agent
        .run(
            RunRequest::new(turns).with_event_sink(sink),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            None,                              // empty assistant turn
            Some("Weather Agent".to_string()), // delegateWeather input-available
            None,                              // output-available
            None,                              // final text
        ]
    );
}

#[tokio::test]
async fn specialist_failure_is_surfaced_to_the_orchestrator() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "orchestrator",
                [
                    ScriptStep::tool_calls([("d1", "delegateCalculator", task("1 / 0"))]),
                    ScriptStep::text("The calculator is unavailable."),
                ],
            )
            .script("calculator", [ScriptStep::Fail("model overloaded".into())]),
    );
    let agent = orchestrator(&provider);

    let result = agent
        .run(RunRequest::new(vec![Turn::user("1 / 0?")]), CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    let failed = invocation(result.turns.last().unwrap(), "delegateCalculator");
    assert_eq!(failed.state, ToolInvocationState::OutputError);
    assert_eq!(
        failed.error_text.as_deref(),
        Some("Delegation to Calculator Agent failed: Provider error: scripted: model overloaded")
    );

    // The orchestrator's next step saw the failure.
    let retry = &provider.requests_for("orchestrator")[1];
    let seen = retry.turns.last().unwrap().tool_invocations().next().unwrap();
    assert_eq!(seen.state, ToolInvocationState::OutputError);
}

#[tokio::test]
async fn cancellation_mid_delegation_stops_every_depth() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .script(
                "orchestrator",
                [
                    ScriptStep::tool_calls([("d1", "delegateWeather", task("Weather?"))]),
                    ScriptStep::text("unreachable"),
                ],
            )
            .script("weather", [ScriptStep::Stall]),
    );
    let agent = Arc::new(orchestrator(&provider));
    let (sink, mut events) = event_channel();

    let handle = agent.start(RunRequest::new(vec![Turn::user("Weather?")]).with_event_sink(sink));
    while let Some(event) = events.next().await {
        if matches!(
            event.payload,
            RunEventPayload::Log {
                delta: LogDelta::AppendPart { .. }
            }
        ) {
            break;
        }
    }
    // Let the specialist reach its stalled model call.
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.abort();
    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Canceled);
    let pending = invocation(result.turns.last().unwrap(), "delegateWeather");
    assert_eq!(pending.state, ToolInvocationState::InputAvailable);
    assert_eq!(provider.requests_for("weather").len(), 1);
    assert_eq!(provider.requests_for("orchestrator").len(), 1);

    let rest: Vec<_> = events.map(|event| event.payload).collect().await;
    assert_eq!(
        rest,
        vec![RunEventPayload::Lifecycle {
            state: RunLifecycle::Canceled
        }]
    );
}
