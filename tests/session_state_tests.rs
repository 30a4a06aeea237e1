use pretty_assertions::assert_eq;
use serde_json::json;

use orchestra::agents::default_delegate_catalog;
use orchestra::prelude::*;

fn wire_log() -> Vec<Turn> {
    serde_json::from_value(json!([
        { "id": "u1", "role": "user", "parts": [{ "type": "text", "text": "I'm Ronny, from Madrid. I like jazz." }] },
        { "id": "a1", "role": "assistant", "parts": [
            { "type": "tool-invocation", "callId": "f1", "toolName": "rememberFact", "state": "output-available",
              "input": { "category": "name", "fact": "Ronny" },
              "output": { "stored": true, "category": "name", "fact": "Ronny" } },
            { "type": "tool-invocation", "callId": "f2", "toolName": "rememberFact", "state": "output-available",
              "input": { "category": "location", "fact": "Madrid" },
              "output": { "stored": true, "category": "location", "fact": "Madrid" } },
            { "type": "tool-invocation", "callId": "f3", "toolName": "rememberFact", "state": "output-error",
              "input": { "category": "preference", "fact": "jazz" }, "errorText": "boom" },
            { "type": "tool-invocation", "callId": "m1", "toolName": "setMode", "state": "output-available",
              "input": { "mode": "focus", "reason": "need a city" },
              "output": { "mode": "focus", "reason": "need a city", "timestamp": "2025-01-01T00:00:00Z" } },
            { "type": "text", "text": "Got it." }
        ] },
        { "id": "u2", "role": "user", "parts": [{ "type": "text", "text": "Weather?" }] },
        { "id": "a2", "role": "assistant", "parts": [
            { "type": "tool-invocation", "callId": "d1", "toolName": "delegateWeather", "state": "input-streaming" }
        ] }
    ]))
    .unwrap()
}

#[test]
fn wire_format_logs_derive_full_state() {
    let turns = wire_log();
    MessageLog::from_turns(turns.clone()).unwrap();

    let state = SessionState::derive(&turns, &default_delegate_catalog());

    assert_eq!(state.facts.name.as_deref(), Some("Ronny"));
    assert_eq!(state.facts.location.as_deref(), Some("Madrid"));
    assert!(state.facts.preferences.is_empty());
    assert_eq!(state.mode.mode, ModeValue::Focus);
    assert!(!state.mode.is_default);
    assert_eq!(state.active_delegate.display_name.as_deref(), Some("Weather Agent"));
}

#[test]
fn facts_only_accumulate_over_turn_prefixes() {
    let turns = wire_log();
    let full = derive_session_facts(&turns);

    for end in 0..=turns.len() {
        let prefix = derive_session_facts(&turns[..end]);
        assert!(prefix.is_subset_of(&full), "prefix of {end} turns");
    }
}

#[test]
fn delegate_clears_once_its_snapshot_completes() {
    let mut log = MessageLog::from_turns(wire_log()).unwrap();
    let turn_index = log.len() - 1;
    let started = log.latest("d1").unwrap().clone();

    log.apply(&LogDelta::AdvanceInvocation {
        turn_index,
        part_index: 0,
        invocation: started.with_input(json!({ "task": "Weather in Madrid?" })),
    })
    .unwrap();
    assert_eq!(
        derive_active_delegate(log.turns(), &default_delegate_catalog()).tool_name.as_deref(),
        Some("delegateWeather")
    );

    let available = log.latest("d1").unwrap().clone();
    log.apply(&LogDelta::AdvanceInvocation {
        turn_index,
        part_index: 0,
        invocation: available.with_output(json!("Sunny")),
    })
    .unwrap();
    assert!(derive_active_delegate(log.turns(), &default_delegate_catalog()).is_empty());
}

#[test]
fn empty_log_has_default_state() {
    assert_eq!(derive_mode(&[]), Mode::default());
    assert_eq!(
        SessionState::derive(&[], &default_delegate_catalog()),
        SessionState::default()
    );
}
