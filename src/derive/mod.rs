//! Session state derived from the message log.
//!
//! Nothing here is stored. Mode, active delegate and session facts are
//! recomputed from the full list of turns on every call, so the log stays the
//! single source of truth and there is no cache to invalidate.
//!
//! * [`derive_mode`] and [`derive_active_delegate`] describe *current status*:
//!   the most recent evidence wins.
//! * [`derive_session_facts`] describes *accumulated knowledge*: every fact in
//!   the history counts, recency only decides the singular fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Part, ToolInvocation, ToolInvocationState, Turn};

/// Name of the mode-setting tool.
pub const SET_MODE_TOOL: &str = "setMode";
/// Name of the fact-recording tool.
pub const REMEMBER_FACT_TOOL: &str = "rememberFact";

/// Coarse operational signal of the orchestrator.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModeValue {
    /// Ready / delivering a result.
    #[default]
    Active,
    /// Gathering more input.
    Focus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mode {
    pub mode: ModeValue,
    pub reason: Option<String>,
    pub is_default: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            mode: ModeValue::Active,
            reason: None,
            is_default: true,
        }
    }
}

/// Output payload of the mode-setting tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRecord {
    pub mode: ModeValue,
    pub reason: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Specialist currently working on behalf of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDelegate {
    pub tool_name: Option<String>,
    pub display_name: Option<String>,
}

impl ActiveDelegate {
    pub fn is_empty(&self) -> bool {
        self.tool_name.is_none()
    }
}

/// Category of a remembered fact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FactCategory {
    Name,
    Preference,
    Location,
    Other,
}

/// Output payload of the fact-recording tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub stored: bool,
    pub category: FactCategory,
    pub fact: String,
}

/// What the session knows about the user.
///
/// `name` and `location` are last-write-wins; `preferences` and `other` are
/// deduplicated and keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFacts {
    pub name: Option<String>,
    pub location: Option<String>,
    pub preferences: Vec<String>,
    pub other: Vec<String>,
}

impl SessionFacts {
    /// Fold one recorded fact into the accumulated state.
    pub fn apply(&mut self, category: FactCategory, fact: &str) {
        match category {
            FactCategory::Name => self.name = Some(fact.to_string()),
            FactCategory::Location => self.location = Some(fact.to_string()),
            FactCategory::Preference => push_unique(&mut self.preferences, fact),
            FactCategory::Other => push_unique(&mut self.other, fact),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.preferences.is_empty()
            && self.other.is_empty()
    }

    /// Whether every fact known here is also known to `other`.
    pub fn is_subset_of(&self, other: &SessionFacts) -> bool {
        (self.name.is_none() || other.name.is_some())
            && (self.location.is_none() || other.location.is_some())
            && self.preferences.iter().all(|p| other.preferences.contains(p))
            && self.other.iter().all(|o| other.other.contains(o))
    }
}

fn push_unique(values: &mut Vec<String>, fact: &str) {
    if !values.iter().any(|existing| existing == fact) {
        values.push(fact.to_string());
    }
}

/// Delegation tool names and the display names of the specialists behind them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegateCatalog {
    entries: HashMap<String, String>,
}

impl DelegateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.insert(tool_name, display_name);
        self
    }

    pub fn insert(&mut self, tool_name: impl Into<String>, display_name: impl Into<String>) {
        self.entries.insert(tool_name.into(), display_name.into());
    }

    pub fn display_name(&self, tool_name: &str) -> Option<&str> {
        self.entries.get(tool_name).map(String::as_str)
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.entries.contains_key(tool_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All derived state of a session at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub mode: Mode,
    pub active_delegate: ActiveDelegate,
    pub facts: SessionFacts,
}

impl SessionState {
    pub fn derive(turns: &[Turn], catalog: &DelegateCatalog) -> Self {
        Self {
            mode: derive_mode(turns),
            active_delegate: derive_active_delegate(turns, catalog),
            facts: derive_session_facts(turns),
        }
    }
}

fn completed_output<'a>(part: &'a Part, tool_name: &str) -> Option<&'a ToolInvocation> {
    part.as_tool_invocation().filter(|invocation| {
        invocation.tool_name == tool_name
            && invocation.state == ToolInvocationState::OutputAvailable
    })
}

fn decode<T: serde::de::DeserializeOwned>(invocation: &ToolInvocation) -> Option<T> {
    let output = invocation.output.clone()?;
    match serde_json::from_value(output) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::debug!(
                call_id = %invocation.call_id,
                tool_name = %invocation.tool_name,
                error = %err,
                "skipping tool output with unexpected shape"
            );
            None
        }
    }
}

/// Most recent completed `setMode` call, scanning turns newest to oldest and
/// parts last to first. Falls back to the default mode, also when that call's
/// output cannot be read; older calls are never consulted.
pub fn derive_mode(turns: &[Turn]) -> Mode {
    turns
        .iter()
        .rev()
        .filter(|turn| turn.is_assistant())
        .flat_map(|turn| turn.parts.iter().rev())
        .find_map(|part| completed_output(part, SET_MODE_TOOL))
        .and_then(decode::<ModeRecord>)
        .map(|record| Mode {
            mode: record.mode,
            reason: Some(record.reason),
            is_default: false,
        })
        .unwrap_or_default()
}

/// First delegation call still in flight in the most recent assistant turn.
pub fn derive_active_delegate(turns: &[Turn], catalog: &DelegateCatalog) -> ActiveDelegate {
    let Some(turn) = turns.iter().rev().find(|turn| turn.is_assistant()) else {
        return ActiveDelegate::default();
    };
    turn.tool_invocations()
        .filter(|invocation| !invocation.is_terminal())
        .find_map(|invocation| {
            catalog
                .display_name(&invocation.tool_name)
                .map(|display_name| ActiveDelegate {
                    tool_name: Some(invocation.tool_name.clone()),
                    display_name: Some(display_name.to_string()),
                })
        })
        .unwrap_or_default()
}

/// Every completed `rememberFact` call, oldest to newest.
pub fn derive_session_facts(turns: &[Turn]) -> SessionFacts {
    let mut facts = SessionFacts::default();
    let records = turns
        .iter()
        .filter(|turn| turn.is_assistant())
        .flat_map(|turn| turn.parts.iter())
        .filter_map(|part| completed_output(part, REMEMBER_FACT_TOOL))
        .filter_map(decode::<FactRecord>);
    for record in records.filter(|record| record.stored) {
        facts.apply(record.category, &record.fact);
    }
    facts
}

/// Render known facts as a prompt prefix, e.g. `"[User: Ronny | Location: Madrid] "`.
///
/// Returns an empty string when there is nothing to say. `other` facts are not
/// included.
pub fn format_context_prefix(facts: &SessionFacts) -> String {
    let mut segments = Vec::new();
    if let Some(name) = &facts.name {
        segments.push(format!("User: {name}"));
    }
    if let Some(location) = &facts.location {
        segments.push(format!("Location: {location}"));
    }
    if !facts.preferences.is_empty() {
        segments.push(format!("Preferences: {}", facts.preferences.join(", ")));
    }
    if segments.is_empty() {
        String::new()
    } else {
        format!("[{}] ", segments.join(" | "))
    }
}
