//! Message log types: turns, parts and tool invocation snapshots.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message of a session. Parts are kept in emission order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
        }
    }

    /// Create a user turn with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create a system turn with a single text part.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Part::text(text)])
    }

    /// Create an assistant turn from parts.
    pub fn assistant(parts: Vec<Part>) -> Self {
        Self::new(Role::Assistant, parts)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::ToolInvocation(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool invocations of this turn, in emission order.
    pub fn tool_invocations(&self) -> impl DoubleEndedIterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(Part::as_tool_invocation)
    }
}

/// A discrete content unit within a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text { text: String },
    ToolInvocation(ToolInvocation),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_tool_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Self::ToolInvocation(invocation) => Some(invocation),
            Self::Text { .. } => None,
        }
    }
}

/// Lifecycle of a single tool call.
///
/// `input-streaming -> input-available -> (output-available | output-error)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ToolInvocationState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

impl ToolInvocationState {
    fn rank(self) -> u8 {
        match self {
            Self::InputStreaming => 0,
            Self::InputAvailable => 1,
            Self::OutputAvailable | Self::OutputError => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::OutputAvailable | Self::OutputError)
    }

    /// Whether `next` is a legal successor. States only move forward and
    /// nothing leaves a terminal state.
    pub fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// Snapshot of a tool call at one point of its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool_name: String,
    pub state: ToolInvocationState,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl ToolInvocation {
    /// Arguments are still being produced.
    pub fn streaming(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            state: ToolInvocationState::InputStreaming,
            input: serde_json::Value::Null,
            output: None,
            error_text: None,
        }
    }

    /// Arguments are final; the handler has not returned yet.
    pub fn available(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            state: ToolInvocationState::InputAvailable,
            input,
            ..Self::streaming(call_id, tool_name)
        }
    }

    /// Next snapshot with finalized input.
    pub fn with_input(&self, input: serde_json::Value) -> Self {
        Self {
            state: ToolInvocationState::InputAvailable,
            input,
            ..self.clone()
        }
    }

    /// Terminal snapshot for a successful handler.
    pub fn with_output(&self, output: serde_json::Value) -> Self {
        Self {
            state: ToolInvocationState::OutputAvailable,
            output: Some(output),
            error_text: None,
            ..self.clone()
        }
    }

    /// Terminal snapshot for a failed handler.
    pub fn with_error(&self, error_text: impl Into<String>) -> Self {
        Self {
            state: ToolInvocationState::OutputError,
            output: None,
            error_text: Some(error_text.into()),
            ..self.clone()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use ToolInvocationState::*;

    #[test]
    fn states_only_move_forward() {
        assert!(InputStreaming.can_advance_to(InputAvailable));
        assert!(InputStreaming.can_advance_to(OutputError));
        assert!(InputAvailable.can_advance_to(OutputAvailable));
        assert!(!InputAvailable.can_advance_to(InputStreaming));
        assert!(!InputAvailable.can_advance_to(InputAvailable));
        assert!(!OutputAvailable.can_advance_to(OutputError));
        assert!(!OutputError.can_advance_to(OutputAvailable));
    }

    #[test]
    fn state_names_use_wire_spelling() {
        assert_eq!(OutputAvailable.to_string(), "output-available");
        assert_eq!("input-streaming".parse::<ToolInvocationState>().unwrap(), InputStreaming);
        assert_eq!(json!(OutputError), json!("output-error"));
    }

    #[test]
    fn tool_invocation_part_serializes_with_camel_case_fields() {
        let part = Part::ToolInvocation(
            ToolInvocation::available("call-1", "rememberFact", json!({ "category": "name" }))
                .with_output(json!({ "stored": true })),
        );

        let value = serde_json::to_value(&part).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "tool-invocation",
                "callId": "call-1",
                "toolName": "rememberFact",
                "state": "output-available",
                "input": { "category": "name" },
                "output": { "stored": true },
            })
        );
        let back: Part = serde_json::from_value(value).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn turn_text_skips_tool_parts() {
        let turn = Turn::assistant(vec![
            Part::text("Checking. "),
            Part::ToolInvocation(ToolInvocation::streaming("c1", "weather")),
            Part::text("Done."),
        ]);

        assert_eq!(turn.text(), "Checking. Done.");
        assert_eq!(turn.tool_invocations().count(), 1);
    }
}
