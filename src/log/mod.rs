//! Append-only message log.
//!
//! The log is the only mutable session state. It changes exclusively through
//! [`LogDelta`]s, and every delta is checked against the log invariants before
//! it is applied:
//!
//! * turns and parts are only ever appended, parts only to the newest turn;
//! * a `callId` appears in exactly one part slot;
//! * an invocation snapshot may only replace an earlier snapshot of the same
//!   call if its state moves strictly forward.
//!
//! A delta that violates any of these is rejected with
//! [`OrchestraError::LogInvariant`], which callers treat as fatal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestraError, Result};
use crate::types::{Part, Role, ToolInvocation, ToolInvocationState, Turn};

/// A single change to the log, as streamed to consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogDelta {
    AppendTurn {
        turn: Turn,
    },
    AppendPart {
        turn_index: usize,
        part: Part,
    },
    /// Newer snapshot of the invocation stored at `(turn_index, part_index)`.
    AdvanceInvocation {
        turn_index: usize,
        part_index: usize,
        invocation: ToolInvocation,
    },
}

/// Ordered sequence of turns with a `callId` index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    turns: Vec<Turn>,
    calls: HashMap<String, (usize, usize)>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a log received from outside (e.g. a request body).
    pub fn from_turns(turns: Vec<Turn>) -> Result<Self> {
        let mut log = Self::new();
        for turn in turns {
            log.apply(&LogDelta::AppendTurn { turn })?;
        }
        Ok(log)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent assistant turn, if any.
    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.is_assistant())
    }

    /// Latest observed snapshot for a call.
    pub fn latest(&self, call_id: &str) -> Option<&ToolInvocation> {
        let (turn_index, part_index) = *self.calls.get(call_id)?;
        self.turns[turn_index].parts[part_index].as_tool_invocation()
    }

    /// Apply a delta, rejecting anything that would break the log invariants.
    pub fn apply(&mut self, delta: &LogDelta) -> Result<()> {
        match delta {
            LogDelta::AppendTurn { turn } => {
                let turn_index = self.turns.len();
                let mut seen = Vec::new();
                for (part_index, part) in turn.parts.iter().enumerate() {
                    if let Part::ToolInvocation(invocation) = part {
                        if turn.role != Role::Assistant {
                            return Err(OrchestraError::LogInvariant(format!(
                                "tool invocation '{}' in a {} turn",
                                invocation.call_id, turn.role
                            )));
                        }
                        self.check_new_call(invocation)?;
                        if seen.iter().any(|(id, _)| id == &invocation.call_id) {
                            return Err(duplicate_call(&invocation.call_id));
                        }
                        seen.push((invocation.call_id.clone(), part_index));
                    }
                }
                for (call_id, part_index) in seen {
                    self.calls.insert(call_id, (turn_index, part_index));
                }
                self.turns.push(turn.clone());
                Ok(())
            }
            LogDelta::AppendPart { turn_index, part } => {
                let last = self.turns.len().checked_sub(1);
                if last != Some(*turn_index) {
                    return Err(OrchestraError::LogInvariant(format!(
                        "parts may only be appended to the newest turn (got turn {turn_index})"
                    )));
                }
                let turn = &self.turns[*turn_index];
                if let Part::ToolInvocation(invocation) = part {
                    if !turn.is_assistant() {
                        return Err(OrchestraError::LogInvariant(format!(
                            "tool invocation '{}' in a {} turn",
                            invocation.call_id, turn.role
                        )));
                    }
                    self.check_new_call(invocation)?;
                    self.calls.insert(
                        invocation.call_id.clone(),
                        (*turn_index, turn.parts.len()),
                    );
                }
                self.turns[*turn_index].parts.push(part.clone());
                Ok(())
            }
            LogDelta::AdvanceInvocation {
                turn_index,
                part_index,
                invocation,
            } => {
                match self.calls.get(&invocation.call_id) {
                    Some(position) if *position == (*turn_index, *part_index) => {}
                    Some(_) => {
                        return Err(OrchestraError::LogInvariant(format!(
                            "callId '{}' is not stored at turn {turn_index}, part {part_index}",
                            invocation.call_id
                        )));
                    }
                    None => {
                        return Err(OrchestraError::LogInvariant(format!(
                            "unknown callId '{}'",
                            invocation.call_id
                        )));
                    }
                }
                let slot = &mut self.turns[*turn_index].parts[*part_index];
                let Part::ToolInvocation(current) = slot else {
                    return Err(OrchestraError::LogInvariant(format!(
                        "turn {turn_index}, part {part_index} is not a tool invocation"
                    )));
                };
                if current.tool_name != invocation.tool_name {
                    return Err(OrchestraError::LogInvariant(format!(
                        "callId '{}' changed tool from '{}' to '{}'",
                        invocation.call_id, current.tool_name, invocation.tool_name
                    )));
                }
                if !current.state.can_advance_to(invocation.state) {
                    return Err(OrchestraError::LogInvariant(format!(
                        "callId '{}' cannot move from {} to {}",
                        invocation.call_id, current.state, invocation.state
                    )));
                }
                check_snapshot_shape(invocation)?;
                *current = invocation.clone();
                Ok(())
            }
        }
    }

    fn check_new_call(&self, invocation: &ToolInvocation) -> Result<()> {
        if invocation.call_id.is_empty() {
            return Err(OrchestraError::LogInvariant(format!(
                "tool invocation of '{}' has an empty callId",
                invocation.tool_name
            )));
        }
        if self.calls.contains_key(&invocation.call_id) {
            return Err(duplicate_call(&invocation.call_id));
        }
        check_snapshot_shape(invocation)
    }
}

fn duplicate_call(call_id: &str) -> OrchestraError {
    OrchestraError::LogInvariant(format!("duplicate callId '{call_id}'"))
}

fn check_snapshot_shape(invocation: &ToolInvocation) -> Result<()> {
    let well_formed = match invocation.state {
        ToolInvocationState::OutputAvailable => invocation.output.is_some(),
        ToolInvocationState::OutputError => invocation.error_text.is_some(),
        ToolInvocationState::InputStreaming | ToolInvocationState::InputAvailable => {
            invocation.output.is_none() && invocation.error_text.is_none()
        }
    };
    if well_formed {
        Ok(())
    } else {
        Err(OrchestraError::LogInvariant(format!(
            "callId '{}' in state {} has a mismatched output",
            invocation.call_id, invocation.state
        )))
    }
}
