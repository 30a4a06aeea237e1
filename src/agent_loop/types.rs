//! Core run types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Turn;

/// Unique run identifier.
pub type RunId = Uuid;

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Canceled,
}

/// Result of a run.
///
/// `turns` is the full log at the end of the run: the incoming turns plus
/// whatever the run appended before it stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Final assistant text. Empty unless the run completed.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "Utc::now")]
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(run_id: RunId, text: String, turns: Vec<Turn>) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            text,
            turns,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn canceled(run_id: RunId, turns: Vec<Turn>) -> Self {
        Self {
            run_id,
            status: RunStatus::Canceled,
            text: String::new(),
            turns,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(run_id: RunId, error: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            run_id,
            status: RunStatus::Failed,
            text: String::new(),
            turns,
            error: Some(error.into()),
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
