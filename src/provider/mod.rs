//! The model capability seam.
//!
//! The runtime treats the model as an opaque capability: given the agent's
//! instructions, the log so far and the tools on offer, it streams text and
//! tool calls back. Network-backed providers live outside this crate and
//! implement [`ModelProvider`].

pub mod scripted;

pub use scripted::{ScriptStep, ScriptedProvider};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::OrchestraError;
use crate::types::{GenerationSettings, Turn};

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Id of the agent asking, e.g. `"orchestrator"` or `"weather"`.
    pub agent_id: String,
    /// Composed system instructions.
    pub instructions: String,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
    pub settings: GenerationSettings,
}

/// Tool definition sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One streamed unit of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDelta {
    TextDelta {
        text: String,
    },
    /// The model started producing arguments for a tool call.
    ToolInputStart {
        call_id: String,
        tool_name: String,
    },
    /// Partial argument text. Informational only.
    ToolInputDelta {
        call_id: String,
        delta: String,
    },
    /// Arguments are final.
    ToolCall {
        call_id: String,
        tool_name: String,
        input: serde_json::Value,
    },
    /// End of this step.
    Finish,
}

impl ModelDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn tool_call(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self::ToolCall {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// Stream of deltas for a single step.
pub type ModelStream = BoxStream<'static, Result<ModelDelta, OrchestraError>>;

/// Core trait implemented by model capabilities.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used in errors and traces.
    fn provider_name(&self) -> &str;

    /// Start one think step. Implementations should stop producing deltas
    /// once `cancel` fires.
    async fn stream(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<ModelStream, OrchestraError>;
}
