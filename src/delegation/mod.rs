//! Delegation from an orchestrator to specialist agents.
//!
//! A specialist is exposed to its orchestrator as an ordinary tool taking
//! `{ task }`. The tool runs the specialist's own loop to completion under the
//! orchestrator's cancellation token and returns its final text.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent_loop::ToolLoopAgent;
use crate::derive::format_context_prefix;
use crate::error::OrchestraError;
use crate::tools::{AgentToolParameters, Tool, ToolArguments, ToolExecutionContext};

pub use crate::derive::DelegateCatalog;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Orchestrator {}
    impl Sealed for super::Specialist {}
}

/// Marker for the two agent roles.
pub trait AgentKind: sealed::Sealed + Send + Sync + 'static {
    const ROLE: &'static str;
}

/// Routes tasks to specialists. Cannot itself be delegated to.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator;

/// Does the work. Holds only local tools.
#[derive(Debug, Clone, Copy)]
pub struct Specialist;

impl AgentKind for Orchestrator {
    const ROLE: &'static str = "orchestrator";
}

impl AgentKind for Specialist {
    const ROLE: &'static str = "specialist";
}

/// Tool that hands a task to a specialist agent.
pub struct DelegateTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    agent: Arc<ToolLoopAgent<Specialist>>,
}

impl DelegateTool {
    /// `name` is what the model calls, e.g. `delegateWeather`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        task_description: impl Into<String>,
        agent: Arc<ToolLoopAgent<Specialist>>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: AgentToolParameters::object()
                .string("task", task_description, true)
                .build(),
            agent,
        }
    }

    /// Display name of the specialist, e.g. "Weather Agent".
    pub fn display_name(&self) -> &str {
        self.agent.display_name()
    }

    pub fn agent(&self) -> &Arc<ToolLoopAgent<Specialist>> {
        &self.agent
    }
}

impl std::fmt::Debug for DelegateTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateTool")
            .field("name", &self.name)
            .field("agent", &self.agent.id())
            .finish()
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, OrchestraError> {
        let task = args.get_str("task")?;
        // Specialists only see their own log, so known facts ride along in the prompt.
        let prompt = format!("{}{task}", format_context_prefix(&ctx.session));
        tracing::debug!(
            tool_name = %self.name,
            agent = %self.agent.id(),
            call_id = ?ctx.tool_call_id,
            "delegating task"
        );

        match self.agent.generate(prompt, ctx.cancel.clone()).await {
            Ok(text) => Ok(serde_json::Value::String(text)),
            Err(err) if err.is_canceled() => Err(err),
            Err(err) => {
                tracing::warn!(agent = %self.agent.id(), error = %err, "delegation failed");
                Err(OrchestraError::Delegation {
                    agent: self.display_name().to_string(),
                    message: err.to_string(),
                })
            }
        }
    }
}
