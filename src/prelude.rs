//! Convenience re-exports for common use.

pub use crate::agent_loop::{RunEvent, RunRequest, RunResult, RunStatus, ToolLoopAgent};
pub use crate::config::RuntimeConfig;
pub use crate::delegation::{DelegateTool, Orchestrator, Specialist};
pub use crate::derive::{
    derive_active_delegate, derive_mode, derive_session_facts, ActiveDelegate, DelegateCatalog,
    Mode, ModeValue, SessionFacts, SessionState,
};
pub use crate::error::{OrchestraError, Result};
pub use crate::log::{LogDelta, MessageLog};
pub use crate::provider::{ModelDelta, ModelProvider, ProviderRequest};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments};
pub use crate::types::{Part, Role, ToolInvocation, ToolInvocationState, Turn};
pub use tokio_util::sync::CancellationToken;
