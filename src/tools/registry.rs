//! Named tool lookup for one agent.

use std::sync::Arc;

use super::tool::Tool;
use crate::delegation::DelegateTool;
use crate::derive::DelegateCatalog;
use crate::error::OrchestraError;
use crate::provider::ToolDefinition;

/// A tool an agent may call.
#[derive(Clone)]
pub enum ToolEntry {
    /// Handler executed in-process.
    Local(Arc<dyn Tool>),
    /// Hands the task to a specialist agent.
    Delegate(Arc<DelegateTool>),
}

impl ToolEntry {
    pub fn name(&self) -> &str {
        self.as_tool().name()
    }

    pub fn as_tool(&self) -> &dyn Tool {
        match self {
            Self::Local(tool) => tool.as_ref(),
            Self::Delegate(tool) => tool.as_ref(),
        }
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self, Self::Delegate(_))
    }
}

impl std::fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_delegate() { "Delegate" } else { "Local" };
        f.debug_tuple(kind).field(&self.name()).finish()
    }
}

/// Ordered set of uniquely named tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-process tool. Names must be unique per agent.
    pub fn register_local(&mut self, tool: Arc<dyn Tool>) -> Result<(), OrchestraError> {
        self.insert(ToolEntry::Local(tool))
    }

    /// Register a delegation tool. Only orchestrator builders reach this.
    pub(crate) fn register_delegate(
        &mut self,
        tool: Arc<DelegateTool>,
    ) -> Result<(), OrchestraError> {
        self.insert(ToolEntry::Delegate(tool))
    }

    fn insert(&mut self, entry: ToolEntry) -> Result<(), OrchestraError> {
        if entry.name().is_empty() {
            return Err(OrchestraError::Configuration(
                "tool name must not be empty".to_string(),
            ));
        }
        if self.resolve(entry.name()).is_some() {
            return Err(OrchestraError::Configuration(format!(
                "tool '{}' registered twice",
                entry.name()
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Definitions advertised to the model capability, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .map(|entry| {
                let tool = entry.as_tool();
                ToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters().schema.clone(),
                }
            })
            .collect()
    }

    /// Delegation tool names mapped to the specialists' display names.
    pub fn delegate_catalog(&self) -> DelegateCatalog {
        let mut catalog = DelegateCatalog::new();
        for entry in &self.entries {
            if let ToolEntry::Delegate(tool) = entry {
                catalog.insert(tool.name(), tool.display_name());
            }
        }
        catalog
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ToolEntry::name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
