//! Error types for Orchestra.

use thiserror::Error;

/// Primary error type for all Orchestra operations.
#[derive(Error, Debug)]
pub enum OrchestraError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Arguments rejected by the tool's input schema before the handler ran.
    #[error("Invalid input for tool '{tool_name}': {message}")]
    ToolInput { tool_name: String, message: String },

    /// The handler itself failed.
    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    /// A specialist run ended abnormally.
    #[error("Delegation to {agent} failed: {message}")]
    Delegation { agent: String, message: String },

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The message log is malformed or a tool invocation regressed.
    #[error("Log invariant violated: {0}")]
    LogInvariant(String),

    #[error("tool loop exceeded max iterations ({max_iterations})")]
    IterationLimit { max_iterations: usize },

    #[error("Canceled")]
    Canceled,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Serialization,
    Provider,
    ToolInput,
    ToolExecution,
    Delegation,
    Invariant,
    Limit,
    Canceled,
    Unknown,
}

impl OrchestraError {
    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool_execution(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::Toml(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::ToolInput { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolInput,
            Self::ToolExecution { .. } | Self::ToolNotFound(_) => ErrorCategory::ToolExecution,
            Self::Delegation { .. } => ErrorCategory::Delegation,
            Self::LogInvariant(_) => ErrorCategory::Invariant,
            Self::IterationLimit { .. } => ErrorCategory::Limit,
            Self::Canceled => ErrorCategory::Canceled,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error ends the whole request rather than a single tool call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration
                | ErrorCategory::Provider
                | ErrorCategory::Invariant
                | ErrorCategory::Limit
        )
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, OrchestraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failures_are_not_fatal() {
        let err = OrchestraError::tool_execution("calculate", "boom");
        assert_eq!(err.category(), ErrorCategory::ToolExecution);
        assert!(!err.is_fatal());

        let err = OrchestraError::Delegation {
            agent: "weather".into(),
            message: "stream ended".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn invariant_violations_are_fatal() {
        let err = OrchestraError::LogInvariant("duplicate callId 'c1'".into());
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Log invariant violated: duplicate callId 'c1'"
        );
    }

    #[test]
    fn cancellation_is_its_own_category() {
        let err = OrchestraError::Canceled;
        assert!(err.is_canceled());
        assert!(!err.is_fatal());
        assert_eq!(err.category(), ErrorCategory::Canceled);
    }
}
