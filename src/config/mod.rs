//! Runtime configuration (layered: defaults > config file > env).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrchestraError, Result};
use crate::types::GenerationSettings;

const CONFIG_FILE_NAME: &str = "orchestra.toml";
const MAX_ITERATIONS_ENV: &str = "ORCHESTRA_MAX_ITERATIONS";
const MODEL_ENV: &str = "ORCHESTRA_MODEL";
const PARALLEL_TOOL_CALLS_ENV: &str = "ORCHESTRA_PARALLEL_TOOL_CALLS";

const DEFAULT_MAX_ITERATIONS: usize = 20;
const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// Limits and defaults shared by every tool loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on model calls per run.
    pub max_iterations: usize,
    /// Model id forwarded to the capability.
    pub model: String,
    /// Run the tool calls of one step concurrently.
    pub parallel_tool_calls: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model: DEFAULT_MODEL.to_string(),
            parallel_tool_calls: true,
        }
    }
}

impl RuntimeConfig {
    /// Platform config location, e.g. `~/.config/orchestra/orchestra.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "orchestra", "orchestra")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Load defaults, then the config file (explicit path or the platform
    /// default if it exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`RuntimeConfig::load`]). Unparsable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(MAX_ITERATIONS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => self.max_iterations = value,
                _ => tracing::warn!(key = MAX_ITERATIONS_ENV, value = %raw, "ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(MODEL_ENV) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                tracing::warn!(key = MODEL_ENV, "ignoring empty override");
            } else {
                self.model = trimmed.to_string();
            }
        }
        if let Some(raw) = lookup(PARALLEL_TOOL_CALLS_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.parallel_tool_calls = true,
                "0" | "false" | "no" => self.parallel_tool_calls = false,
                _ => tracing::warn!(key = PARALLEL_TOOL_CALLS_ENV, value = %raw, "ignoring invalid override"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(OrchestraError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(OrchestraError::Configuration(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Generation settings derived from this config.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings::builder().model(self.model.clone()).build()
    }
}
