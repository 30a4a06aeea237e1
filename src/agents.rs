//! The built-in agents.
//!
//! Three specialists (weather, calculator, and the prompt-injection demo
//! assistant) and the orchestrator that delegates to the first two.

use std::sync::Arc;

use crate::agent_loop::{AgentBuilder, ToolLoopAgent};
use crate::config::RuntimeConfig;
use crate::delegation::{DelegateTool, Orchestrator, Specialist};
use crate::derive::DelegateCatalog;
use crate::error::Result;
use crate::instructions::AgentName;
use crate::provider::ModelProvider;
use crate::tools::builtin::{
    calculate_tool, convert_to_celsius_tool, echo_tool, get_secret_tool, remember_fact_tool,
    set_mode_tool, weather_tool,
};

pub const DELEGATE_WEATHER_TOOL: &str = "delegateWeather";
pub const DELEGATE_CALCULATOR_TOOL: &str = "delegateCalculator";
pub const WEATHER_DISPLAY_NAME: &str = "Weather Agent";
pub const CALCULATOR_DISPLAY_NAME: &str = "Calculator Agent";

/// Catalog of the built-in orchestrator's delegation tools.
pub fn default_delegate_catalog() -> DelegateCatalog {
    DelegateCatalog::new()
        .with(DELEGATE_WEATHER_TOOL, WEATHER_DISPLAY_NAME)
        .with(DELEGATE_CALCULATOR_TOOL, CALCULATOR_DISPLAY_NAME)
}

pub fn weather(
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    custom_instructions: Option<&str>,
) -> Result<ToolLoopAgent<Specialist>> {
    AgentBuilder::specialist(AgentName::Weather.to_string(), provider)
        .display_name(WEATHER_DISPLAY_NAME)
        .instructions(AgentName::Weather.baseline())
        .custom_instructions(custom_instructions)
        .tool(weather_tool())
        .tool(convert_to_celsius_tool())
        .config(config)
        .build()
}

pub fn calculator(
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    custom_instructions: Option<&str>,
) -> Result<ToolLoopAgent<Specialist>> {
    AgentBuilder::specialist(AgentName::Calculator.to_string(), provider)
        .display_name(CALCULATOR_DISPLAY_NAME)
        .instructions(AgentName::Calculator.baseline())
        .custom_instructions(custom_instructions)
        .tool(calculate_tool())
        .config(config)
        .build()
}

/// The assistant whose baseline holds a secret. Not wired to the orchestrator.
pub fn assistant(
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    custom_instructions: Option<&str>,
) -> Result<ToolLoopAgent<Specialist>> {
    AgentBuilder::specialist(AgentName::Assistant.to_string(), provider)
        .display_name("Assistant")
        .instructions(AgentName::Assistant.baseline())
        .custom_instructions(custom_instructions)
        .tool(echo_tool())
        .tool(get_secret_tool())
        .config(config)
        .build()
}

/// The orchestrator with its session tools and both delegates.
///
/// Custom instructions apply to the orchestrator only; the specialists keep
/// their baselines.
pub fn orchestrator(
    provider: Arc<dyn ModelProvider>,
    config: RuntimeConfig,
    custom_instructions: Option<&str>,
) -> Result<ToolLoopAgent<Orchestrator>> {
    let weather = weather(provider.clone(), config.clone(), None)?;
    let calculator = calculator(provider.clone(), config.clone(), None)?;

    AgentBuilder::orchestrator(AgentName::Orchestrator.to_string(), provider)
        .display_name("Orchestrator")
        .instructions(AgentName::Orchestrator.baseline())
        .custom_instructions(custom_instructions)
        .tool(remember_fact_tool())
        .tool(set_mode_tool())
        .delegate(DelegateTool::new(
            DELEGATE_WEATHER_TOOL,
            "Delegate weather queries to the weather specialist",
            "The weather question to ask the specialist",
            Arc::new(weather),
        ))
        .delegate(DelegateTool::new(
            DELEGATE_CALCULATOR_TOOL,
            "Delegate math queries to the calculator specialist",
            "The math problem to solve",
            Arc::new(calculator),
        ))
        .config(config)
        .build()
}
