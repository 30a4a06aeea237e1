//! Command-line interface for Orchestra.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::agents::default_delegate_catalog;
use crate::config::RuntimeConfig;
use crate::derive::SessionState;
use crate::error::{OrchestraError, Result};
use crate::instructions::AgentName;
use crate::log::MessageLog;
use crate::types::Turn;

/// Orchestra CLI
#[derive(Parser, Debug)]
#[command(name = "orchestra", version, about = "Inspect orchestrator sessions and agent instructions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the state derived from a saved log
    Inspect(InspectArgs),
    /// Print an agent's composed instructions
    Compose(ComposeArgs),
    /// Print the resolved runtime configuration
    Config(ConfigArgs),
}

/// Arguments for `orchestra inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// JSON file holding an array of turns
    pub log: PathBuf,
}

/// Arguments for `orchestra compose`.
#[derive(Parser, Debug)]
pub struct ComposeArgs {
    /// Agent name (orchestrator, weather, calculator, assistant)
    #[arg(short, long)]
    pub agent: String,

    /// Custom instructions appended after the baseline
    #[arg(short, long)]
    pub instructions: Option<String>,
}

/// Arguments for `orchestra config`.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config file to read instead of the platform default
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    turns: usize,
    #[serde(flatten)]
    state: SessionState,
}

/// Validate a saved log and derive the session state from it.
pub fn inspect(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    let turns: Vec<Turn> = serde_json::from_str(&raw)?;
    let log = MessageLog::from_turns(turns)?;
    let report = InspectReport {
        turns: log.len(),
        state: SessionState::derive(log.turns(), &default_delegate_catalog()),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn compose(agent: &str, instructions: Option<&str>) -> Result<String> {
    let name = AgentName::from_str(agent)
        .map_err(|_| OrchestraError::InvalidArgument(format!("unknown agent '{agent}'")))?;
    Ok(name.compose(instructions))
}

pub fn show_config(path: Option<&Path>) -> Result<String> {
    let config = RuntimeConfig::load(path)?;
    Ok(serde_json::to_string_pretty(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Part, ToolInvocation};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn inspect_reports_derived_state() {
        let turns = vec![
            Turn::user("I'm Ronny"),
            Turn::assistant(vec![Part::ToolInvocation(
                ToolInvocation::available(
                    "c1",
                    "rememberFact",
                    json!({ "category": "name", "fact": "Ronny" }),
                )
                .with_output(json!({ "stored": true, "category": "name", "fact": "Ronny" })),
            )]),
        ];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&turns).unwrap().as_bytes())
            .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&inspect(file.path()).unwrap()).unwrap();

        assert_eq!(report["turns"], 2);
        assert_eq!(report["facts"]["name"], "Ronny");
        assert_eq!(report["mode"]["isDefault"], true);
    }

    #[test]
    fn inspect_rejects_malformed_logs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"id":"1","role":"user","parts":[{"type":"tool-invocation","callId":"c1","toolName":"echo","state":"input-available","input":{}}]}]"#)
            .unwrap();

        let err = inspect(file.path()).unwrap_err();

        assert!(matches!(err, OrchestraError::LogInvariant(_)));
    }

    #[test]
    fn compose_rejects_unknown_agents() {
        assert!(compose("weather", Some("Use Kelvin.")).unwrap().ends_with("Use Kelvin."));
        assert!(matches!(
            compose("planner", None),
            Err(OrchestraError::InvalidArgument(_))
        ));
    }
}
