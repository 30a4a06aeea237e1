//! Tools whose outputs carry session state.

use serde::Deserialize;

use crate::derive::{
    FactCategory, FactRecord, ModeRecord, ModeValue, REMEMBER_FACT_TOOL, SET_MODE_TOOL,
};
use crate::tools::{AgentTool, AgentToolParameters};

#[derive(Debug, Deserialize)]
struct RememberFactInput {
    category: FactCategory,
    fact: String,
}

#[derive(Debug, Deserialize)]
struct SetModeInput {
    #[serde(default)]
    mode: ModeValue,
    reason: String,
}

/// `rememberFact { category, fact }` -> `{ stored: true, category, fact }`.
pub fn remember_fact_tool() -> AgentTool {
    AgentTool::new(
        REMEMBER_FACT_TOOL,
        "Remember a fact the user shared about themselves for the rest of the session",
        AgentToolParameters::object()
            .string_enum(
                "category",
                "Kind of fact",
                &["name", "preference", "location", "other"],
                true,
            )
            .string("fact", "The fact, in a few words", true)
            .build(),
        |args, _ctx| async move {
            let input: RememberFactInput = args.deserialize()?;
            let record = FactRecord {
                stored: true,
                category: input.category,
                fact: input.fact,
            };
            Ok(serde_json::to_value(record)?)
        },
    )
}

/// `setMode { mode = active, reason }` -> `{ mode, reason, timestamp }`.
pub fn set_mode_tool() -> AgentTool {
    AgentTool::new(
        SET_MODE_TOOL,
        "Signal whether you need more input from the user (focus) or are delivering a result (active)",
        AgentToolParameters::object()
            .string_enum_with_default("mode", "Operational mode", &["active", "focus"], "active")
            .string("reason", "Short reason for the mode", true)
            .build(),
        |args, _ctx| async move {
            let input: SetModeInput = args.deserialize()?;
            let record = ModeRecord {
                mode: input.mode,
                reason: input.reason,
                timestamp: chrono::Utc::now(),
            };
            Ok(serde_json::to_value(record)?)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolArguments, ToolExecutionContext};
    use serde_json::json;

    #[tokio::test]
    async fn remember_fact_echoes_the_fact() {
        let out = remember_fact_tool()
            .execute(
                &ToolArguments::new(json!({ "category": "location", "fact": "Madrid" })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(out, json!({ "stored": true, "category": "location", "fact": "Madrid" }));
    }

    #[tokio::test]
    async fn set_mode_defaults_to_active() {
        let out = set_mode_tool()
            .execute(
                &ToolArguments::new(json!({ "reason": "answer ready" })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(out["mode"], "active");
        assert_eq!(out["reason"], "answer ready");
        let record: ModeRecord = serde_json::from_value(out).unwrap();
        assert!(record.timestamp <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn set_mode_requires_a_reason() {
        let err = set_mode_tool()
            .execute(
                &ToolArguments::new(json!({ "mode": "focus" })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("reason"));
    }
}
