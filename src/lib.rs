//! Orchestra: tool-loop agents with bounded delegation.
//!
//! An orchestrating agent runs a think/act loop against an opaque model
//! capability, dispatches tool calls, and can hand tasks to specialist agents
//! as if they were tools. Every step lands in an append-only [`log::MessageLog`];
//! session state (operational mode, active delegate, remembered facts) is never
//! stored on its own and is instead replayed from the log by the functions in
//! [`derive`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use orchestra::prelude::*;
//!
//! # async fn example(provider: Arc<dyn ModelProvider>) -> orchestra::error::Result<()> {
//! let orchestrator = orchestra::agents::orchestrator(provider, RuntimeConfig::default(), None)?;
//! let result = orchestrator
//!     .run(
//!         RunRequest::new(vec![Turn::user("What's 12 * 7 and the weather in Madrid?")]),
//!         CancellationToken::new(),
//!     )
//!     .await;
//! let state = SessionState::derive(&result.turns, &orchestrator.delegate_catalog());
//! println!("{} ({:?})", result.text, state.mode);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod agents;
pub mod config;
pub mod delegation;
pub mod derive;
pub mod error;
pub mod instructions;
pub mod log;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
