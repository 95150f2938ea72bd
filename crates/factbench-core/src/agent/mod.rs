//! Code agents under test.
//!
//! An agent answers a question about a repository at a commit. Invocation
//! failures surface as [`AgentError`]; the evaluation loop turns them into an
//! error-sentinel response so the example is still recorded.

pub mod command;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{error_sentinel, EvalError};

pub use command::{AgentConfig, CommandAgent};
pub use output::{extract_payload, parse_agent_output, parse_payload, PayloadError};

/// The agent used when none is named.
pub const DEFAULT_AGENT: &str = "ask-forge";

/// Agents that can be selected by name.
pub const AVAILABLE_AGENTS: &[&str] = &["ask-forge"];

/// Env var overriding the directory `ask-forge` is run from.
pub const ASK_FORGE_ROOT_ENV: &str = "ASK_FORGE_ROOT";

/// Failures invoking an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to run agent: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Process exited with code {code}")]
    ProcessFailed { code: i32, stderr: String },

    #[error("No JSON response found in output")]
    NoPayload { stdout: String, stderr: String },

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl AgentError {
    /// The error-sentinel response recorded in place of agent output.
    pub fn to_sentinel(&self) -> String {
        let head = error_sentinel(self);
        match self {
            AgentError::ProcessFailed { stderr, .. } => format!("{head}\n{stderr}"),
            AgentError::NoPayload { stdout, stderr } => {
                format!("{head}\nstdout: {stdout}\nstderr: {stderr}")
            }
            _ => head,
        }
    }
}

/// A code-understanding agent.
#[async_trait]
pub trait CodeAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Ask `question` about `repo_url` at `commit`, returning the answer text.
    async fn ask(&self, repo_url: &str, question: &str, commit: &str) -> Result<String, AgentError>;
}

/// Whether `name` is on the agent allow-list.
pub fn is_known_agent(name: &str) -> bool {
    AVAILABLE_AGENTS.contains(&name)
}

/// Launch configuration for a named agent.
pub fn agent_config(name: &str) -> Result<AgentConfig, EvalError> {
    match name {
        "ask-forge" => {
            let root = std::env::var(ASK_FORGE_ROOT_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."));
            Ok(AgentConfig::new(
                "ask-forge",
                "bun",
                vec!["run".to_string(), "ask.ts".to_string()],
            )
            .with_working_dir(root))
        }
        _ => Err(EvalError::UnknownAgent {
            name: name.to_string(),
            available: AVAILABLE_AGENTS.join(", "),
        }),
    }
}

/// Instantiate a named agent.
pub fn resolve_agent(name: &str) -> Result<Arc<dyn CodeAgent>, EvalError> {
    Ok(Arc::new(CommandAgent::new(agent_config(name)?)))
}
