//! Agents invoked as a subprocess.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use super::output::parse_agent_output;
use super::{AgentError, CodeAgent};

/// Maximum characters of captured process output kept in error reports.
const OUTPUT_EXCERPT_CHARS: usize = 500;

/// How to launch an agent process.
///
/// The agent is run as `program args... <repo_url> <question> <commit>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            working_dir: None,
            timeout_secs: 300,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// A [`CodeAgent`] that shells out to a configured command.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    config: AgentConfig,
}

impl CommandAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(OUTPUT_EXCERPT_CHARS).collect()
}

#[async_trait]
impl CodeAgent for CommandAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn ask(&self, repo_url: &str, question: &str, commit: &str) -> Result<String, AgentError> {
        let start = Instant::now();

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .args([repo_url, question, commit])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(AgentError::Spawn)?;

        // Dropping the wait future on timeout kills the child.
        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| AgentError::Timeout {
            secs: self.config.timeout_secs,
        })?
        .map_err(AgentError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            agent = %self.config.name,
            duration_ms = start.elapsed().as_millis() as u64,
            exit_code = output.status.code().unwrap_or(-1),
            stdout_bytes = output.stdout.len(),
            "agent process finished"
        );

        // A payload wins over the exit code; agents may exit non-zero after printing it.
        if let Some(response) = parse_agent_output(&stdout)? {
            return Ok(response);
        }

        if !output.status.success() {
            return Err(AgentError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: excerpt(&stderr),
            });
        }

        Err(AgentError::NoPayload {
            stdout: excerpt(&stdout),
            stderr: excerpt(&stderr),
        })
    }
}
