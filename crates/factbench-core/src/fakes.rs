//! In-memory fakes for the async seams (testing only)
//!
//! Provides `ScriptedVerifier`, `ScriptedAgent` and `RecordingLauncher` that
//! satisfy the trait contracts without network, subprocesses or background tasks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::agent::{AgentError, CodeAgent};
use crate::domain::{EvalError, Result};
use crate::evaluator::{EvalJob, EvalLauncher};
use crate::verifier::{FactVerifier, JudgeError};

// ---------------------------------------------------------------------------
// ScriptedVerifier
// ---------------------------------------------------------------------------

/// Verifier that replays scripted verdicts, then repeats a fallback verdict.
#[derive(Debug)]
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<std::result::Result<bool, JudgeError>>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    /// Answer every fact with `verdict`.
    pub fn always(verdict: bool) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: verdict,
            calls: AtomicUsize::new(0),
        }
    }

    /// Replay `script` in order; afterwards answer `false`.
    pub fn sequence(script: Vec<std::result::Result<bool, JudgeError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times the strategy was actually consulted.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactVerifier for ScriptedVerifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn judge(&self, _fact: &str, _response: &str) -> std::result::Result<bool, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(self.fallback))
    }
}

// ---------------------------------------------------------------------------
// ScriptedAgent
// ---------------------------------------------------------------------------

type AskHook = Box<dyn Fn(usize) + Send + Sync>;

/// Agent that replays scripted replies and records every question asked.
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<std::result::Result<String, AgentError>>>,
    fallback: String,
    calls: Mutex<Vec<(String, String, String)>>,
    hook: Option<AskHook>,
}

impl ScriptedAgent {
    /// Replay `replies` in order; afterwards answer with an empty string.
    pub fn new(replies: Vec<std::result::Result<String, AgentError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: String::new(),
            calls: Mutex::new(Vec::new()),
            hook: None,
        }
    }

    /// Answer every question with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: reply.into(),
            ..Self::new(Vec::new())
        }
    }

    /// Run `hook(call_index)` before answering each question.
    ///
    /// Lets a test observe persisted state between examples.
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// `(repo_url, question, commit)` of every call, in order.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeAgent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted-agent"
    }

    async fn ask(
        &self,
        repo_url: &str,
        question: &str,
        commit: &str,
    ) -> std::result::Result<String, AgentError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((repo_url.to_string(), question.to_string(), commit.to_string()));
            calls.len() - 1
        };
        if let Some(hook) = &self.hook {
            hook(call_index);
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

// ---------------------------------------------------------------------------
// RecordingLauncher
// ---------------------------------------------------------------------------

/// Launcher that records jobs instead of running them.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    jobs: Mutex<Vec<EvalJob>>,
    fail_with: Option<String>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every launch fails with a dataset error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    pub fn jobs(&self) -> Vec<EvalJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvalLauncher for RecordingLauncher {
    async fn launch(&self, job: EvalJob) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(EvalError::Dataset(message.clone()));
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}
