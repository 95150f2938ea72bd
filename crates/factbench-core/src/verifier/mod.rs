//! Fact verification: does a response support a given fact?
//!
//! Two interchangeable strategies implement [`FactVerifier`]:
//! - [`LlmJudge`]: asks an external LLM judge (selected when a credential is configured)
//! - [`KeywordVerifier`]: local key-term overlap heuristic
//!
//! [`FactChecker`] wraps a strategy with the rules shared by both: an empty or
//! error-sentinel response is never supporting evidence, and a judge failure
//! counts as "not verified" without stopping the remaining facts.

pub mod keyword;
pub mod llm;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::is_error_response;
use crate::obs;

pub use keyword::{key_terms, keyword_supported, KeywordVerifier};
pub use llm::{parse_verdict, JudgeConfig, LlmJudge};

/// Failures of the external judge strategy.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("judge returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed judge response: {0}")]
    MalformedResponse(String),
}

/// A fact verification strategy.
#[async_trait]
pub trait FactVerifier: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Judge whether `response` supports `fact`.
    async fn judge(&self, fact: &str, response: &str) -> Result<bool, JudgeError>;
}

/// Applies a [`FactVerifier`] to the facts of an example.
#[derive(Clone)]
pub struct FactChecker {
    verifier: Arc<dyn FactVerifier>,
}

impl FactChecker {
    pub fn new(verifier: Arc<dyn FactVerifier>) -> Self {
        Self { verifier }
    }

    /// LLM judge when `judge` is configured, keyword heuristic otherwise.
    ///
    /// Falls back to the heuristic if the judge's HTTP client cannot be built.
    pub fn from_config(judge: Option<JudgeConfig>) -> Self {
        let verifier: Arc<dyn FactVerifier> = match judge.map(LlmJudge::new) {
            Some(Ok(judge)) => Arc::new(judge),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "LLM judge unavailable, using keyword matching");
                Arc::new(KeywordVerifier)
            }
            None => Arc::new(KeywordVerifier),
        };
        Self { verifier }
    }

    pub fn strategy(&self) -> &'static str {
        self.verifier.name()
    }

    /// Verify one fact. Never fails: judge errors are logged and read as `false`.
    pub async fn verify(&self, fact: &str, response: &str) -> bool {
        if response.is_empty() || is_error_response(response) {
            return false;
        }

        match self.verifier.judge(fact, response).await {
            Ok(verdict) => verdict,
            Err(e) => {
                obs::emit_judge_error(self.verifier.name(), fact, &e);
                false
            }
        }
    }

    /// Verify every fact in order; the result is aligned with `facts`.
    pub async fn verify_all(&self, facts: &[String], response: &str) -> Vec<bool> {
        let mut verdicts = Vec::with_capacity(facts.len());
        for fact in facts {
            verdicts.push(self.verify(fact, response).await);
        }
        verdicts
    }
}

impl std::fmt::Debug for FactChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactChecker")
            .field("strategy", &self.verifier.name())
            .finish()
    }
}
