//! Per-example evaluation results.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A single claim to verify against agent output.
///
/// Facts have no identity beyond their text and their position in the
/// owning example's fact list; verdict lists are aligned by position.
pub type Fact = String;

/// Prefix marking a response that is an error sentinel rather than agent output.
pub const ERROR_SENTINEL_PREFIX: &str = "[ERROR:";

/// Value used for classification axes that are missing from the dataset.
pub const UNKNOWN_AXIS: &str = "unknown";

/// Whether `response` is an error sentinel produced by a failed agent call.
pub fn is_error_response(response: &str) -> bool {
    response.starts_with(ERROR_SENTINEL_PREFIX)
}

/// Build an error sentinel response from a failure description.
pub fn error_sentinel(message: impl std::fmt::Display) -> String {
    format!("{ERROR_SENTINEL_PREFIX} {message}]")
}

pub(crate) fn unknown_axis() -> String {
    UNKNOWN_AXIS.to_string()
}

/// Classification axes carried by every example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleMetadata {
    #[serde(rename = "type", default = "unknown_axis")]
    pub kind: String,

    #[serde(default = "unknown_axis")]
    pub difficulty: String,

    #[serde(default = "unknown_axis")]
    pub scope: String,

    #[serde(default)]
    pub is_core_question: bool,

    #[serde(default)]
    pub includes_code: bool,

    #[serde(default)]
    pub includes_location_hints: bool,
}

impl Default for ExampleMetadata {
    fn default() -> Self {
        Self {
            kind: unknown_axis(),
            difficulty: unknown_axis(),
            scope: unknown_axis(),
            is_core_question: false,
            includes_code: false,
            includes_location_hints: false,
        }
    }
}

/// Outcome of asking the agent one dataset question and judging its facts.
///
/// # Invariants
///
/// `facts.len() == judge_verdicts.len()`; `judge_verdicts[i]` is the automated
/// verdict for `facts[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExampleResult {
    /// Position of the example in the dataset.
    pub index: usize,

    pub repo_url: String,

    pub commit: String,

    pub question: String,

    /// Agent output, or an error sentinel (see [`is_error_response`]).
    pub response: String,

    pub facts: Vec<Fact>,

    #[serde(rename = "llm_fact_verdicts", alias = "judge_verdicts")]
    pub judge_verdicts: Vec<bool>,

    #[serde(default)]
    pub metadata: ExampleMetadata,

    /// At least one fact was verified.
    #[serde(default)]
    pub passed: bool,
}

impl ExampleResult {
    /// Number of facts the judge accepted.
    pub fn verified_count(&self) -> usize {
        self.judge_verdicts.iter().filter(|v| **v).count()
    }

    /// Whether the response is an error sentinel.
    pub fn is_error(&self) -> bool {
        is_error_response(&self.response)
    }

    /// Check the fact/verdict alignment invariant.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.facts.len() != self.judge_verdicts.len() {
            return Err(ValidationError::VerdictMismatch {
                index: self.index,
                facts: self.facts.len(),
                verdicts: self.judge_verdicts.len(),
            });
        }
        Ok(())
    }
}
