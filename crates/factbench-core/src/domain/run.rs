//! Evaluation runs: the in-memory session and its persisted record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::example::ExampleResult;

/// Lifecycle status of a run record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Complete,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a run has progressed through its target example count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Per-category counters for the run-time breakdowns (type, difficulty, scope).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CategoryStats {
    /// Facts seen.
    pub total: usize,
    /// Facts the judge accepted.
    pub verified: usize,
    pub examples: usize,
    /// Examples with at least one verified fact.
    pub passed: usize,
}

impl CategoryStats {
    /// Verified facts as a percentage of all facts (0 when there are none).
    pub fn accuracy_pct(&self) -> f64 {
        percent(self.verified, self.total)
    }

    /// Passed examples as a percentage of all examples (0 when there are none).
    pub fn pass_rate_pct(&self) -> f64 {
        percent(self.passed, self.examples)
    }
}

/// Breakdown of category counters keyed by axis value.
pub type Breakdown = BTreeMap<String, CategoryStats>;

fn percent(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}

/// Aggregate numbers persisted with every run record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RunSummary {
    pub total_examples: usize,
    pub passed_examples: usize,
    pub total_facts: usize,
    pub llm_verified_facts: usize,
    /// Verified facts as a percentage (0–100).
    pub accuracy: f64,
}

/// Accumulating results of one evaluation session.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResults {
    pub agent_name: String,
    pub started_at: DateTime<Utc>,
    pub examples: Vec<ExampleResult>,
    pub results_by_type: Breakdown,
    pub results_by_difficulty: Breakdown,
    pub results_by_scope: Breakdown,
}

impl RunResults {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            started_at: Utc::now(),
            examples: Vec::new(),
            results_by_type: Breakdown::new(),
            results_by_difficulty: Breakdown::new(),
            results_by_scope: Breakdown::new(),
        }
    }

    /// Append a scored example and fold it into the per-category breakdowns.
    pub fn record(&mut self, example: ExampleResult) {
        let verified = example.verified_count();
        let facts = example.facts.len();
        let passed = example.passed;

        for (breakdown, key) in [
            (&mut self.results_by_type, &example.metadata.kind),
            (&mut self.results_by_difficulty, &example.metadata.difficulty),
            (&mut self.results_by_scope, &example.metadata.scope),
        ] {
            let stats = breakdown.entry(key.clone()).or_default();
            stats.total += facts;
            stats.verified += verified;
            stats.examples += 1;
            if passed {
                stats.passed += 1;
            }
        }

        self.examples.push(example);
    }

    pub fn total_examples(&self) -> usize {
        self.examples.len()
    }

    pub fn passed_examples(&self) -> usize {
        self.examples.iter().filter(|e| e.passed).count()
    }

    pub fn total_facts(&self) -> usize {
        self.examples.iter().map(|e| e.facts.len()).sum()
    }

    pub fn verified_facts(&self) -> usize {
        self.examples.iter().map(|e| e.verified_count()).sum()
    }

    /// Verified facts as a percentage of all facts.
    pub fn accuracy(&self) -> f64 {
        percent(self.verified_facts(), self.total_facts())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_examples: self.total_examples(),
            passed_examples: self.passed_examples(),
            total_facts: self.total_facts(),
            llm_verified_facts: self.verified_facts(),
            accuracy: self.accuracy(),
        }
    }
}

/// The persisted record of a run, rewritten after every example.
///
/// # Invariants
///
/// - `progress.completed <= progress.total`
/// - `status == Complete` iff `progress.completed == progress.total`
///   (by construction; not checked on load)
/// - every example satisfies [`ExampleResult::validate`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub agent_name: String,
    /// When this snapshot was written.
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    pub progress: Progress,
    pub examples: Vec<ExampleResult>,
    pub summary: RunSummary,
    #[serde(default)]
    pub results_by_type: Breakdown,
    #[serde(default)]
    pub results_by_difficulty: Breakdown,
    #[serde(default)]
    pub results_by_scope: Breakdown,
}

impl RunRecord {
    /// Snapshot `results` as a record.
    ///
    /// A `Complete` snapshot closes progress at the completed count; an
    /// `InProgress` one never reports a total below what is already done.
    pub fn snapshot(
        run_id: &str,
        results: &RunResults,
        status: RunStatus,
        target_total: Option<usize>,
    ) -> Self {
        let completed = results.total_examples();
        let total = match status {
            RunStatus::Complete => completed,
            RunStatus::InProgress => target_total.unwrap_or(completed).max(completed),
        };

        Self {
            id: run_id.to_string(),
            agent_name: results.agent_name.clone(),
            timestamp: Utc::now(),
            status,
            progress: Progress { completed, total },
            examples: results.examples.clone(),
            summary: results.summary(),
            results_by_type: results.results_by_type.clone(),
            results_by_difficulty: results.results_by_difficulty.clone(),
            results_by_scope: results.results_by_scope.clone(),
        }
    }

    /// Check the invariants a loaded record must satisfy to be usable.
    ///
    /// Status against progress is not checked here; see
    /// [`RunRecord::status_matches_progress`].
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let Progress { completed, total } = self.progress;
        if completed > total {
            return Err(ValidationError::ProgressOverflow { completed, total });
        }
        for example in &self.examples {
            example.validate()?;
        }
        Ok(())
    }

    /// `Complete` exactly when every targeted example is done.
    ///
    /// Holds for every record the evaluator saves. Records read from disk
    /// are served as-is even when it does not hold.
    pub fn status_matches_progress(&self) -> bool {
        (self.status == RunStatus::Complete) == (self.progress.completed == self.progress.total)
    }

    /// Listing projection of this record.
    pub fn listing(&self) -> RunListing {
        RunListing {
            id: self.id.clone(),
            agent_name: self.agent_name.clone(),
            timestamp: self.timestamp,
            status: self.status,
            progress: self.progress,
            total_examples: self.summary.total_examples,
            total_facts: self.summary.total_facts,
            llm_verified_facts: self.summary.llm_verified_facts,
            accuracy: self.summary.accuracy,
        }
    }
}

/// Summary row returned when listing runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunListing {
    pub id: String,
    pub agent_name: String,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub status: RunStatus,
    pub progress: Progress,
    pub total_examples: usize,
    pub total_facts: usize,
    pub llm_verified_facts: usize,
    pub accuracy: f64,
}
