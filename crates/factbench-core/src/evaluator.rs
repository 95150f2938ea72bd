//! The evaluation loop and the seam for launching it in the background.
//!
//! Examples are processed strictly one after another: the agent is asked,
//! every fact is verified, the result is appended and the run record is
//! rewritten before the next example starts. A failed or timed-out agent call
//! is recorded as an error sentinel and the loop moves on.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::agent::{CodeAgent, AVAILABLE_AGENTS};
use crate::dataset::DatasetExample;
use crate::domain::{
    EvalError, ExampleResult, Result, RunRecord, RunResults, RunStatus, ValidationError,
};
use crate::obs;
use crate::store::RunStore;
use crate::verifier::FactChecker;

/// Bounds on `num_examples` accepted from the review server.
pub const MIN_JOB_EXAMPLES: usize = 1;
pub const MAX_JOB_EXAMPLES: usize = 100;

/// Result of a finished evaluation.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub run_id: String,
    pub results: RunResults,
    /// The final, `complete` record as stored.
    pub record: RunRecord,
}

/// Runs a dataset through one agent and persists the run progressively.
pub struct Evaluator {
    agent: Arc<dyn CodeAgent>,
    checker: FactChecker,
    store: RunStore,
}

impl Evaluator {
    pub fn new(agent: Arc<dyn CodeAgent>, checker: FactChecker, store: RunStore) -> Self {
        Self {
            agent,
            checker,
            store,
        }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Evaluate the first `limit` examples.
    ///
    /// Fails only if the final save fails; per-example agent and judge
    /// failures are recorded in the results.
    pub async fn run(&self, examples: &[DatasetExample], limit: usize) -> Result<EvalOutcome> {
        let run_id = self.store.create(self.agent.name());
        let span = obs::run_span(&run_id);
        self.run_as(run_id, examples, limit).instrument(span).await
    }

    async fn run_as(
        &self,
        run_id: String,
        examples: &[DatasetExample],
        limit: usize,
    ) -> Result<EvalOutcome> {
        let agent_name = self.agent.name().to_string();
        let start = Instant::now();

        let target = limit.min(examples.len());
        obs::emit_run_started(&run_id, &agent_name, target, self.checker.strategy());

        let mut results = RunResults::new(agent_name);
        for (index, example) in examples.iter().take(target).enumerate() {
            let scored = self.evaluate_example(index, example).await;
            results.record(scored);

            let done = results.total_examples();
            let status = if done == target {
                RunStatus::Complete
            } else {
                RunStatus::InProgress
            };
            match self.store.save(&results, &run_id, status, Some(target)) {
                Ok(record) => obs::emit_run_saved(
                    &run_id,
                    status.as_str(),
                    record.progress.completed,
                    record.progress.total,
                ),
                Err(e) => obs::emit_run_save_error(&run_id, &e),
            }
        }

        let record = self
            .store
            .save(&results, &run_id, RunStatus::Complete, Some(target))?;
        obs::emit_run_saved(
            &run_id,
            record.status.as_str(),
            record.progress.completed,
            record.progress.total,
        );
        obs::emit_run_finished(
            &run_id,
            start.elapsed().as_millis() as u64,
            results.total_examples(),
            results.verified_facts(),
            results.total_facts(),
        );

        Ok(EvalOutcome {
            run_id,
            results,
            record,
        })
    }

    async fn evaluate_example(&self, index: usize, example: &DatasetExample) -> ExampleResult {
        let repo_url = example.repo_url();
        let commit = example.commit().to_string();

        let response = match self.agent.ask(&repo_url, &example.question, &commit).await {
            Ok(text) => text,
            Err(e) => {
                obs::emit_agent_error(index, &e);
                e.to_sentinel()
            }
        };

        let judge_verdicts = self.checker.verify_all(&example.facts, &response).await;
        let verified = judge_verdicts.iter().filter(|v| **v).count();
        let passed = verified > 0;

        let result = ExampleResult {
            index,
            repo_url,
            commit,
            question: example.question.clone(),
            facts: example.facts.clone(),
            judge_verdicts,
            metadata: example.result_metadata(),
            passed,
            response,
        };
        obs::emit_example_scored(index, verified, result.facts.len(), passed, result.is_error());
        result
    }
}

/// A request to evaluate `num_examples` dataset examples with `agent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalJob {
    pub agent: String,
    pub num_examples: usize,
}

impl EvalJob {
    /// Check the agent allow-list and the example-count bounds.
    pub fn validate(agent: &str, num_examples: i64) -> Result<Self> {
        if !AVAILABLE_AGENTS.contains(&agent) {
            return Err(EvalError::UnknownAgent {
                name: agent.to_string(),
                available: AVAILABLE_AGENTS.join(", "),
            });
        }
        if num_examples < MIN_JOB_EXAMPLES as i64 || num_examples > MAX_JOB_EXAMPLES as i64 {
            return Err(ValidationError::ExampleCountOutOfRange {
                min: MIN_JOB_EXAMPLES,
                max: MAX_JOB_EXAMPLES,
                got: num_examples,
            }
            .into());
        }
        Ok(Self {
            agent: agent.to_string(),
            num_examples: num_examples as usize,
        })
    }
}

/// Starts evaluation jobs without waiting for them to finish.
#[async_trait]
pub trait EvalLauncher: Send + Sync {
    async fn launch(&self, job: EvalJob) -> Result<()>;
}
