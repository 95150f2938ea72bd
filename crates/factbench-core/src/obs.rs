//! Structured observability hooks for the evaluation lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via `run_span`
//! - Emission functions for key lifecycle events: start, example scored, save, finish
//!
//! Events are emitted at `info!` level unless noted; filter with `RUST_LOG`.

use tracing::{debug, info, warn};

/// Span tagging everything inside one evaluation run with its `run_id`.
///
/// Attach it with [`tracing::Instrument::instrument`] so it follows the run
/// across `.await` points.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("factbench.run", run_id = %run_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, agent_name: &str, target: usize, strategy: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        agent_name = %agent_name,
        target = target,
        verifier = %strategy,
    );
}

/// Emit event: one example was answered and its facts verified.
pub fn emit_example_scored(index: usize, verified: usize, facts: usize, passed: bool, errored: bool) {
    info!(
        event = "example.scored",
        index = index,
        verified = verified,
        facts = facts,
        passed = passed,
        agent_error = errored,
    );
}

/// Emit event: the agent call failed and an error sentinel was recorded.
pub fn emit_agent_error(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "agent.error", index = index, error = %error);
}

/// Emit event: the judge failed on one fact; the fact reads as unverified.
pub fn emit_judge_error(strategy: &str, fact: &str, error: &dyn std::fmt::Display) {
    let fact_preview: String = fact.chars().take(60).collect();
    warn!(event = "judge.error", verifier = %strategy, fact = %fact_preview, error = %error);
}

/// Emit event: the run record was persisted.
pub fn emit_run_saved(run_id: &str, status: &str, completed: usize, total: usize) {
    debug!(
        event = "run.saved",
        run_id = %run_id,
        status = %status,
        completed = completed,
        total = total,
    );
}

/// Emit event: persisting the run record failed (warning level).
pub fn emit_run_save_error(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.save_error", run_id = %run_id, error = %error);
}

/// Emit event: run finished with duration and fact totals.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, examples: usize, verified: usize, facts: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        examples = examples,
        verified_facts = verified,
        total_facts = facts,
    );
}
