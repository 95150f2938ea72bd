//! factbench Core Library
//!
//! Fact-based evaluation of code agents and reconciliation of automated
//! judge verdicts with human review.

pub mod agent;
pub mod dataset;
pub mod domain;
pub mod evaluator;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod store;
pub mod telemetry;
pub mod verifier;

pub use agent::{
    agent_config, is_known_agent, parse_agent_output, resolve_agent, AgentConfig, AgentError,
    CodeAgent, CommandAgent, PayloadError, AVAILABLE_AGENTS, DEFAULT_AGENT,
};

pub use dataset::{load_jsonl, DatasetExample, DatasetMetadata, DEFAULT_DATASET_PATH};

pub use domain::{
    error_sentinel, is_error_response, Breakdown, CategoryStats, EvalError, ExampleMetadata,
    ExampleResult, Fact, Progress, Result, ReviewEntry, ReviewRecord, ReviewStatus, RunListing,
    RunRecord, RunResults, RunStatus, RunSummary, ValidationError,
};

pub use evaluator::{EvalJob, EvalLauncher, EvalOutcome, Evaluator};

pub use metrics::{compute_metrics, AgentMetrics, AxisMetrics, ConfusionCounts, Metrics, Rates};

pub use reporting::{render_html_report, report_file_name, write_html_report};

pub use store::{is_safe_id, ReviewStore, RunStore, StoreError, StoreLayout};

pub use verifier::{
    FactChecker, FactVerifier, JudgeConfig, JudgeError, KeywordVerifier, LlmJudge,
};

pub use obs::{emit_run_finished, emit_run_started, run_span};
pub use telemetry::init_tracing;

/// factbench version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
