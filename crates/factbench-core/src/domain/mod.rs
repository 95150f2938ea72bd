//! Domain models for factbench.
//!
//! Canonical definitions for the core entities:
//! - `ExampleResult`: one dataset question, the agent's answer and the judge verdicts
//! - `RunRecord`: a progressively persisted evaluation session
//! - `ReviewRecord`: the human review overlay for a run

pub mod error;
pub mod example;
pub mod review;
pub mod run;
pub mod timestamp;

pub use error::{EvalError, Result, ValidationError};
pub use example::{
    error_sentinel, is_error_response, ExampleMetadata, ExampleResult, Fact,
    ERROR_SENTINEL_PREFIX, UNKNOWN_AXIS,
};
pub use review::{ReviewEntry, ReviewRecord, ReviewStatus};
pub use run::{
    Breakdown, CategoryStats, Progress, RunListing, RunRecord, RunResults, RunStatus, RunSummary,
};
