//! Domain-level error taxonomy for factbench.

/// Errors produced when a record violates its schema invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("example {index}: {facts} facts but {verdicts} judge verdicts")]
    VerdictMismatch {
        index: usize,
        facts: usize,
        verdicts: usize,
    },

    #[error("progress {completed}/{total}: completed exceeds total")]
    ProgressOverflow { completed: usize, total: usize },

    #[error("num_examples must be between {min} and {max}, got {got}")]
    ExampleCountOutOfRange { min: usize, max: usize, got: i64 },
}

/// factbench domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("unknown agent: {name}. Available: {available}")]
    UnknownAgent { name: String, available: String },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for factbench domain operations.
pub type Result<T> = std::result::Result<T, EvalError>;
