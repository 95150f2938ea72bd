//! Benchmark dataset: one JSON record per line.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::example::unknown_axis;
use crate::domain::{EvalError, ExampleMetadata, Fact, Result};

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATASET_PATH: &str = "data/dataset.jsonl";

/// Dataset-level metadata for one example.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub repo: String,

    #[serde(default)]
    pub commit: String,

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

    #[serde(default)]
    pub n_context_files: u32,

    #[serde(default)]
    pub n_context_nodes: u32,

    #[serde(default)]
    pub n_files_pr: u32,

    #[serde(default)]
    pub pr: Option<u64>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            repo: String::new(),
            commit: String::new(),
            kind: unknown_axis(),
            difficulty: unknown_axis(),
            scope: unknown_axis(),
            is_core_question: false,
            includes_code: false,
            includes_location_hints: false,
            n_context_files: 0,
            n_context_nodes: 0,
            n_files_pr: 0,
            pr: None,
        }
    }
}

/// One benchmark question with the facts a good answer should contain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetExample {
    pub question: String,

    #[serde(default)]
    pub facts: Vec<Fact>,

    #[serde(default)]
    pub metadata: DatasetMetadata,
}

impl DatasetExample {
    /// Repository URL to hand to the agent (`.git` suffix removed).
    pub fn repo_url(&self) -> String {
        self.metadata.repo.replace(".git", "")
    }

    pub fn commit(&self) -> &str {
        &self.metadata.commit
    }

    /// The classification axes carried into the example result.
    pub fn result_metadata(&self) -> ExampleMetadata {
        ExampleMetadata {
            kind: self.metadata.kind.clone(),
            difficulty: self.metadata.difficulty.clone(),
            scope: self.metadata.scope.clone(),
            is_core_question: self.metadata.is_core_question,
            includes_code: self.metadata.includes_code,
            includes_location_hints: self.metadata.includes_location_hints,
        }
    }
}

/// Parse JSONL text. Blank lines are skipped; line numbers in errors are 1-based.
pub fn parse_jsonl(text: &str) -> Result<Vec<DatasetExample>> {
    let mut examples = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let example = serde_json::from_str(line)
            .map_err(|e| EvalError::Dataset(format!("line {}: {e}", i + 1)))?;
        examples.push(example);
    }
    Ok(examples)
}

/// Load a JSONL dataset file.
pub fn load_jsonl(path: &Path) -> Result<Vec<DatasetExample>> {
    let text = fs::read_to_string(path)
        .map_err(|e| EvalError::Dataset(format!("{}: {e}", path.display())))?;
    let examples = parse_jsonl(&text)?;
    tracing::debug!(path = %path.display(), examples = examples.len(), "dataset loaded");
    Ok(examples)
}
