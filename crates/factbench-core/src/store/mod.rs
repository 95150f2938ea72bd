//! File-backed stores for run records and review overlays.
//!
//! Layout under the reports root:
//!
//! ```text
//! <root>/runs/<run_id>.json
//! <root>/reviews/<run_id>-review.json
//! ```
//!
//! Every write goes to a temp file in the target directory and is renamed
//! into place, so readers only ever see a complete file. There is no
//! inter-process locking: two concurrent read-modify-write cycles on the same
//! review file can lose one of the updates (last rename wins).

pub mod reviews;
pub mod runs;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

pub use reviews::ReviewStore;
pub use runs::RunStore;

/// Default reports root, relative to the working directory.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Environment variable overriding the reports root.
pub const REPORTS_DIR_ENV: &str = "FACTBENCH_REPORTS_DIR";

/// Errors from store write paths. Read paths never fail; they return
/// `None` or an empty record instead. A write that must first read the
/// stored record fails on an unreadable file rather than replacing it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsafe record id: {0:?}")]
    UnsafeId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Directory layout shared by the run and review stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `$FACTBENCH_REPORTS_DIR`, or `reports/`.
    pub fn from_env() -> Self {
        let root = std::env::var(REPORTS_DIR_ENV).unwrap_or_else(|_| DEFAULT_REPORTS_DIR.into());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    pub fn reviews_dir(&self) -> PathBuf {
        self.root.join("reviews")
    }

    pub fn run_store(&self) -> RunStore {
        RunStore::new(self.runs_dir())
    }

    pub fn review_store(&self) -> ReviewStore {
        ReviewStore::new(self.reviews_dir())
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new(DEFAULT_REPORTS_DIR)
    }
}

/// Whether `id` can be used as a file stem without escaping its directory.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && !id.contains("..")
        && !id.contains(['/', '\\', '\0'])
}

/// Serialize `value` as pretty JSON and atomically replace `dir/file_name`.
pub(crate) fn write_json_atomic<T: Serialize>(
    dir: &Path,
    file_name: &str,
    value: &T,
) -> StoreResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.persist(&path).map_err(|e| e.error)?;

    Ok(path)
}

/// Read and parse a JSON file.
///
/// `Ok(None)` only when the file does not exist; unreadable or unparseable
/// files are errors.
pub(crate) fn try_read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Read and parse a JSON file; a missing or unparseable file yields `None`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match try_read_json(path) {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!(path = %path.display(), "record not found");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read record");
            None
        }
    }
}
