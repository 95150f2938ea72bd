use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use super::{is_safe_id, read_json, try_read_json, write_json_atomic, StoreError, StoreResult};
use crate::domain::{ReviewEntry, ReviewRecord};

/// Filesystem-backed store of review overlays, one JSON file per run.
///
/// Reviews live in their own directory and reference runs only by id;
/// they are joined with run records at read time.
#[derive(Debug, Clone)]
pub struct ReviewStore {
    dir: PathBuf,
}

impl ReviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(run_id: &str) -> String {
        format!("{run_id}-review.json")
    }

    /// Load the review for `run_id`, or an empty one if none is stored.
    pub fn load(&self, run_id: &str) -> ReviewRecord {
        if !is_safe_id(run_id) {
            return ReviewRecord::empty(run_id);
        }

        match read_json::<ReviewRecord>(&self.dir.join(Self::file_name(run_id))) {
            Some(mut record) => {
                record.run_id = run_id.to_string();
                record.dedup();
                record
            }
            None => ReviewRecord::empty(run_id),
        }
    }

    /// Stamp `reviewed_at` and overwrite the whole review for `run_id`.
    pub fn upsert_whole_record(
        &self,
        run_id: &str,
        mut record: ReviewRecord,
    ) -> StoreResult<ReviewRecord> {
        if !is_safe_id(run_id) {
            return Err(StoreError::UnsafeId(run_id.to_string()));
        }

        record.run_id = run_id.to_string();
        record.reviewed_at = Some(Utc::now());
        record.dedup();

        write_json_atomic(&self.dir, &Self::file_name(run_id), &record)?;
        debug!(run_id = %run_id, entries = record.entries.len(), "review saved");
        Ok(record)
    }

    /// Replace (or add) the entry for one example, then rewrite the record.
    ///
    /// Applying the same entry twice leaves the same entries stored. The
    /// load and write are not locked: two concurrent upserts on the same run
    /// can lose one of the updates.
    pub fn upsert_entry(
        &self,
        run_id: &str,
        example_index: usize,
        mut entry: ReviewEntry,
    ) -> StoreResult<ReviewRecord> {
        entry.example_index = example_index;
        let mut record = self.load_for_update(run_id)?;
        record.upsert(entry);
        self.upsert_whole_record(run_id, record)
    }

    /// The stored review, or an empty one if none exists yet.
    ///
    /// Unlike [`ReviewStore::load`], an unreadable file is an error so the
    /// entries in it are never overwritten.
    fn load_for_update(&self, run_id: &str) -> StoreResult<ReviewRecord> {
        if !is_safe_id(run_id) {
            return Err(StoreError::UnsafeId(run_id.to_string()));
        }

        let path = self.dir.join(Self::file_name(run_id));
        let mut record = try_read_json::<ReviewRecord>(&path)?
            .unwrap_or_else(|| ReviewRecord::empty(run_id));
        record.run_id = run_id.to_string();
        record.dedup();
        Ok(record)
    }
}
