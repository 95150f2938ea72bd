use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use super::{is_safe_id, read_json, write_json_atomic, StoreError, StoreResult};
use crate::domain::{RunListing, RunRecord, RunResults, RunStatus};

/// Filesystem-backed store of run records, one JSON file per run.
///
/// A run record is overwritten on every save, never appended to, so a
/// reader that loads it mid-run sees the last complete snapshot.
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Allocate an id for a new run of `agent_name`.
    ///
    /// Ids have second resolution; two runs of the same agent started in the
    /// same second share an id and the later save wins.
    pub fn create(&self, agent_name: &str) -> String {
        run_id_at(Local::now(), agent_name)
    }

    fn path_for(&self, run_id: &str) -> Option<PathBuf> {
        is_safe_id(run_id).then(|| self.dir.join(format!("{run_id}.json")))
    }

    /// Snapshot `results` and overwrite the stored record for `run_id`.
    pub fn save(
        &self,
        results: &RunResults,
        run_id: &str,
        status: RunStatus,
        target_total: Option<usize>,
    ) -> StoreResult<RunRecord> {
        if !is_safe_id(run_id) {
            return Err(StoreError::UnsafeId(run_id.to_string()));
        }

        let record = RunRecord::snapshot(run_id, results, status, target_total);
        let path = write_json_atomic(&self.dir, &format!("{run_id}.json"), &record)?;
        debug!(
            run_id = %run_id,
            status = %status,
            completed = record.progress.completed,
            total = record.progress.total,
            path = %path.display(),
            "run record saved"
        );
        Ok(record)
    }

    /// Load a run record; `None` if it is absent, unparseable or inconsistent.
    pub fn load(&self, run_id: &str) -> Option<RunRecord> {
        let path = self.path_for(run_id)?;
        let record: RunRecord = read_json(&path)?;
        match record.validate() {
            Ok(()) => Some(record),
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "run record failed validation");
                None
            }
        }
    }

    /// Load every readable run record, newest first.
    pub fn load_all(&self) -> Vec<RunRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "runs directory unavailable");
                return Vec::new();
            }
        };

        let mut records: Vec<RunRecord> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                let loaded = self.load(&stem);
                if loaded.is_none() {
                    warn!(path = %path.display(), "skipping unreadable run record");
                }
                loaded
            })
            .collect();

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    /// Summary rows for every readable run, newest first.
    pub fn list(&self) -> Vec<RunListing> {
        self.load_all().iter().map(RunRecord::listing).collect()
    }
}

/// Build a run id from a local timestamp and a sanitized agent name.
pub fn run_id_at(at: DateTime<Local>, agent_name: &str) -> String {
    format!("{}-{}", at.format("%Y%m%d-%H%M%S"), sanitize_agent_name(agent_name))
}

fn sanitize_agent_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExampleMetadata, ExampleResult};
    use chrono::TimeZone;

    fn make_store() -> (tempfile::TempDir, RunStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("runs"));
        (dir, store)
    }

    fn results_with(n: usize) -> RunResults {
        let mut results = RunResults::new("ask-forge");
        for index in 0..n {
            results.record(ExampleResult {
                index,
                repo_url: "https://github.com/org/repo".to_string(),
                commit: "c0ffee".to_string(),
                question: format!("question {index}"),
                response: "answer".to_string(),
                facts: vec!["a".to_string(), "b".to_string()],
                judge_verdicts: vec![true, false],
                metadata: ExampleMetadata::default(),
                passed: true,
            });
        }
        results
    }

    #[test]
    fn test_run_id_format() {
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(run_id_at(at, "ask-forge"), "20260304-050607-ask-forge");
        assert_eq!(
            run_id_at(at, "Claude (haiku)"),
            "20260304-050607-Claude-haiku"
        );
        assert_eq!(run_id_at(at, "team/agent"), "20260304-050607-team-agent");
    }

    #[test]
    fn test_save_overwrites_and_load_roundtrip() {
        let (_dir, store) = make_store();
        let id = store.create("ask-forge");

        store
            .save(&results_with(1), &id, RunStatus::InProgress, Some(3))
            .unwrap();
        let partial = store.load(&id).unwrap();
        assert_eq!(partial.status, RunStatus::InProgress);
        assert_eq!(partial.progress.completed, 1);
        assert_eq!(partial.progress.total, 3);

        store
            .save(&results_with(3), &id, RunStatus::Complete, Some(3))
            .unwrap();
        let done = store.load(&id).unwrap();
        assert_eq!(done.status, RunStatus::Complete);
        assert_eq!(done.progress.completed, done.progress.total);
        assert_eq!(done.examples.len(), 3);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_load_missing_and_unsafe_is_none() {
        let (_dir, store) = make_store();
        assert!(store.load("does-not-exist").is_none());
        assert!(store.load("../secrets").is_none());
        assert!(matches!(
            store.save(&results_with(0), "../x", RunStatus::Complete, None),
            Err(StoreError::UnsafeId(_))
        ));
    }

    #[test]
    fn test_list_skips_corrupt_and_sorts_newest_first() {
        let (_dir, store) = make_store();
        store
            .save(&results_with(1), "20260101-000000-a", RunStatus::Complete, None)
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .save(&results_with(2), "20260102-000000-b", RunStatus::Complete, None)
            .unwrap();
        fs::write(store.dir().join("corrupt.json"), "{ truncated").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let listing = store.list();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, "20260102-000000-b");
        assert_eq!(listing[0].total_examples, 2);
        assert_eq!(listing[1].id, "20260101-000000-a");
    }

    #[test]
    fn test_load_rejects_misaligned_verdicts() {
        let (_dir, store) = make_store();
        let record = store
            .save(&results_with(1), "run-x", RunStatus::Complete, None)
            .unwrap();

        let mut raw = serde_json::to_value(&record).unwrap();
        raw["examples"][0]["llm_fact_verdicts"] = serde_json::json!([true]);
        fs::write(
            store.dir().join("run-x.json"),
            serde_json::to_string(&raw).unwrap(),
        )
        .unwrap();

        assert!(store.load("run-x").is_none());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_list_without_directory_is_empty() {
        let (_dir, store) = make_store();
        assert!(store.list().is_empty());
    }
}
