//! Human review overlay for a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reviewer's judgments for one example of a run.
///
/// `fact_verdicts[i]` refers to `facts[i]` of the reviewed example; `None`
/// means the fact has not been reviewed yet, which is distinct from `Some(false)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewEntry {
    pub example_index: usize,

    #[serde(default)]
    pub response_correct: Option<bool>,

    #[serde(default)]
    pub fact_verdicts: Vec<Option<bool>>,
}

impl ReviewEntry {
    pub fn new(example_index: usize) -> Self {
        Self {
            example_index,
            response_correct: None,
            fact_verdicts: Vec::new(),
        }
    }

    pub fn with_response_correct(mut self, correct: bool) -> Self {
        self.response_correct = Some(correct);
        self
    }

    pub fn with_fact_verdicts(mut self, verdicts: Vec<Option<bool>>) -> Self {
        self.fact_verdicts = verdicts;
        self
    }

    /// Whether the reviewer recorded at least one judgment.
    pub fn has_judgment(&self) -> bool {
        self.response_correct.is_some() || self.fact_verdicts.iter().any(Option::is_some)
    }
}

/// All review entries for one run; at most one entry per `example_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRecord {
    pub run_id: String,

    #[serde(default, deserialize_with = "super::timestamp::deserialize_option")]
    pub reviewed_at: Option<DateTime<Utc>>,

    #[serde(rename = "reviews", default)]
    pub entries: Vec<ReviewEntry>,
}

impl ReviewRecord {
    /// An empty, never-saved review for `run_id`.
    pub fn empty(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            reviewed_at: None,
            entries: Vec::new(),
        }
    }

    /// Look up the entry for an example.
    pub fn entry(&self, example_index: usize) -> Option<&ReviewEntry> {
        self.entries
            .iter()
            .find(|e| e.example_index == example_index)
    }

    /// Replace the entry with the same `example_index`, or append it.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert(&mut self, entry: ReviewEntry) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.example_index == entry.example_index)
        {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.entries.push(entry);
                false
            }
        }
    }

    /// Collapse duplicate indices so the last entry for each index wins.
    pub fn dedup(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            self.upsert(entry);
        }
    }

    /// Entries with a response-correctness judgment.
    pub fn reviewed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.response_correct.is_some())
            .count()
    }

    pub fn status(&self, total_examples: usize) -> ReviewStatus {
        let reviewed = self.reviewed_count();
        ReviewStatus {
            reviewed,
            total: total_examples,
            complete: reviewed == total_examples,
        }
    }
}

/// Review progress of a run, as shown in run listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewStatus {
    pub reviewed: usize,
    pub total: usize,
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_same_index() {
        let mut review = ReviewRecord::empty("run-1");
        assert!(!review.upsert(ReviewEntry::new(0).with_response_correct(false)));
        assert!(!review.upsert(ReviewEntry::new(2)));
        assert!(review.upsert(ReviewEntry::new(0).with_response_correct(true)));

        assert_eq!(review.entries.len(), 2);
        assert_eq!(review.entry(0).and_then(|e| e.response_correct), Some(true));
    }

    #[test]
    fn test_dedup_keeps_last_entry() {
        let mut review = ReviewRecord::empty("run-1");
        review.entries = vec![
            ReviewEntry::new(1).with_response_correct(false),
            ReviewEntry::new(4),
            ReviewEntry::new(1).with_response_correct(true),
        ];
        review.dedup();
        assert_eq!(review.entries.len(), 2);
        assert_eq!(review.entry(1).and_then(|e| e.response_correct), Some(true));
    }

    #[test]
    fn test_has_judgment_distinguishes_unreviewed() {
        assert!(!ReviewEntry::new(0)
            .with_fact_verdicts(vec![None, None])
            .has_judgment());
        assert!(ReviewEntry::new(0)
            .with_fact_verdicts(vec![None, Some(false)])
            .has_judgment());
        assert!(ReviewEntry::new(0).with_response_correct(false).has_judgment());
    }

    #[test]
    fn test_status_counts_response_judgments() {
        let mut review = ReviewRecord::empty("run-1");
        review.upsert(ReviewEntry::new(0).with_response_correct(true));
        review.upsert(ReviewEntry::new(1).with_fact_verdicts(vec![Some(true)]));

        let status = review.status(2);
        assert_eq!(status.reviewed, 1);
        assert!(!status.complete);
        assert!(ReviewRecord::empty("r").status(0).complete);
    }

    #[test]
    fn test_wire_format_uses_reviews_key() {
        let raw = serde_json::json!({
            "run_id": "run-1",
            "reviewed_at": null,
            "reviews": [
                {"example_index": 0, "response_correct": null, "fact_verdicts": [true, null, false]}
            ]
        });
        let review: ReviewRecord = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(review.entries.len(), 1);
        assert_eq!(
            review.entries[0].fact_verdicts,
            vec![Some(true), None, Some(false)]
        );
        assert!(review.reviewed_at.is_none());
    }
}
