//! Judge-vs-human agreement metrics.
//!
//! Recomputed from scratch on every call: every stored run is joined with its
//! review overlay and each human-judged fact is classified against the judge
//! verdict at the same position. Counts are rolled up globally and per agent,
//! difficulty and type. All rates are percentages (0–100) and are `0` when
//! their denominator is zero.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{ReviewEntry, RunRecord};
use crate::store::{ReviewStore, RunStore};

fn rate(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}

/// Judge verdict vs human verdict, four ways.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Judge true, human true.
    pub tp: usize,
    /// Judge true, human false.
    pub fp: usize,
    /// Judge false, human true.
    #[serde(rename = "fn")]
    pub fn_: usize,
    /// Judge false, human false.
    pub tn: usize,
}

impl ConfusionCounts {
    pub fn classify(&mut self, judge: bool, human: bool) {
        match (judge, human) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, true) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    pub fn accuracy(&self) -> f64 {
        rate(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        rate(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        rate(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Share of human-judged facts the human found present in the response.
    pub fn fact_coverage(&self) -> f64 {
        rate(self.tp + self.fn_, self.total())
    }

    pub fn rates(&self) -> Rates {
        Rates {
            accuracy: self.accuracy(),
            precision: self.precision(),
            recall: self.recall(),
            f1: self.f1(),
            fact_coverage: self.fact_coverage(),
        }
    }
}

/// Rates derived from a [`ConfusionCounts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub fact_coverage: f64,
}

/// Confusion counts and rates for one difficulty or type value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisMetrics {
    #[serde(flatten)]
    pub counts: ConfusionCounts,
    #[serde(flatten)]
    pub rates: Rates,
}

/// Per-agent roll-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub total_examples: usize,
    pub total_facts: usize,
    pub reviewed_examples: usize,
    pub correct: usize,
    pub incorrect: usize,
    #[serde(flatten)]
    pub counts: ConfusionCounts,
    #[serde(flatten)]
    pub rates: Rates,
    pub response_accuracy: f64,
}

/// The full metrics payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_runs: usize,
    pub reviewed_runs: usize,
    pub total_examples: usize,
    pub reviewed_examples: usize,
    pub total_facts: usize,
    pub reviewed_facts: usize,
    pub response_correct: usize,
    pub response_incorrect: usize,
    pub llm_true_human_true: usize,
    pub llm_true_human_false: usize,
    pub llm_false_human_true: usize,
    pub llm_false_human_false: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub fact_coverage: f64,
    pub response_accuracy: f64,
    pub by_agent: BTreeMap<String, AgentMetrics>,
    pub by_difficulty: BTreeMap<String, AxisMetrics>,
    pub by_type: BTreeMap<String, AxisMetrics>,
}

impl Metrics {
    /// Global confusion counts.
    pub fn confusion(&self) -> ConfusionCounts {
        ConfusionCounts {
            tp: self.llm_true_human_true,
            fp: self.llm_true_human_false,
            fn_: self.llm_false_human_true,
            tn: self.llm_false_human_false,
        }
    }
}

#[derive(Debug, Default)]
struct AgentTally {
    examples: usize,
    facts: usize,
    reviewed_examples: usize,
    correct: usize,
    incorrect: usize,
    counts: ConfusionCounts,
}

/// Running totals, keyed by axis value where applicable.
#[derive(Debug, Default)]
struct Accumulator {
    total_runs: usize,
    reviewed_runs: usize,
    examples: usize,
    reviewed_examples: usize,
    facts: usize,
    correct: usize,
    incorrect: usize,
    counts: ConfusionCounts,
    by_agent: BTreeMap<String, AgentTally>,
    by_difficulty: BTreeMap<String, ConfusionCounts>,
    by_type: BTreeMap<String, ConfusionCounts>,
}

impl Accumulator {
    fn add_run(&mut self, run: &RunRecord, entries: &[ReviewEntry]) {
        self.total_runs += 1;

        let by_index: HashMap<usize, &ReviewEntry> =
            entries.iter().map(|e| (e.example_index, e)).collect();
        let agent = self.by_agent.entry(run.agent_name.clone()).or_default();
        let mut run_reviewed = false;

        for example in &run.examples {
            let facts = example.facts.len();
            self.examples += 1;
            self.facts += facts;
            agent.examples += 1;
            agent.facts += facts;

            let Some(entry) = by_index.get(&example.index).filter(|e| e.has_judgment()) else {
                continue;
            };
            run_reviewed = true;
            self.reviewed_examples += 1;
            agent.reviewed_examples += 1;

            match entry.response_correct {
                Some(true) => {
                    self.correct += 1;
                    agent.correct += 1;
                }
                Some(false) => {
                    self.incorrect += 1;
                    agent.incorrect += 1;
                }
                None => {}
            }

            let difficulty = self
                .by_difficulty
                .entry(example.metadata.difficulty.clone())
                .or_default();
            let kind = self.by_type.entry(example.metadata.kind.clone()).or_default();

            let pairs = example.judge_verdicts.iter().zip(&entry.fact_verdicts);
            for (judge, human) in pairs {
                let Some(human) = *human else { continue };
                for counts in [
                    &mut self.counts,
                    &mut agent.counts,
                    &mut *difficulty,
                    &mut *kind,
                ] {
                    counts.classify(*judge, human);
                }
            }
        }

        if run_reviewed {
            self.reviewed_runs += 1;
        }
    }

    fn finish(self) -> Metrics {
        let axis = |map: BTreeMap<String, ConfusionCounts>| -> BTreeMap<String, AxisMetrics> {
            map.into_iter()
                .map(|(key, counts)| {
                    let rates = counts.rates();
                    (key, AxisMetrics { counts, rates })
                })
                .collect()
        };
        let rates = self.counts.rates();

        Metrics {
            total_runs: self.total_runs,
            reviewed_runs: self.reviewed_runs,
            total_examples: self.examples,
            reviewed_examples: self.reviewed_examples,
            total_facts: self.facts,
            reviewed_facts: self.counts.total(),
            response_correct: self.correct,
            response_incorrect: self.incorrect,
            llm_true_human_true: self.counts.tp,
            llm_true_human_false: self.counts.fp,
            llm_false_human_true: self.counts.fn_,
            llm_false_human_false: self.counts.tn,
            accuracy: rates.accuracy,
            precision: rates.precision,
            recall: rates.recall,
            f1: rates.f1,
            fact_coverage: rates.fact_coverage,
            response_accuracy: rate(self.correct, self.correct + self.incorrect),
            by_agent: self
                .by_agent
                .into_iter()
                .map(|(name, t)| {
                    let metrics = AgentMetrics {
                        total_examples: t.examples,
                        total_facts: t.facts,
                        reviewed_examples: t.reviewed_examples,
                        correct: t.correct,
                        incorrect: t.incorrect,
                        counts: t.counts,
                        rates: t.counts.rates(),
                        response_accuracy: rate(t.correct, t.correct + t.incorrect),
                    };
                    (name, metrics)
                })
                .collect(),
            by_difficulty: axis(self.by_difficulty),
            by_type: axis(self.by_type),
        }
    }
}

/// Aggregate metrics over runs already paired with their review entries.
pub fn aggregate<'a>(runs: impl IntoIterator<Item = (&'a RunRecord, &'a [ReviewEntry])>) -> Metrics {
    let mut acc = Accumulator::default();
    for (run, entries) in runs {
        acc.add_run(run, entries);
    }
    acc.finish()
}

/// Aggregate metrics over every stored run and its review.
pub fn compute_metrics(runs: &RunStore, reviews: &ReviewStore) -> Metrics {
    let records = runs.load_all();
    let overlays: Vec<_> = records.iter().map(|r| reviews.load(&r.id)).collect();
    let metrics = aggregate(
        records
            .iter()
            .zip(&overlays)
            .map(|(run, review)| (run, review.entries.as_slice())),
    );
    tracing::debug!(
        total_runs = metrics.total_runs,
        reviewed_runs = metrics.reviewed_runs,
        reviewed_facts = metrics.reviewed_facts,
        "metrics computed"
    );
    metrics
}
