//! End-to-end evaluation: dataset → agent → verifier → progressively saved run.

use std::sync::{Arc, Mutex};

use factbench_core::agent::AgentError;
use factbench_core::dataset::parse_jsonl;
use factbench_core::fakes::{ScriptedAgent, ScriptedVerifier};
use factbench_core::{
    is_error_response, Evaluator, FactChecker, KeywordVerifier, Progress, RunStatus, StoreLayout,
};

const DATASET: &str = r#"
{"question": "How does the cache evict entries?", "facts": ["the cache evicts least-recently-used entries", "eviction happens on insert"], "metadata": {"repo": "https://github.com/org/cache.git", "commit": "aaa111", "type": "open_question", "difficulty": "easy", "scope": "narrow"}}
{"question": "Where are requests routed?", "facts": ["router dispatches requests by path"], "metadata": {"repo": "https://github.com/org/web", "commit": "bbb222", "type": "how_to", "difficulty": "hard", "scope": "broad"}}
{"question": "What does the scheduler do?", "facts": ["scheduler assigns workers", "workers poll queues", "queues persist jobs"], "metadata": {"repo": "https://github.com/org/jobs", "commit": "ccc333", "type": "open_question", "difficulty": "hard", "scope": "broad"}}
"#;

#[tokio::test]
async fn run_record_is_consistent_mid_run_and_complete_at_end() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    let store = layout.run_store();
    let examples = parse_jsonl(DATASET).unwrap();

    let observed: Arc<Mutex<Vec<(RunStatus, Progress)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    let probe = store.clone();
    let agent = ScriptedAgent::always("an answer").with_hook(move |_| {
        for record in probe.load_all() {
            sink.lock().unwrap().push((record.status, record.progress));
        }
    });

    let evaluator = Evaluator::new(
        Arc::new(agent),
        FactChecker::new(Arc::new(ScriptedVerifier::always(true))),
        store.clone(),
    );
    let outcome = evaluator.run(&examples, 3).await.unwrap();

    // Before the first answer nothing is stored; afterwards one partial record per example.
    let observed = observed.lock().unwrap().clone();
    assert_eq!(
        observed,
        vec![
            (RunStatus::InProgress, Progress { completed: 1, total: 3 }),
            (RunStatus::InProgress, Progress { completed: 2, total: 3 }),
        ]
    );

    let stored = store.load(&outcome.run_id).unwrap();
    assert_eq!(stored.status, RunStatus::Complete);
    assert_eq!(stored.progress, Progress { completed: 3, total: 3 });
    assert!(stored.status_matches_progress());
    assert_eq!(stored.summary.total_facts, 6);
    assert_eq!(stored.summary.llm_verified_facts, 6);
    assert_eq!(stored.summary.passed_examples, 3);
    assert_eq!(stored.results_by_difficulty["hard"].examples, 2);
    assert_eq!(stored.results_by_scope["narrow"].total, 2);
    for example in &stored.examples {
        assert_eq!(example.facts.len(), example.judge_verdicts.len());
    }
}

#[tokio::test]
async fn failed_agent_calls_degrade_but_never_halt_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreLayout::new(dir.path()).run_store();
    let examples = parse_jsonl(DATASET).unwrap();

    let agent = ScriptedAgent::new(vec![
        Err(AgentError::Timeout { secs: 300 }),
        Err(AgentError::ProcessFailed {
            code: 1,
            stderr: "router dispatches requests by path".to_string(),
        }),
        Ok("The scheduler assigns workers; workers poll queues.".to_string()),
    ]);
    let evaluator = Evaluator::new(
        Arc::new(agent),
        FactChecker::new(Arc::new(KeywordVerifier)),
        store.clone(),
    );
    let outcome = evaluator.run(&examples, 10).await.unwrap();

    let record = store.load(&outcome.run_id).unwrap();
    assert_eq!(record.progress, Progress { completed: 3, total: 3 });

    let timed_out = &record.examples[0];
    assert!(is_error_response(&timed_out.response));
    assert!(timed_out.judge_verdicts.iter().all(|v| !v));
    assert!(!timed_out.passed);

    // The sentinel echoes stderr containing the fact text; it must still score false.
    let crashed = &record.examples[1];
    assert!(is_error_response(&crashed.response));
    assert!(crashed.response.contains("router dispatches"));
    assert_eq!(crashed.judge_verdicts, vec![false]);

    let answered = &record.examples[2];
    assert_eq!(answered.judge_verdicts, vec![true, true, false]);
    assert!(answered.passed);
    assert_eq!(record.summary.passed_examples, 1);
}

#[tokio::test]
async fn empty_dataset_produces_complete_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreLayout::new(dir.path()).run_store();
    let evaluator = Evaluator::new(
        Arc::new(ScriptedAgent::always("unused")),
        FactChecker::new(Arc::new(KeywordVerifier)),
        store.clone(),
    );

    let outcome = evaluator.run(&[], 1).await.unwrap();
    let listing = store.list();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, outcome.run_id);
    assert_eq!(listing[0].status, RunStatus::Complete);
    assert_eq!(listing[0].progress, Progress { completed: 0, total: 0 });
}
