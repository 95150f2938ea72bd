//! Background evaluation jobs started from `POST /api/run-test`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{error, info};

use factbench_core::{
    dataset, resolve_agent, EvalJob, EvalLauncher, Evaluator, FactChecker, JudgeConfig, Result,
    StoreLayout,
};

/// Launches each job as a detached tokio task.
///
/// The dataset is loaded and the agent resolved before the task starts, so
/// those failures reach the caller; everything after that is only visible
/// through the run record's progress.
#[derive(Debug, Clone)]
pub struct SpawnLauncher {
    dataset: PathBuf,
    layout: StoreLayout,
    judge: Option<JudgeConfig>,
}

impl SpawnLauncher {
    pub fn new(dataset: PathBuf, layout: StoreLayout, judge: Option<JudgeConfig>) -> Self {
        Self {
            dataset,
            layout,
            judge,
        }
    }
}

#[async_trait]
impl EvalLauncher for SpawnLauncher {
    async fn launch(&self, job: EvalJob) -> Result<()> {
        let examples = dataset::load_jsonl(&self.dataset)?;
        let agent = resolve_agent(&job.agent)?;
        let evaluator = Evaluator::new(
            agent,
            FactChecker::from_config(self.judge.clone()),
            self.layout.run_store(),
        );

        info!(agent = %job.agent, num_examples = job.num_examples, "launching evaluation");
        tokio::spawn(async move {
            match evaluator.run(&examples, job.num_examples).await {
                Ok(outcome) => info!(run_id = %outcome.run_id, "background evaluation finished"),
                Err(e) => error!(error = %e, "background evaluation failed"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factbench_core::EvalError;

    #[tokio::test]
    async fn test_missing_dataset_fails_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = SpawnLauncher::new(
            dir.path().join("missing.jsonl"),
            StoreLayout::new(dir.path()),
            None,
        );
        let job = EvalJob::validate("ask-forge", 1).unwrap();

        assert!(matches!(
            launcher.launch(job).await,
            Err(EvalError::Dataset(_))
        ));
        assert!(!dir.path().join("runs").exists());
    }
}
