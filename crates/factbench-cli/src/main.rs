//! factbench - fact-based evaluation runner
//!
//! Asks an agent the first N questions of the benchmark dataset, verifies each
//! expected fact against its answers and writes a progressively updated run
//! record under `<reports-dir>/runs/`.
//!
//! ```text
//! factbench [num_examples] [agent] [--html]
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::{info, Level};

use factbench_core::{
    dataset, resolve_agent, Breakdown, EvalError, Evaluator, FactChecker, JudgeConfig, RunRecord,
    StoreLayout, DEFAULT_AGENT, DEFAULT_DATASET_PATH,
};

#[derive(Parser, Debug)]
#[command(name = "factbench")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate a code agent against the fact-based benchmark", long_about = None)]
#[command(after_help = "Reports are saved to <reports-dir>/runs/ as JSON.\n\
Start factbenchd to review results in a browser.\n\
Environment variables can be set in a .env file.")]
struct Cli {
    /// Number of examples to test
    #[arg(default_value_t = 1)]
    num_examples: usize,

    /// Agent to use
    #[arg(default_value = DEFAULT_AGENT)]
    agent: String,

    /// Also write an HTML report to the current directory
    #[arg(long)]
    html: bool,

    /// Dataset file (JSON lines)
    #[arg(long, env = "FACTBENCH_DATASET", default_value = DEFAULT_DATASET_PATH)]
    dataset: PathBuf,

    /// Root directory for run and review records
    #[arg(long, env = "FACTBENCH_REPORTS_DIR", default_value = "reports")]
    reports_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print().ok();
            std::process::exit(code);
        }
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    factbench_core::init_tracing(cli.json, level);

    let agent = match resolve_agent(&cli.agent) {
        Ok(agent) => agent,
        Err(e @ EvalError::UnknownAgent { .. }) => {
            eprintln!("Error: {e}\n");
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let checker = FactChecker::from_config(JudgeConfig::from_env());
    if checker.strategy() == "llm" {
        println!("Using LLM judge for fact verification");
    } else {
        println!("Using keyword matching for fact verification");
        println!("(Set OPENROUTER_API_KEY to use LLM judge)");
    }

    let examples = dataset::load_jsonl(&cli.dataset)
        .with_context(|| format!("Failed to load dataset from {}", cli.dataset.display()))?;
    println!("Loaded {} examples", examples.len());
    println!("Agent: {}", agent.name());
    println!();

    let layout = StoreLayout::new(&cli.reports_dir);
    let evaluator = Evaluator::new(agent, checker, layout.run_store());
    let outcome = evaluator
        .run(&examples, cli.num_examples)
        .await
        .context("Failed to save run record")?;

    print!("{}", format_summary(&outcome.record));

    let record_path = layout.runs_dir().join(format!("{}.json", outcome.run_id));
    println!("\nJSON report saved to: {}", record_path.display());

    if cli.html {
        let file_name =
            factbench_core::report_file_name(&outcome.record.agent_name, chrono::Local::now());
        write_html(Path::new(&file_name), &outcome.record)?;
        println!("HTML report saved to: {file_name}");
    }

    info!(run_id = %outcome.run_id, "evaluation complete");
    println!("\nTo review results, run: factbenchd --reports-dir {}", cli.reports_dir.display());
    println!("Then open http://localhost:5000 in your browser");
    Ok(())
}

fn write_html(path: &Path, record: &RunRecord) -> Result<()> {
    factbench_core::write_html_report(path, record)
        .with_context(|| format!("Failed to write HTML report to {}", path.display()))
}

/// Text summary printed after a run.
fn format_summary(record: &RunRecord) -> String {
    let summary = &record.summary;
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "  Agent: {}", record.agent_name);
    let _ = writeln!(out, "  Examples tested: {}", summary.total_examples);
    let _ = writeln!(out, "  Examples passed: {}", summary.passed_examples);
    let _ = writeln!(out, "  Total facts: {}", summary.total_facts);
    let _ = writeln!(out, "  Facts verified: {}", summary.llm_verified_facts);
    let _ = writeln!(out, "  Accuracy: {:.1}%", summary.accuracy);

    for (title, breakdown) in [
        ("BY TYPE", &record.results_by_type),
        ("BY DIFFICULTY", &record.results_by_difficulty),
        ("BY SCOPE", &record.results_by_scope),
    ] {
        format_breakdown(&mut out, title, breakdown);
    }
    out
}

fn format_breakdown(out: &mut String, title: &str, breakdown: &Breakdown) {
    if breakdown.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for (key, stats) in breakdown {
        let _ = writeln!(out, "  {key}:");
        let _ = writeln!(
            out,
            "    Examples: {} ({} passed, {:.1}%)",
            stats.examples,
            stats.passed,
            stats.pass_rate_pct()
        );
        let _ = writeln!(
            out,
            "    Facts: {}/{} ({:.1}%)",
            stats.verified,
            stats.total,
            stats.accuracy_pct()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use factbench_core::{
        ExampleMetadata, ExampleResult, RunResults, RunStatus, AVAILABLE_AGENTS,
    };

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["factbench"]).unwrap();
        assert_eq!(cli.num_examples, 1);
        assert_eq!(cli.agent, DEFAULT_AGENT);
        assert!(!cli.html);
        assert!(AVAILABLE_AGENTS.contains(&cli.agent.as_str()));
    }

    #[test]
    fn test_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "factbench",
            "5",
            "ask-forge",
            "--html",
            "--reports-dir",
            "/tmp/r",
        ])
        .unwrap();
        assert_eq!(cli.num_examples, 5);
        assert_eq!(cli.agent, "ask-forge");
        assert!(cli.html);
        assert_eq!(cli.reports_dir, PathBuf::from("/tmp/r"));
    }

    #[test]
    fn test_non_numeric_count_is_an_error() {
        let err = Cli::try_parse_from(["factbench", "five"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.use_stderr());
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = Cli::try_parse_from(["factbench", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_unknown_agent_rejected() {
        assert!(matches!(
            resolve_agent("nonexistent"),
            Err(EvalError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn test_summary_includes_breakdowns() {
        let mut results = RunResults::new("ask-forge");
        results.record(ExampleResult {
            index: 0,
            repo_url: "https://github.com/org/repo".to_string(),
            commit: "abc".to_string(),
            question: "q".to_string(),
            response: "r".to_string(),
            facts: vec!["a".to_string(), "b".to_string()],
            judge_verdicts: vec![true, false],
            metadata: ExampleMetadata {
                difficulty: "hard".to_string(),
                ..ExampleMetadata::default()
            },
            passed: true,
        });
        let record = RunRecord::snapshot("run", &results, RunStatus::Complete, None);

        let text = format_summary(&record);
        assert!(text.contains("Accuracy: 50.0%"));
        assert!(text.contains("BY DIFFICULTY\n  hard:"));
        assert!(text.contains("Examples: 1 (1 passed, 100.0%)"));
        assert!(text.contains("Facts: 1/2 (50.0%)"));
    }
}
