//! factbenchd - review server for factbench runs
//!
//! Serves the run and review JSON API over the reports directory and can
//! start evaluations in the background.

mod error;
mod launcher;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use factbench_core::{JudgeConfig, StoreLayout, DEFAULT_DATASET_PATH};

use crate::launcher::SpawnLauncher;
use crate::routes::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "factbenchd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Review server for factbench runs", long_about = None)]
struct Cli {
    /// HTTP listen port
    #[arg(long, env = "FACTBENCH_PORT", default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Root directory for run and review records
    #[arg(long, env = "FACTBENCH_REPORTS_DIR", default_value = "reports")]
    reports_dir: PathBuf,

    /// Dataset used by background evaluations
    #[arg(long, env = "FACTBENCH_DATASET", default_value = DEFAULT_DATASET_PATH)]
    dataset: PathBuf,

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
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    factbench_core::init_tracing(cli.json, level);

    let layout = StoreLayout::new(&cli.reports_dir);
    let launcher = SpawnLauncher::new(cli.dataset.clone(), layout.clone(), JudgeConfig::from_env());
    let state = AppState {
        runs: layout.run_store(),
        reviews: layout.review_store(),
        launcher: Arc::new(launcher),
    };

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", cli.host, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        addr = %addr,
        reports_dir = %cli.reports_dir.display(),
        dataset = %cli.dataset.display(),
        "review server listening"
    );
    println!("Starting review server on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
