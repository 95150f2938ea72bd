//! HTTP endpoints for the review server using axum.
//!
//! Endpoints:
//! - GET  /health                              - health check
//! - GET  /api/runs                            - run listing with review status
//! - GET  /api/run/:id                         - full run record
//! - GET  /api/review/:id                      - review overlay (empty if none)
//! - POST /api/review/:id                      - replace the whole review
//! - POST /api/review/:id/example/:index       - upsert one example's review
//! - GET  /api/metrics                         - judge-vs-human metrics
//! - POST /api/run-test                        - start a background evaluation
//! - GET  /report/:id                          - HTML report for a run

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use factbench_core::{
    compute_metrics, render_html_report, EvalJob, EvalLauncher, Metrics, ReviewEntry,
    ReviewRecord, ReviewStatus, ReviewStore, RunListing, RunRecord, RunStore, DEFAULT_AGENT,
};

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub runs: RunStore,
    pub reviews: ReviewStore,
    pub launcher: Arc<dyn EvalLauncher>,
}

/// Build the axum router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/runs", get(list_runs))
        .route("/api/run/:id", get(get_run))
        .route("/api/review/:id", get(get_review).post(save_review))
        .route("/api/review/:id/example/:index", post(save_example_review))
        .route("/api/metrics", get(metrics))
        .route("/api/run-test", post(run_test))
        .route("/report/:id", get(report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Request / Response types ────────────────────────────────────────

/// A listing row plus its review progress.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunRow {
    #[serde(flatten)]
    pub listing: RunListing,
    pub review_status: ReviewStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExampleReviewBody {
    #[serde(default)]
    pub response_correct: Option<bool>,
    #[serde(default)]
    pub fact_verdicts: Vec<Option<bool>>,
}

#[derive(Debug, Deserialize)]
pub struct RunTestBody {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub num_examples: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunTestResponse {
    pub success: bool,
    pub message: String,
    pub agent: String,
    pub num_examples: usize,
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": factbench_core::VERSION }))
}

/// Run blocking store work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
}

async fn list_runs(State(state): State<AppState>) -> Result<Json<Vec<RunRow>>, ApiError> {
    let rows = blocking(move || {
        let rows: Vec<RunRow> = state
            .runs
            .list()
            .into_iter()
            .map(|listing| {
                let review_status = state
                    .reviews
                    .load(&listing.id)
                    .status(listing.total_examples);
                RunRow {
                    listing,
                    review_status,
                }
            })
            .collect();
        Ok(rows)
    })
    .await?;
    Ok(Json(rows))
}

fn require_run(state: &AppState, id: &str) -> Result<RunRecord, ApiError> {
    state.runs.load(id).ok_or(ApiError::RunNotFound)
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunRecord>, ApiError> {
    let record = blocking(move || require_run(&state, &id)).await?;
    Ok(Json(record))
}

async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReviewRecord>, ApiError> {
    let review = blocking(move || Ok(state.reviews.load(&id))).await?;
    Ok(Json(review))
}

async fn save_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let body = body.map(|Json(body)| body).map_err(ApiError::from);
    blocking(move || {
        require_run(&state, &id)?;
        let mut record = ReviewRecord::empty(&id);
        record.entries = body?.reviews;
        state.reviews.upsert_whole_record(&id, record)?;
        Ok(())
    })
    .await?;

    Ok(Json(SaveResponse {
        success: true,
        message: "Review saved".to_string(),
    }))
}

async fn save_example_review(
    State(state): State<AppState>,
    path: Result<Path<(String, usize)>, PathRejection>,
    body: Result<Json<ExampleReviewBody>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Path((id, index)) = path?;
    let body = body.map(|Json(body)| body).map_err(ApiError::from);
    blocking(move || {
        require_run(&state, &id)?;
        let body = body?;
        let entry = ReviewEntry {
            example_index: index,
            response_correct: body.response_correct,
            fact_verdicts: body.fact_verdicts,
        };
        state.reviews.upsert_entry(&id, index, entry)?;
        Ok(())
    })
    .await?;

    Ok(Json(SaveResponse {
        success: true,
        message: "Example review saved".to_string(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Result<Json<Metrics>, ApiError> {
    let metrics = blocking(move || Ok(compute_metrics(&state.runs, &state.reviews))).await?;
    Ok(Json(metrics))
}

async fn run_test(
    State(state): State<AppState>,
    body: Result<Json<RunTestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let agent = body.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string());
    let job = EvalJob::validate(&agent, body.num_examples.unwrap_or(1))?;

    state.launcher.launch(job.clone()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunTestResponse {
            success: true,
            message: format!(
                "Started test with {} examples using {}",
                job.num_examples, job.agent
            ),
            agent: job.agent,
            num_examples: job.num_examples,
        }),
    ))
}

async fn report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let record = blocking(move || require_run(&state, &id)).await?;
    Ok(Html(render_html_report(&record)))
}
