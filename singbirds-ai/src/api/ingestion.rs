//! Ingestion endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::workflow::{run_ingestion, IngestionOutcome, IngestionRequest};
use crate::{ApiError, ApiResult, AppState};

/// POST /ingestion/run
///
/// **Request:** `{"entity_ids": ["amerob"], "batch_size": 5}` (all fields optional)
///
/// Runs to completion before responding. Per-recording and per-batch
/// failures are part of the response body, not an error status.
///
/// **Errors:**
/// - 400 Bad Request: concurrency or batch_size of 0
/// - 500 Internal Server Error: worklist could not be loaded
pub async fn run_ingestion_handler(
    State(state): State<AppState>,
    payload: Result<Json<IngestionRequest>, JsonRejection>,
) -> ApiResult<Json<IngestionOutcome>> {
    let Json(request) = payload?;
    let _guard = state.ingestion_lock.lock().await;
    let settings = state.settings.read().await.clone();

    let outcome = match run_ingestion(&state.db, &settings, state.fetcher.clone(), request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.record_error(e.to_string()).await;
            return Err(ApiError::from(e));
        }
    };

    let report = &outcome.report;
    if !report.failed_batches.is_empty() {
        warn!(
            failed_batches = report.failed_batches.len(),
            "Ingestion finished with rejected batches"
        );
        state
            .record_error(format!(
                "{} batch(es) rejected during ingestion",
                report.failed_batches.len()
            ))
            .await;
    }

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        batches_written = report.batches_written,
        failures = report.failures.len(),
        skipped_existing = outcome.skipped_existing,
        "Ingestion request complete"
    );

    Ok(Json(outcome))
}

pub fn ingestion_routes() -> Router<AppState> {
    Router::new().route("/ingestion/run", post(run_ingestion_handler))
}
