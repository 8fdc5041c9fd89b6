//! Embedding endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use crate::workflow::{run_embedding, EmbeddingOutcome, EmbeddingRequest};
use crate::{ApiError, ApiResult, AppState};

/// POST /embedding/run
///
/// **Request:** `{"strategy": "nmds" | "umap", "entity_ids": [...]?, "seed": 7?}`
///
/// Waits for any in-flight ingestion run so the projection sees a stable
/// set of rows.
///
/// **Errors:**
/// - 422 Unprocessable Entity: fewer than two usable vectors
/// - 500 Internal Server Error: storage or export failure
pub async fn run_embedding_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> ApiResult<Json<EmbeddingOutcome>> {
    let Json(request) = payload?;
    let _guard = state.ingestion_lock.lock().await;
    let seed = state.settings.read().await.seed;

    match run_embedding(&state.db, &state.exports_dir, seed, request).await {
        Ok(outcome) => {
            info!(
                strategy = %outcome.strategy,
                points = outcome.points.len(),
                document = %outcome.document_path.display(),
                "Embedding request complete"
            );
            Ok(Json(outcome))
        }
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(ApiError::from(e))
        }
    }
}

pub fn embedding_routes() -> Router<AppState> {
    Router::new().route("/embedding/run", post(run_embedding_handler))
}
