//! Ingestion settings endpoint
//!
//! Saved values become the database tier of the setting resolution, so they
//! outrank environment and TOML on the next start. The running service picks
//! them up immediately.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::save_ingestion_settings;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestionSettingsBody {
    pub concurrency: usize,
    pub batch_size: usize,
}

/// PUT /settings/ingestion
///
/// **Request:** `{"concurrency": 4, "batch_size": 10}`
/// **Response:** the stored values
///
/// **Errors:**
/// - 400 Bad Request: either value is 0
/// - 500 Internal Server Error: database write failure
pub async fn put_ingestion_settings(
    State(state): State<AppState>,
    payload: Result<Json<IngestionSettingsBody>, JsonRejection>,
) -> ApiResult<Json<IngestionSettingsBody>> {
    let Json(body) = payload?;

    if let Err(e) = save_ingestion_settings(&state.db, body.concurrency, body.batch_size).await {
        state.record_error(e.to_string()).await;
        return Err(ApiError::from(e));
    }

    {
        let mut settings = state.settings.write().await;
        settings.concurrency = body.concurrency;
        settings.batch_size = body.batch_size;
    }

    info!(
        concurrency = body.concurrency,
        batch_size = body.batch_size,
        "Ingestion settings saved"
    );
    Ok(Json(body))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings/ingestion", put(put_ingestion_settings))
}
