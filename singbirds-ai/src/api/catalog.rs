//! Catalog endpoints
//!
//! The catalog collaborator pushes entities and recordings here. Recording
//! registration is create-if-absent on (entity, URL).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{entities, recordings};
use crate::models::{Entity, Recording};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRecordingRequest {
    pub entity_id: String,
    pub recording_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRecordingResponse {
    pub recording: Recording,
    /// False when the (entity, URL) pair was already registered
    pub created: bool,
}

/// POST /entities
///
/// Inserts or updates the entity's labels.
pub async fn upsert_entity(
    State(state): State<AppState>,
    payload: Result<Json<Entity>, JsonRejection>,
) -> ApiResult<Json<Entity>> {
    let Json(entity) = payload?;
    if let Err(e) = entities::upsert_entity(&state.db, &entity).await {
        state.record_error(e.to_string()).await;
        return Err(ApiError::from(e));
    }

    info!(entity_id = %entity.entity_id, "Entity upserted");
    Ok(Json(entity))
}

/// POST /recordings
///
/// **Errors:**
/// - 400 Bad Request: empty URL
/// - 404 Not Found: unknown entity
pub async fn register_recording(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRecordingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterRecordingResponse>)> {
    let Json(request) = payload?;
    let (recording, created) =
        match recordings::register_recording(&state.db, &request.entity_id, &request.recording_url)
            .await
        {
            Ok(registered) => registered,
            Err(e) => {
                state.record_error(e.to_string()).await;
                return Err(ApiError::from(e));
            }
        };

    if created {
        info!(
            recording_id = %recording.recording_id,
            entity_id = %recording.entity_id,
            "Recording registered"
        );
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(RegisterRecordingResponse { recording, created })))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/entities", post(upsert_entity))
        .route("/recordings", post(register_recording))
}
