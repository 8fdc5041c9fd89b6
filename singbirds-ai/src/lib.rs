//! singbirds-ai library interface
//!
//! Exposes the pipeline and HTTP router for the binary and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AiSettings;
use crate::services::RecordingFetcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Effective settings; resolved at startup, updated by `PUT /settings/ingestion`
    pub settings: Arc<RwLock<AiSettings>>,
    /// Where exported documents are written
    pub exports_dir: PathBuf,
    pub fetcher: Arc<dyn RecordingFetcher>,
    /// Held for a whole ingestion run and for each projection
    pub ingestion_lock: Arc<Mutex<()>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        settings: AiSettings,
        exports_dir: PathBuf,
        fetcher: Arc<dyn RecordingFetcher>,
    ) -> Self {
        Self {
            db,
            settings: Arc::new(RwLock::new(settings)),
            exports_dir,
            fetcher,
            ingestion_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::catalog_routes())
        .merge(api::ingestion_routes())
        .merge(api::embedding_routes())
        .merge(api::settings_routes())
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
        .with_state(state)
}
