//! "Run ingestion" operation
//!
//! Builds the worklist from the catalog store, skips recordings that
//! already have a feature row and hands the rest to the scheduler.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AiSettings;
use crate::db::{recordings, SqliteFeatureStore};
use crate::error::AcousticError;
use crate::models::IngestionReport;
use crate::services::{IngestionScheduler, RecordingFetcher, SilenceTrimmer};

/// Worklist selection and per-run overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionRequest {
    /// Explicit recordings; takes precedence over `entity_ids`
    #[serde(default)]
    pub recording_ids: Option<Vec<String>>,
    /// All recordings of these entities
    #[serde(default)]
    pub entity_ids: Option<Vec<String>>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Scheduler report plus the recordings skipped before scheduling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionOutcome {
    #[serde(flatten)]
    pub report: IngestionReport,
    pub skipped_existing: usize,
}

/// Run one ingestion pass
///
/// Only worklist loading and parameter validation can fail; once jobs are
/// scheduled every failure is reported in the outcome.
pub async fn run_ingestion(
    db: &SqlitePool,
    settings: &AiSettings,
    fetcher: Arc<dyn RecordingFetcher>,
    request: IngestionRequest,
) -> Result<IngestionOutcome, AcousticError> {
    let concurrency = request.concurrency.unwrap_or(settings.concurrency);
    let batch_size = request.batch_size.unwrap_or(settings.batch_size);

    let trimmer = SilenceTrimmer::new().with_threshold_db(settings.silence_threshold_db)?;
    let scheduler = IngestionScheduler::new(fetcher, Arc::new(SqliteFeatureStore::new(db.clone())))
        .with_concurrency(concurrency)?
        .with_batch_size(batch_size)?
        .with_trimmer(trimmer);

    let worklist = match (&request.recording_ids, &request.entity_ids) {
        (Some(ids), _) => recordings::load_recordings_by_ids(db, ids).await?,
        (None, Some(entities)) => recordings::load_recordings_for_entities(db, entities).await?,
        (None, None) => recordings::load_all_recordings(db).await?,
    };

    let (pending, skipped_existing) = recordings::filter_without_features(db, worklist).await?;

    tracing::info!(
        pending = pending.len(),
        skipped_existing,
        "Ingestion worklist loaded"
    );

    let report = scheduler.run(pending).await;

    Ok(IngestionOutcome {
        report,
        skipped_existing,
    })
}
