//! Feature row persistence
//!
//! Rows are inserted in one transaction per batch and never updated. The
//! UNIQUE constraint on `recording_id` rejects a second row for the same
//! recording, which rolls back the whole batch.

use singbirds_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::AcousticError;
use crate::models::{PendingFeatureRow, StoredFeatureRow};
use crate::services::ingestion_scheduler::FeatureStore;

const SELECT_COLUMNS: &str = r#"
    SELECT recording_id, entity_id, mfcc, chroma, spectral_bandwidth, spectral_contrast,
           spectral_flatness, rms_energy, zero_crossing_rate, spectral_centroid,
           spectral_rolloff, created_at
    FROM feature_rows
"#;

fn json_array(values: &[f64]) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::Internal(format!("Failed to serialize feature vector: {}", e)))
}

/// Insert all rows atomically; returns the number written
pub async fn insert_feature_rows(pool: &SqlitePool, rows: &[PendingFeatureRow]) -> Result<usize> {
    let mut tx = pool.begin().await?;

    for row in rows {
        let f = &row.features;
        let mfcc = json_array(&f.mfcc)?;
        let chroma = json_array(&f.chroma)?;
        let contrast = json_array(&f.spectral_contrast)?;

        sqlx::query(
            r#"
            INSERT INTO feature_rows (
                recording_id, entity_id, mfcc, chroma, spectral_bandwidth, spectral_contrast,
                spectral_flatness, rms_energy, zero_crossing_rate, spectral_centroid,
                spectral_rolloff, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.recording_id)
        .bind(&row.entity_id)
        .bind(mfcc)
        .bind(chroma)
        .bind(f.spectral_bandwidth)
        .bind(contrast)
        .bind(f.spectral_flatness)
        .bind(f.rms_energy)
        .bind(f.zero_crossing_rate)
        .bind(f.spectral_centroid)
        .bind(f.spectral_rolloff)
        .bind(row.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(rows.len())
}

/// Load feature rows, optionally restricted to some entities
///
/// Ordered by insertion so repeated loads give the same sequence.
pub async fn load_feature_rows(
    pool: &SqlitePool,
    entity_ids: Option<&[String]>,
) -> Result<Vec<StoredFeatureRow>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);

    if let Some(ids) = entity_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        query.push(" WHERE entity_id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");
    }
    query.push(" ORDER BY feature_id");

    let rows = query
        .build_query_as::<StoredFeatureRow>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Number of stored feature rows
pub async fn count_feature_rows(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM feature_rows")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// `FeatureStore` backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteFeatureStore {
    pool: SqlitePool,
}

impl SqliteFeatureStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FeatureStore for SqliteFeatureStore {
    async fn insert_batch(&self, rows: &[PendingFeatureRow]) -> std::result::Result<usize, AcousticError> {
        insert_feature_rows(&self.pool, rows).await.map_err(|e| {
            if e.is_unique_violation() {
                AcousticError::Persistence(format!("Duplicate feature row in batch: {}", e))
            } else {
                AcousticError::Persistence(e.to_string())
            }
        })
    }
}
