//! Recording persistence
//!
//! Recordings are registered create-if-absent on (entity, URL), the same
//! pair the catalog collaborator discovers them by.

use chrono::Utc;
use singbirds_common::{Error, Result};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::Recording;

fn recording_from_row(row: &sqlx::sqlite::SqliteRow) -> Recording {
    Recording {
        recording_id: row.get("recording_id"),
        entity_id: row.get("entity_id"),
        recording_url: row.get("recording_url"),
    }
}

/// Register a recording unless one already exists for (entity, URL)
///
/// Returns the stored recording and whether it was created by this call.
pub async fn register_recording(
    pool: &SqlitePool,
    entity_id: &str,
    recording_url: &str,
) -> Result<(Recording, bool)> {
    let recording_url = recording_url.trim();
    if recording_url.is_empty() {
        return Err(Error::InvalidInput("recording_url must not be empty".to_string()));
    }

    let entity_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM entities WHERE entity_id = ?")
        .bind(entity_id)
        .fetch_optional(pool)
        .await?;
    if entity_exists.is_none() {
        return Err(Error::NotFound(format!("Entity {}", entity_id)));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO recordings (recording_id, entity_id, recording_url, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(entity_id, recording_url) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(entity_id)
    .bind(recording_url)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    let created = result.rows_affected() == 1;

    let row = sqlx::query(
        r#"
        SELECT recording_id, entity_id, recording_url FROM recordings
        WHERE entity_id = ? AND recording_url = ?
        "#,
    )
    .bind(entity_id)
    .bind(recording_url)
    .fetch_one(pool)
    .await?;

    let recording = recording_from_row(&row);
    if created {
        tracing::debug!(
            recording_id = %recording.recording_id,
            entity_id = %entity_id,
            "Recording registered"
        );
    }

    Ok((recording, created))
}

/// Load recordings by id; unknown ids are ignored
pub async fn load_recordings_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Recording>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT recording_id, entity_id, recording_url FROM recordings WHERE recording_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(") ORDER BY created_at, recording_id");

    let rows = query.build().fetch_all(pool).await?;
    Ok(rows.iter().map(recording_from_row).collect())
}

/// Load all recordings of the given entities
pub async fn load_recordings_for_entities(
    pool: &SqlitePool,
    entity_ids: &[String],
) -> Result<Vec<Recording>> {
    if entity_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT recording_id, entity_id, recording_url FROM recordings WHERE entity_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in entity_ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(") ORDER BY created_at, recording_id");

    let rows = query.build().fetch_all(pool).await?;
    Ok(rows.iter().map(recording_from_row).collect())
}

/// Load every recording
pub async fn load_all_recordings(pool: &SqlitePool) -> Result<Vec<Recording>> {
    let rows = sqlx::query(
        "SELECT recording_id, entity_id, recording_url FROM recordings ORDER BY created_at, recording_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(recording_from_row).collect())
}

/// Split recordings into those still lacking a feature row and a count of
/// those that already have one
pub async fn filter_without_features(
    pool: &SqlitePool,
    recordings: Vec<Recording>,
) -> Result<(Vec<Recording>, usize)> {
    let existing: std::collections::HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT recording_id FROM feature_rows")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let total = recordings.len();
    let pending: Vec<Recording> = recordings
        .into_iter()
        .filter(|r| !existing.contains(&r.recording_id))
        .collect();
    let skipped = total - pending.len();

    Ok((pending, skipped))
}

/// Delete a recording (its feature row goes with it)
pub async fn delete_recording(pool: &SqlitePool, recording_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM recordings WHERE recording_id = ?")
        .bind(recording_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
