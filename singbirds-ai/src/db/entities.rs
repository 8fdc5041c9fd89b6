//! Catalog entity persistence

use singbirds_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::models::Entity;

/// Insert or update an entity by id
pub async fn upsert_entity(pool: &SqlitePool, entity: &Entity) -> Result<()> {
    if entity.entity_id.trim().is_empty() {
        return Err(Error::InvalidInput("entity_id must not be empty".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO entities (entity_id, display_name, scientific_name, created_at)
        VALUES (?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(entity_id) DO UPDATE SET
            display_name = excluded.display_name,
            scientific_name = excluded.scientific_name
        "#,
    )
    .bind(&entity.entity_id)
    .bind(&entity.display_name)
    .bind(&entity.scientific_name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one entity
pub async fn load_entity(pool: &SqlitePool, entity_id: &str) -> Result<Option<Entity>> {
    let row = sqlx::query(
        "SELECT entity_id, display_name, scientific_name FROM entities WHERE entity_id = ?",
    )
    .bind(entity_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Entity {
        entity_id: row.get("entity_id"),
        display_name: row.get("display_name"),
        scientific_name: row.get("scientific_name"),
    }))
}

/// Display name per entity id, for labeling projected points
pub async fn load_display_names(pool: &SqlitePool) -> Result<HashMap<String, String>> {
    let rows = sqlx::query("SELECT entity_id, display_name FROM entities")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("entity_id"), row.get("display_name")))
        .collect())
}
