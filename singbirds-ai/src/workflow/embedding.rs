//! "Run embedding" operation
//!
//! Loads a snapshot of feature rows, assembles fixed-length vectors, projects
//! them with the requested strategy and exports the document.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::db::{entities, feature_rows};
use crate::error::AcousticError;
use crate::models::{EmbeddingStrategy, LabeledVector, ProjectedPoint};
use crate::services::{assemble_all, export_document, EmbeddingEngine};

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRequest {
    pub strategy: EmbeddingStrategy,
    /// Restrict to these entities; all rows when absent
    #[serde(default)]
    pub entity_ids: Option<Vec<String>>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingOutcome {
    pub strategy: EmbeddingStrategy,
    pub points: Vec<ProjectedPoint>,
    pub document_path: PathBuf,
}

/// Load, assemble and label the vectors for a projection
pub async fn load_labeled_vectors(
    db: &SqlitePool,
    entity_ids: Option<&[String]>,
) -> Result<Vec<LabeledVector>, AcousticError> {
    let rows = feature_rows::load_feature_rows(db, entity_ids).await?;
    let names = entities::load_display_names(db).await?;

    Ok(assemble_all(&rows)
        .into_iter()
        .map(|assembled| LabeledVector {
            label: names
                .get(&assembled.entity_id)
                .cloned()
                .unwrap_or_else(|| assembled.entity_id.clone()),
            entity_id: assembled.entity_id,
            vector: assembled.vector,
        })
        .collect())
}

/// Run one projection and export it
pub async fn run_embedding(
    db: &SqlitePool,
    exports_dir: &Path,
    default_seed: u64,
    request: EmbeddingRequest,
) -> Result<EmbeddingOutcome, AcousticError> {
    let vectors = load_labeled_vectors(db, request.entity_ids.as_deref()).await?;
    let seed = request.seed.unwrap_or(default_seed);
    let strategy = request.strategy;

    tracing::info!(
        strategy = %strategy,
        vectors = vectors.len(),
        seed,
        "Starting projection"
    );

    let points = tokio::task::spawn_blocking(move || {
        EmbeddingEngine::new().project(strategy, &vectors, seed)
    })
    .await
    .map_err(|e| AcousticError::Extraction(format!("Projection task failed: {}", e)))??;

    let document_path = export_document(exports_dir, strategy, &points)
        .await
        .map_err(|e| AcousticError::Persistence(e.to_string()))?;

    Ok(EmbeddingOutcome {
        strategy,
        points,
        document_path,
    })
}
