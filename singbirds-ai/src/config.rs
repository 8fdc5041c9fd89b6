//! Configuration resolution for singbirds-ai
//!
//! Ingestion concurrency and batch size resolve with Database → ENV → TOML
//! → default priority. Everything else comes from TOML (or its defaults).

use singbirds_common::config::TomlConfig;
use singbirds_common::db::{get_setting, set_setting};
use singbirds_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tracing::{info, warn};

pub const CONCURRENCY_SETTING: &str = "ingestion_concurrency";
pub const BATCH_SIZE_SETTING: &str = "ingestion_batch_size";

pub const CONCURRENCY_ENV: &str = "SINGBIRDS_INGESTION_CONCURRENCY";
pub const BATCH_SIZE_ENV: &str = "SINGBIRDS_INGESTION_BATCH_SIZE";

/// Effective settings for the ingest service
#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub concurrency: usize,
    pub batch_size: usize,
    pub download_timeout: Duration,
    pub max_download_bytes: u64,
    pub silence_threshold_db: f64,
    pub seed: u64,
}

impl AiSettings {
    /// Settings straight from TOML, no database or environment overrides
    pub fn from_toml(toml_config: &TomlConfig) -> Self {
        let ingestion = &toml_config.ingestion;
        Self {
            concurrency: ingestion.concurrency,
            batch_size: ingestion.batch_size,
            download_timeout: Duration::from_secs(ingestion.download_timeout_secs),
            max_download_bytes: ingestion.max_download_bytes,
            silence_threshold_db: ingestion.silence_threshold_db,
            seed: toml_config.embedding.seed,
        }
    }
}

/// Parse a positive integer setting, `None` when absent or invalid
fn parse_positive(source: &str, key: &str, raw: Option<&str>) -> Option<usize> {
    let raw = raw?.trim();
    match raw.parse::<usize>() {
        Ok(value) if value >= 1 => Some(value),
        _ => {
            warn!(source, key, value = raw, "Ignoring invalid setting (must be an integer >= 1)");
            None
        }
    }
}

/// Resolve one positive integer across the four tiers
async fn resolve_positive(
    db: &Pool<Sqlite>,
    setting: &str,
    env_var: &str,
    toml_value: usize,
) -> Result<usize> {
    let db_value = get_setting(db, setting).await?;
    if let Some(value) = parse_positive("database", setting, db_value.as_deref()) {
        info!(key = setting, value, "Setting loaded from database");
        return Ok(value);
    }

    let env_value = std::env::var(env_var).ok();
    if let Some(value) = parse_positive("environment", env_var, env_value.as_deref()) {
        info!(key = setting, value, "Setting loaded from environment variable");
        return Ok(value);
    }

    if toml_value >= 1 {
        return Ok(toml_value);
    }

    warn!(key = setting, "TOML value must be >= 1, using compiled default");
    Ok(match setting {
        CONCURRENCY_SETTING => crate::services::ingestion_scheduler::DEFAULT_CONCURRENCY,
        _ => crate::services::ingestion_scheduler::DEFAULT_BATCH_SIZE,
    })
}

/// Resolve effective settings
pub async fn resolve_settings(db: &Pool<Sqlite>, toml_config: &TomlConfig) -> Result<AiSettings> {
    let mut settings = AiSettings::from_toml(toml_config);

    settings.concurrency =
        resolve_positive(db, CONCURRENCY_SETTING, CONCURRENCY_ENV, settings.concurrency).await?;
    settings.batch_size =
        resolve_positive(db, BATCH_SIZE_SETTING, BATCH_SIZE_ENV, settings.batch_size).await?;

    if !(settings.silence_threshold_db.is_finite() && settings.silence_threshold_db > 0.0) {
        return Err(Error::Config(format!(
            "silence_threshold_db must be positive, got {}",
            settings.silence_threshold_db
        )));
    }

    Ok(settings)
}

/// Persist ingestion overrides so they survive restarts
pub async fn save_ingestion_settings(
    db: &Pool<Sqlite>,
    concurrency: usize,
    batch_size: usize,
) -> Result<()> {
    if concurrency == 0 || batch_size == 0 {
        return Err(Error::InvalidInput(
            "concurrency and batch_size must be >= 1".to_string(),
        ));
    }
    set_setting(db, CONCURRENCY_SETTING, &concurrency.to_string()).await?;
    set_setting(db, BATCH_SIZE_SETTING, &batch_size.to_string()).await?;
    Ok(())
}
