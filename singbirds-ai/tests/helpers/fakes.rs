//! Fake collaborators and state builders

use singbirds_ai::config::AiSettings;
use singbirds_ai::db::{entities, recordings};
use singbirds_ai::error::AcousticError;
use singbirds_ai::models::{Entity, Recording};
use singbirds_ai::services::RecordingFetcher;
use singbirds_ai::AppState;
use singbirds_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves canned bodies by recording URL; unknown URLs fail to download
#[derive(Default)]
pub struct UrlFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub calls: AtomicUsize,
}

impl UrlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordingFetcher for UrlFetcher {
    async fn fetch(&self, recording: &Recording) -> Result<Vec<u8>, AcousticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(&recording.recording_url)
            .cloned()
            .ok_or_else(|| AcousticError::Download(format!("404 for {}", recording.recording_url)))
    }
}

/// Register an entity and its recording URLs; returns recordings in input order
pub async fn seed_entity(
    pool: &SqlitePool,
    entity_id: &str,
    display_name: &str,
    urls: &[&str],
) -> Vec<Recording> {
    entities::upsert_entity(
        pool,
        &Entity {
            entity_id: entity_id.to_string(),
            display_name: display_name.to_string(),
            scientific_name: None,
        },
    )
    .await
    .unwrap();

    let mut registered = Vec::new();
    for url in urls {
        let (recording, _) = recordings::register_recording(pool, entity_id, url)
            .await
            .unwrap();
        registered.push(recording);
    }
    registered
}

pub fn test_settings() -> AiSettings {
    AiSettings::from_toml(&TomlConfig::default())
}

/// App state over an in-memory database
pub async fn test_app_state(fetcher: UrlFetcher, exports_dir: &Path) -> AppState {
    let db = singbirds_common::db::init_memory_database().await.unwrap();
    AppState::new(db, test_settings(), exports_dir.to_path_buf(), Arc::new(fetcher))
}
