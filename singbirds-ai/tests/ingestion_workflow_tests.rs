//! Ingestion against a real SQLite store

mod helpers;

use helpers::{noise_wav, seed_entity, silent_wav, tone_wav, UrlFetcher};
use singbirds_ai::config::AiSettings;
use singbirds_ai::db::{feature_rows, recordings};
use singbirds_ai::models::FailureKind;
use singbirds_ai::services::assemble_all;
use singbirds_ai::workflow::{run_ingestion, IngestionRequest};
use singbirds_common::config::TomlConfig;
use singbirds_common::db::init_memory_database;
use std::sync::Arc;

fn settings() -> AiSettings {
    AiSettings::from_toml(&TomlConfig::default())
}

fn request(batch_size: usize) -> IngestionRequest {
    IngestionRequest {
        batch_size: Some(batch_size),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_corrupt_recording_is_reported_and_others_persist() {
    let db = init_memory_database().await.unwrap();
    let recs = seed_entity(
        &db,
        "amerob",
        "American Robin",
        &["https://x.test/r1.wav", "https://x.test/r2.mp3", "https://x.test/r3.wav"],
    )
    .await;

    let fetcher = UrlFetcher::new()
        .with_body("https://x.test/r1.wav", tone_wav(1200.0, 1.0))
        .with_body("https://x.test/r2.mp3", b"definitely not audio".to_vec())
        .with_body("https://x.test/r3.wav", tone_wav(3400.0, 1.0));

    let outcome = run_ingestion(&db, &settings(), Arc::new(fetcher), request(2))
        .await
        .unwrap();

    assert_eq!(outcome.report.attempted, 3);
    assert_eq!(outcome.report.succeeded, 2);
    assert_eq!(outcome.report.batches_written, 1);
    assert_eq!(outcome.report.rows_written, 2);
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].recording_id, recs[1].recording_id);
    assert_eq!(outcome.report.failures[0].kind, FailureKind::DecodeError);

    let rows = feature_rows::load_feature_rows(&db, None).await.unwrap();
    let mut stored: Vec<&str> = rows.iter().map(|r| r.recording_id.as_str()).collect();
    stored.sort();
    let mut expected = vec![recs[0].recording_id.as_str(), recs[2].recording_id.as_str()];
    expected.sort();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_rerun_creates_no_duplicates() {
    let db = init_memory_database().await.unwrap();
    seed_entity(
        &db,
        "norcar",
        "Northern Cardinal",
        &["https://x.test/a.wav", "https://x.test/b.wav"],
    )
    .await;

    let fetcher = Arc::new(
        UrlFetcher::new()
            .with_body("https://x.test/a.wav", tone_wav(2000.0, 0.5))
            .with_body("https://x.test/b.wav", noise_wav(0.5, 7)),
    );

    let first = run_ingestion(&db, &settings(), fetcher.clone(), request(10))
        .await
        .unwrap();
    assert_eq!(first.report.rows_written, 2);
    assert_eq!(first.skipped_existing, 0);

    let second = run_ingestion(&db, &settings(), fetcher.clone(), request(10))
        .await
        .unwrap();
    assert_eq!(second.report.attempted, 0);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(fetcher.call_count(), 2);

    assert_eq!(feature_rows::count_feature_rows(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_download_failures_do_not_block_flushes() {
    let db = init_memory_database().await.unwrap();
    let urls: Vec<String> = (0..7).map(|i| format!("https://x.test/{}.wav", i)).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    seed_entity(&db, "blujay", "Blue Jay", &url_refs).await;

    // 0 and 1 have no body and fail to download
    let mut fetcher = UrlFetcher::new();
    for (i, url) in urls.iter().enumerate().skip(2) {
        fetcher = fetcher.with_body(url, tone_wav(500.0 + 300.0 * i as f32, 0.4));
    }

    let outcome = run_ingestion(
        &db,
        &settings(),
        Arc::new(fetcher),
        IngestionRequest {
            concurrency: Some(3),
            batch_size: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.report.succeeded, 5);
    assert_eq!(outcome.report.batches_written, 3);
    assert_eq!(outcome.report.rows_written, 5);
    assert_eq!(outcome.report.failures.len(), 2);
    assert!(outcome
        .report
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::DownloadError));
}

#[tokio::test]
async fn test_entity_selection_limits_worklist() {
    let db = init_memory_database().await.unwrap();
    seed_entity(&db, "amerob", "American Robin", &["https://x.test/robin.wav"]).await;
    seed_entity(&db, "norcar", "Northern Cardinal", &["https://x.test/cardinal.wav"]).await;
    let fetcher = UrlFetcher::new()
        .with_body("https://x.test/robin.wav", tone_wav(2500.0, 0.5))
        .with_body("https://x.test/cardinal.wav", tone_wav(4000.0, 0.5));

    let outcome = run_ingestion(
        &db,
        &settings(),
        Arc::new(fetcher),
        IngestionRequest {
            entity_ids: Some(vec!["norcar".to_string()]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.report.attempted, 1);
    let rows = feature_rows::load_feature_rows(&db, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity_id, "norcar");
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected_before_any_download() {
    let db = init_memory_database().await.unwrap();
    seed_entity(&db, "amerob", "American Robin", &["https://x.test/r.wav"]).await;
    let fetcher = Arc::new(UrlFetcher::new());

    let result = run_ingestion(&db, &settings(), fetcher.clone(), request(0)).await;

    assert!(result.is_err());
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_silent_recording_yields_finite_features() {
    let db = init_memory_database().await.unwrap();
    seed_entity(&db, "silent", "Silence", &["https://x.test/quiet.wav"]).await;
    let fetcher = UrlFetcher::new().with_body("https://x.test/quiet.wav", silent_wav(1.0));

    let outcome = run_ingestion(&db, &settings(), Arc::new(fetcher), request(1))
        .await
        .unwrap();
    assert_eq!(outcome.report.rows_written, 1);

    let rows = feature_rows::load_feature_rows(&db, None).await.unwrap();
    let assembled = assemble_all(&rows);
    assert_eq!(assembled.len(), 1);
    assert_eq!(assembled[0].vector.len(), 38);
    assert!(assembled[0].vector.iter().all(|v| v.is_finite()));
    assert!(assembled[0].zero_filled.is_empty());
}

#[tokio::test]
async fn test_second_row_for_recording_is_rejected() {
    let db = init_memory_database().await.unwrap();
    seed_entity(&db, "amerob", "American Robin", &["https://x.test/r.wav"]).await;
    let fetcher = UrlFetcher::new().with_body("https://x.test/r.wav", tone_wav(1800.0, 0.5));
    run_ingestion(&db, &settings(), Arc::new(fetcher), request(1))
        .await
        .unwrap();

    let existing = recordings::load_all_recordings(&db).await.unwrap();
    let duplicate = singbirds_ai::models::PendingFeatureRow::new(
        existing[0].recording_id.clone(),
        "amerob",
        singbirds_ai::models::AcousticFeatures {
            mfcc: [0.0; 13],
            chroma: [0.0; 12],
            spectral_bandwidth: 0.0,
            spectral_contrast: [0.0; 7],
            spectral_flatness: 0.0,
            rms_energy: 0.0,
            zero_crossing_rate: 0.0,
            spectral_centroid: 0.0,
            spectral_rolloff: 0.0,
        },
    );

    let err = feature_rows::insert_feature_rows(&db, &[duplicate])
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(feature_rows::count_feature_rows(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_deleting_recording_removes_its_features() {
    let db = init_memory_database().await.unwrap();
    let recs = seed_entity(&db, "amerob", "American Robin", &["https://x.test/r.wav"]).await;
    let fetcher = UrlFetcher::new().with_body("https://x.test/r.wav", tone_wav(1800.0, 0.5));
    run_ingestion(&db, &settings(), Arc::new(fetcher), request(1))
        .await
        .unwrap();
    assert_eq!(feature_rows::count_feature_rows(&db).await.unwrap(), 1);

    assert!(recordings::delete_recording(&db, &recs[0].recording_id)
        .await
        .unwrap());

    assert_eq!(feature_rows::count_feature_rows(&db).await.unwrap(), 0);
}
