//! Router tests driven through `tower::ServiceExt::oneshot`

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{test_app_state, tone_wav, UrlFetcher};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use singbirds_ai::build_router;
use singbirds_ai::config::{BATCH_SIZE_SETTING, CONCURRENCY_SETTING};
use singbirds_common::db::get_setting;
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Post a raw body that may not be valid JSON
async fn send_text(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn register(app: &Router, entity_id: &str, url: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/recordings",
        Some(json!({ "entity_id": entity_id, "recording_url": url })),
    )
    .await
}

#[tokio::test]
async fn test_health_reports_module() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "singbirds-ai");
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_recording_registration_is_create_if_absent() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, _) = send(
        &app,
        "POST",
        "/entities",
        Some(json!({ "entity_id": "amerob", "display_name": "American Robin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (first_status, first) = register(&app, "amerob", "https://x.test/1.mp3").await;
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(first["created"], true);

    let (second_status, second) = register(&app, "amerob", "https://x.test/1.mp3").await;
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(
        first["recording"]["recording_id"],
        second["recording"]["recording_id"]
    );
}

#[tokio::test]
async fn test_recording_for_unknown_entity_is_404_and_recorded() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) = register(&app, "nobody", "https://x.test/1.mp3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert!(health["last_error"].as_str().unwrap().contains("nobody"));
}

#[tokio::test]
async fn test_ingestion_then_embedding_over_http() {
    let exports = tempfile::tempdir().unwrap();
    let fetcher = UrlFetcher::new()
        .with_body("https://x.test/a.wav", tone_wav(1200.0, 0.5))
        .with_body("https://x.test/b.wav", tone_wav(3600.0, 0.5))
        .with_body("https://x.test/c.wav", b"garbage".to_vec());
    let app = build_router(test_app_state(fetcher, exports.path()).await);

    send(
        &app,
        "POST",
        "/entities",
        Some(json!({ "entity_id": "norcar", "display_name": "Northern Cardinal" })),
    )
    .await;
    for url in ["https://x.test/a.wav", "https://x.test/b.wav", "https://x.test/c.wav"] {
        register(&app, "norcar", url).await;
    }

    let (status, report) = send(&app, "POST", "/ingestion/run", Some(json!({ "batch_size": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["attempted"], 3);
    assert_eq!(report["batches_written"], 1);
    assert_eq!(report["rows_written"], 2);
    assert_eq!(report["skipped_existing"], 0);
    assert_eq!(report["failures"][0]["kind"], "DecodeError");

    let (status, embedding) = send(
        &app,
        "POST",
        "/embedding/run",
        Some(json!({ "strategy": "nmds" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(embedding["strategy"], "nmds");
    assert_eq!(embedding["points"].as_array().unwrap().len(), 2);
    let path = embedding["document_path"].as_str().unwrap();
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn test_embedding_without_rows_is_422() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) = send(&app, "POST", "/embedding/run", Some(json!({ "strategy": "umap" }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_DATA");
}

#[tokio::test]
async fn test_zero_concurrency_is_400() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) =
        send(&app, "POST", "/ingestion/run", Some(json!({ "concurrency": 0 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_strategy_is_400_envelope() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) =
        send(&app, "POST", "/embedding/run", Some(json!({ "strategy": "tsne" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("tsne"));
}

#[tokio::test]
async fn test_cli_strategy_spelling_is_accepted_over_http() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) = send(
        &app,
        "POST",
        "/embedding/run",
        Some(json!({ "strategy": "graph-embedding" })),
    )
    .await;

    // Parsed fine; only the empty catalog stops it
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_DATA");
}

#[tokio::test]
async fn test_malformed_bodies_are_400_envelopes() {
    let exports = tempfile::tempdir().unwrap();
    let app = build_router(test_app_state(UrlFetcher::new(), exports.path()).await);

    let (status, body) = send_text(&app, "/ingestion/run", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "POST", "/ingestion/run", Some(json!({ "batch_size": "ten" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "POST", "/recordings", Some(json!({ "entity_id": "amerob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_ingestion_settings_are_persisted_and_applied() {
    let exports = tempfile::tempdir().unwrap();
    let state = test_app_state(UrlFetcher::new(), exports.path()).await;
    let db = state.db.clone();
    let live = state.settings.clone();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        "PUT",
        "/settings/ingestion",
        Some(json!({ "concurrency": 2, "batch_size": 7 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["concurrency"], 2);
    assert_eq!(body["batch_size"], 7);
    assert_eq!(get_setting(&db, CONCURRENCY_SETTING).await.unwrap().as_deref(), Some("2"));
    assert_eq!(get_setting(&db, BATCH_SIZE_SETTING).await.unwrap().as_deref(), Some("7"));

    let live = live.read().await;
    assert_eq!(live.concurrency, 2);
    assert_eq!(live.batch_size, 7);
}

#[tokio::test]
async fn test_zero_ingestion_setting_is_400_and_not_saved() {
    let exports = tempfile::tempdir().unwrap();
    let state = test_app_state(UrlFetcher::new(), exports.path()).await;
    let db = state.db.clone();
    let app = build_router(state);

    let (status, body) = send(
        &app,
        "PUT",
        "/settings/ingestion",
        Some(json!({ "concurrency": 0, "batch_size": 7 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(get_setting(&db, CONCURRENCY_SETTING).await.unwrap(), None);
}
