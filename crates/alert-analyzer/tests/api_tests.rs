//! HTTP surface tests driven through the router without a socket

mod common;

use alert_analyzer::processing::{ProcessOutcome, Processor};
use alert_analyzer::server::{build_router, state::AppState, AnalyzerServer};
use alert_analyzer::{AnalyzerConfig, ItemKey, QueueItem, QueueService};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::alert_json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct NoopProcessor;

#[async_trait]
impl Processor for NoopProcessor {
    async fn process(&self, _item: &QueueItem) -> ProcessOutcome {
        ProcessOutcome::Success { artifact: None }
    }
}

fn setup(dir: &TempDir) -> (Router, Arc<QueueService>) {
    let mut config = AnalyzerConfig::default();
    config.queue.mirror_path = dir.path().join("pending_queue.json");
    config.storage.data_dir = dir.path().join("Data");

    let queue = Arc::new(QueueService::new(config.queue.mirror_path.clone()));
    queue.initialize();
    let state = AppState::from_parts(config, Arc::clone(&queue), Arc::new(NoopProcessor), None);
    (build_router(state), queue)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_webhook(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup(&dir);

    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "OK", "message": "Webhook Processor is running"})
    );
}

#[tokio::test]
async fn test_batch_is_accepted_and_mirrored() {
    let dir = TempDir::new().unwrap();
    let (app, queue) = setup(&dir);

    let batch = json!([alert_json("S1", 1), alert_json("S1", 2)]);
    let (status, body) = send(&app, post_webhook(&batch)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "2 item(s) accepted and queued for processing.");
    assert_eq!(body["accepted"], 2);

    let stats = queue.stats();
    assert_eq!(stats.queued, 2);
    assert_eq!(stats.pending_on_disk, 2);

    let on_disk: Vec<Value> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("pending_queue.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk.len(), 2);
    assert_eq!(on_disk[0]["sid"], "S1");
    assert_eq!(on_disk[0]["queue_number"], 1);
    assert_eq!(on_disk[1]["queue_number"], 2);
    assert!(on_disk[1]["received_at"].is_string());
}

#[tokio::test]
async fn test_single_object_is_accepted() {
    let dir = TempDir::new().unwrap();
    let (app, queue) = setup(&dir);

    let (status, body) = send(&app, post_webhook(&alert_json("S4", 7))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "1 item(s) accepted and queued for processing.");
    assert_eq!(
        queue.mirror().snapshot()[0].key(),
        ItemKey::new("S4", 7)
    );
}

#[tokio::test]
async fn test_invalid_batch_is_rejected_whole() {
    let dir = TempDir::new().unwrap();
    let (app, queue) = setup(&dir);

    let mut broken = alert_json("S1", 2);
    broken.as_object_mut().unwrap().remove("row_number");
    let batch = json!([alert_json("S1", 1), broken]);

    let (status, body) = send(&app, post_webhook(&batch)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("item 1"));
    assert_eq!(queue.stats().queued, 0);
    assert!(queue.mirror().is_empty());
    assert!(!dir.path().join("pending_queue.json").exists());
}

#[tokio::test]
async fn test_path_like_sid_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, queue) = setup(&dir);

    let (status, _) = send(&app, post_webhook(&alert_json("../etc", 1))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(queue.stats().queued, 0);
}

#[tokio::test]
async fn test_non_json_body_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, queue) = setup(&dir);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(queue.stats().queued, 0);
}

#[tokio::test]
async fn test_queue_status_lists_pending_items() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup(&dir);

    send(&app, post_webhook(&json!([alert_json("S2", 5), alert_json("S3", 1)]))).await;
    let (status, body) = send(&app, get("/api/v1/queue")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], 2);
    assert_eq!(body["in_flight"], 0);
    assert_eq!(body["pending_on_disk"], 2);
    assert_eq!(body["pending"][0]["sid"], "S2");
    assert_eq!(body["pending"][0]["row_number"], 5);
    assert_eq!(body["pending"][1]["queue_number"], 2);
}

#[tokio::test]
async fn test_info_and_readiness() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup(&dir);

    let (status, body) = send(&app, get("/api/v1/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "alert-analyzer");
    assert!(body["model"].is_null());

    let (status, _) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_server_stops_on_signal() {
    let dir = TempDir::new().unwrap();
    let mut config = AnalyzerConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.queue.mirror_path = dir.path().join("pending_queue.json");
    config.storage.data_dir = dir.path().join("Data");

    let server = AnalyzerServer::new(config).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.start_with_shutdown(async move {
        let _ = rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("server should stop after the signal")
        .unwrap()
        .unwrap();
}
