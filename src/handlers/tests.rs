use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::db;
use crate::gateway::backend::mock::MockBackend;
use crate::gateway::InferenceError;
use crate::models::PredictionLog;
use crate::monitor::{MemoryScalarSink, StepCounter};
use crate::{create_router, AppState};

struct TestApp {
    router: Router,
    backend: Arc<MockBackend>,
    sink: Arc<MemoryScalarSink>,
    pool: sqlx::SqlitePool,
}

async fn app(backend: MockBackend) -> TestApp {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let backend = Arc::new(backend);
    let sink = Arc::new(MemoryScalarSink::new());
    let state = AppState::new(
        Config::default(),
        pool.clone(),
        backend.clone(),
        sink.clone(),
        StepCounter::new(),
    );

    TestApp {
        router: create_router(state),
        backend,
        sink,
        pool,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_valid_request_round_trip() {
    let app = app(MockBackend::fixed(0.7)).await;

    let (status, body) = send(&app.router, post_json(&json!({
        "instances": [vec![0.1; 33]],
        "true_class": 0
    })))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!(["Fraud"]));
    assert_eq!(body["probabilities"], json!([0.7]));
    assert!(body["latency"].as_f64().unwrap() >= 0.0);
    assert_eq!(app.backend.call_count(), 1);

    // Predicted Fraud against a true Not Fraud: accuracy 0 breaches 0.90
    let (status, alerts) = send(&app.router, get("/api/v1/alerts")).await;
    assert_eq!(status, StatusCode::OK);
    let accuracy: Vec<&Value> = alerts
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["metric"] == "accuracy")
        .collect();
    assert_eq!(accuracy.len(), 1);
    assert_eq!(accuracy[0]["value"], json!(0.0));

    let (_, actions) = send(&app.router, get("/api/v1/actions")).await;
    assert!(actions
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["action"] == "Flag model as degraded due to low accuracy."));

    let (_, latest) = send(&app.router, get("/api/v1/metrics/latest")).await;
    assert_eq!(latest["accuracy"], json!(0.0));
    assert_eq!(latest["num_samples"], json!(1));
    assert_eq!(latest["recall"], Value::Null);

    assert_eq!(app.sink.steps(), vec![0]);
}

#[tokio::test]
async fn test_missing_instances() {
    let app = app(MockBackend::fixed(0.9)).await;

    let (status, body) = send(&app.router, post_json(&json!({"true_class": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Missing 'instances'"));
    assert_eq!(body["status"], json!(400));
    assert_eq!(app.backend.call_count(), 0);
}

#[tokio::test]
async fn test_requires_json() {
    let app = app(MockBackend::fixed(0.9)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("notjson"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Request must be JSON"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(json!({"instances": [vec![0.1; 33]]}).to_string()))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Request must be JSON"));

    assert_eq!(app.backend.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_instances_are_rejected_before_inference() {
    let app = app(MockBackend::fixed(0.9)).await;

    let cases = [
        (json!({"instances": []}), "'instances' cannot be empty"),
        (json!({"instances": "row"}), "'instances' must be a list"),
        (json!({"instances": [[0.1, 0.2]]}), "expected 33"),
        (json!({"instances": [vec![0.1; 33]], "true_class": [0, 1]}), "'true_class'"),
        (json!([1, 2, 3]), "Invalid JSON payload"),
    ];

    for (payload, message) in cases {
        let (status, body) = send(&app.router, post_json(&payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert!(
            body["error"].as_str().unwrap().contains(message),
            "expected {:?} in {}",
            message,
            body
        );
    }

    assert_eq!(app.backend.call_count(), 0);
    assert_eq!(PredictionLog::counts(&app.pool).await.unwrap(), (0, 0));
}

#[tokio::test]
async fn test_inference_failure_logs_nothing() {
    let app = app(MockBackend::scripted(vec![Err(InferenceError::Status {
        status: 500,
        body: "model crashed".to_string(),
    })]))
    .await;

    let (status, body) = send(&app.router, post_json(&json!({
        "instances": [vec![0.1; 33]],
        "true_class": 1
    })))
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("model crashed"));
    assert_eq!(PredictionLog::counts(&app.pool).await.unwrap(), (0, 0));
    assert!(app.sink.scalars().is_empty());
}

#[tokio::test]
async fn test_unlabeled_batch_has_no_snapshot() {
    let app = app(MockBackend::scripted(vec![Ok(vec![0.2, 0.5, 0.95])])).await;

    let (status, body) = send(&app.router, post_json(&json!({
        "instances": [vec![0.0; 33], vec![1.0; 33], vec![2.0; 33]]
    })))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!(["Not Fraud", "Not Fraud", "Fraud"]));

    let (_, latest) = send(&app.router, get("/api/v1/metrics/latest")).await;
    assert_eq!(latest, Value::Null);

    let (_, summary) = send(&app.router, get("/api/v1/summary")).await;
    assert_eq!(summary["total_predictions"], json!(3));
    assert_eq!(summary["labeled_predictions"], json!(0));
    assert_eq!(summary["snapshots"], json!(0));
    assert_eq!(summary["alerts"], json!(0));
    assert_eq!(summary["next_step"], json!(0));

    let (_, logs) = send(&app.router, get("/api/v1/predictions?limit=2")).await;
    assert_eq!(logs.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health() {
    let app = app(MockBackend::fixed(0.1)).await;

    let (status, body) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["inference_backend"], "mock");
    assert_eq!(body["feature_count"], json!(33));
}
