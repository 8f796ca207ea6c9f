//! HTTP trigger surface tests, driven through the router without a listener.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use farm_orchestrator::config::PipelineConfig;
use farm_orchestrator::models::Farm;
use farm_orchestrator::orchestration::{ExternalTaskLauncher, PipelineCoordinator};
use farm_orchestrator::registry::InMemoryFarmStore;
use farm_orchestrator::web::{self, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(store: Arc<InMemoryFarmStore>) -> Router {
    let coordinator = Arc::new(PipelineCoordinator::new(
        store.clone(),
        Arc::new(RecordingAggregation::new()),
        &PipelineConfig::default(),
    ));
    let launcher = Arc::new(ExternalTaskLauncher::new(
        store.clone(),
        store,
        manual_config("true", "etl/farm_etl.py"),
    ));
    web::app(AppState::new(coordinator, launcher))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(three_farm_store());

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_pipeline_run_is_accepted_and_archived() {
    let app = test_app(three_farm_store());

    let (status, body) = send(
        &app,
        post_json("/v1/pipeline/runs", json!({"period_kind": "WEEK"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["period_kind"], "WEEK");
    let run_id = body["run_id"].as_str().unwrap().to_string();

    let mut archived = Value::Null;
    for _ in 0..50 {
        let (status, body) = send(&app, get(&format!("/v1/pipeline/runs/{run_id}"))).await;
        if status == StatusCode::OK {
            archived = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(archived["state"], "DONE");
    assert_eq!(archived["target_count"], 3);

    let (status, runs) = send(&app, get("/v1/pipeline/runs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_period_kind_is_rejected() {
    let app = test_app(three_farm_store());

    let (status, _) = send(
        &app,
        post_json("/v1/pipeline/runs", json!({"period_kind": "YEAR"})),
    )
    .await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let app = test_app(three_farm_store());

    let (status, body) = send(
        &app,
        get(&format!("/v1/pipeline/runs/{}", uuid::Uuid::new_v4())),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_manual_task_is_accepted_with_task_id() {
    let store = Arc::new(InMemoryFarmStore::new());
    store.insert_farm(Farm::new(99, "Manual Farm"));
    let app = test_app(store.clone());

    let (status, body) = send(
        &app,
        post_json(
            "/v1/manual/tasks",
            json!({"entity_id": 99, "date_from": "20251215", "date_to": "20251221"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["entity_id"], 99);
    assert!(body["task_id"].as_str().unwrap().starts_with("manual_99_"));
    assert_eq!(store.upsert_calls(), 1);

    let (status, tasks) = send(&app, get("/v1/manual/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tasks.is_array());
}

#[tokio::test]
async fn test_manual_task_rejections_map_to_status_codes() {
    let store = Arc::new(InMemoryFarmStore::new());
    store.insert_farm(Farm::new(1, "Known"));
    let app = test_app(store.clone());

    let (status, body) = send(
        &app,
        post_json("/v1/manual/tasks", json!({"entity_id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        post_json(
            "/v1/manual/tasks",
            json!({"entity_id": 1, "date_from": "2025-12-15"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    store.set_storage_unavailable(true);
    let (status, body) = send(
        &app,
        post_json("/v1/manual/tasks", json!({"entity_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}
