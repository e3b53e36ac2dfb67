//! Engine REST client against a local stand-in for the engine's external-task API

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use external_task_dispatcher::engine::{EngineApiConfig, EngineRestClient, ExternalTaskEngine};
use external_task_dispatcher::error::DispatcherError;
use external_task_dispatcher::models::{
    CompletionResult, FailureReport, FetchAndLockRequest, TopicDescriptor, Variables,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Default)]
struct EngineState {
    /// (path, body) of every POST received
    posts: Mutex<Vec<(String, Value)>>,
}

async fn fetch_and_lock(State(state): State<Arc<EngineState>>, Json(body): Json<Value>) -> Json<Value> {
    state
        .posts
        .lock()
        .push(("fetchAndLock".to_string(), body));
    Json(json!([{
        "id": "T1",
        "topicName": "Svc-Quote",
        "workerId": "ETD-test",
        "retries": null,
        "processInstanceId": "P1",
        "activityId": "QuoteTask",
        "variables": {"amount": {"value": 100, "type": "Integer", "valueInfo": {}}}
    }]))
}

async fn complete(
    State(state): State<Arc<EngineState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.posts.lock().push((format!("{id}/complete"), body));
    StatusCode::NO_CONTENT
}

async fn failure(
    State(state): State<Arc<EngineState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.posts.lock().push((format!("{id}/failure"), body));
    if id == "gone" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"type": "RestException", "message": "External task gone does not exist"})),
        );
    }
    (StatusCode::NO_CONTENT, Json(Value::Null))
}

async fn list_tasks() -> Json<Value> {
    Json(json!([
        {"id": "A", "topicName": "Svc-Quote"},
        {"id": "B", "topicName": "Msg-Notify"}
    ]))
}

async fn start_engine() -> (EngineRestClient, Arc<EngineState>) {
    let state = Arc::new(EngineState::default());
    let app = Router::new()
        .route("/engine-rest/external-task", get(list_tasks))
        .route("/engine-rest/external-task/fetchAndLock", post(fetch_and_lock))
        .route("/engine-rest/external-task/:id/complete", post(complete))
        .route("/engine-rest/external-task/:id/failure", post(failure))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = EngineRestClient::new(EngineApiConfig {
        base_url: format!("http://{addr}/engine-rest"),
        timeout_ms: 5_000,
        long_polling_timeout_ms: 1_000,
    })
    .unwrap();
    (client, state)
}

#[tokio::test]
async fn fetch_and_lock_sends_camunda_request_shape() {
    let (client, state) = start_engine().await;
    let request = FetchAndLockRequest {
        worker_id: "ETD-test".to_string(),
        max_tasks: 1,
        async_response_timeout_ms: 1_000,
        topics: vec![TopicDescriptor::new("Svc-Quote", 60_000)],
    };

    let tasks = client.fetch_and_lock(&request).await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "T1");
    assert_eq!(tasks[0].topic_name, "Svc-Quote");
    assert_eq!(tasks[0].retries_remaining, None);
    assert_eq!(tasks[0].variables["amount"].value, json!(100));

    let posts = state.posts.lock().clone();
    assert_eq!(
        posts[0].1,
        json!({
            "workerId": "ETD-test",
            "maxTasks": 1,
            "asyncResponseTimeout": 1000,
            "topics": [{"topicName": "Svc-Quote", "lockDuration": 60000}]
        })
    );
}

#[tokio::test]
async fn complete_and_failure_post_to_task_resources() {
    let (client, state) = start_engine().await;

    client
        .complete(
            "T1",
            &CompletionResult {
                worker_id: "ETD-test".to_string(),
                variables: Variables::new(),
            },
        )
        .await
        .unwrap();
    client
        .report_failure(
            "T2",
            &FailureReport {
                worker_id: "ETD-test".to_string(),
                error_message: "Invalid HTTP status-code 500: Internal Server Error".to_string(),
                error_details: "Invoke { status: 500 }".to_string(),
                retries_remaining: 4,
                retry_timeout_ms: 5_000,
            },
        )
        .await
        .unwrap();

    let posts = state.posts.lock().clone();
    assert_eq!(posts[0].0, "T1/complete");
    assert_eq!(posts[0].1, json!({"workerId": "ETD-test", "variables": {}}));
    assert_eq!(posts[1].0, "T2/failure");
    assert_eq!(
        posts[1].1,
        json!({
            "workerId": "ETD-test",
            "errorMessage": "Invalid HTTP status-code 500: Internal Server Error",
            "errorDetails": "Invoke { status: 500 }",
            "retries": 4,
            "retryTimeout": 5000
        })
    );
}

#[tokio::test]
async fn non_success_status_is_an_engine_status_error() {
    let (client, _state) = start_engine().await;

    let err = client
        .report_failure(
            "gone",
            &FailureReport {
                worker_id: "ETD-test".to_string(),
                error_message: "unknown task type".to_string(),
                error_details: String::new(),
                retries_remaining: 0,
                retry_timeout_ms: 0,
            },
        )
        .await
        .unwrap_err();

    match err {
        DispatcherError::EngineStatus { status, message, .. } => {
            assert_eq!(status, 404);
            assert!(message.contains("does not exist"));
        }
        other => panic!("expected EngineStatus, got {other}"),
    }
}

#[tokio::test]
async fn active_topic_names_come_from_task_query() {
    let (client, _state) = start_engine().await;

    let topics = client.active_topic_names().await.unwrap();

    assert_eq!(topics, vec!["Svc-Quote", "Msg-Notify"]);
}

#[tokio::test]
async fn unreachable_engine_is_a_recoverable_error() {
    let client = EngineRestClient::new(EngineApiConfig {
        base_url: "http://127.0.0.1:9/engine-rest".to_string(),
        timeout_ms: 1_000,
        long_polling_timeout_ms: 1_000,
    })
    .unwrap();

    let err = client.active_topic_names().await.unwrap_err();

    assert!(matches!(err, DispatcherError::Engine { .. }));
    assert!(err.is_recoverable());
}
