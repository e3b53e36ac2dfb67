//! Local downstream API for service handler tests
//!
//! An axum server on `127.0.0.1:0` that answers every POST with a fixed status and
//! body and records what it received.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as seen by the downstream server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub task_id: Option<String>,
    pub subscription_key: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

struct DownstreamState {
    status: StatusCode,
    response: Value,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct DownstreamServer {
    pub base_url: String,
    state: Arc<DownstreamState>,
    handle: JoinHandle<()>,
}

impl DownstreamServer {
    /// Start a server answering every request with `status` and `response`
    pub async fn start(status: StatusCode, response: Value) -> Self {
        let state = Arc::new(DownstreamState {
            status,
            response,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/*path", post(record_and_respond))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

impl Drop for DownstreamServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_and_respond(
    State(state): State<Arc<DownstreamState>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().push(RecordedRequest {
        path: uri.path().to_string(),
        task_id: query.get("taskId").cloned(),
        subscription_key: header("ocp-apim-subscription-key"),
        content_type: header("content-type"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    (state.status, Json(state.response.clone()))
}
