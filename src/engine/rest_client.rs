//! # Engine REST Client
//!
//! HTTP client for the engine's external-task REST resources.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::ExternalTaskEngine;
use crate::constants::engine_paths;
use crate::error::{DispatcherError, DispatcherResult};
use crate::models::{
    CompletionResult, ExternalTaskSummary, FailureReport, FetchAndLockRequest, LockedTask,
};

/// Configuration for the engine REST client
#[derive(Debug, Clone)]
pub struct EngineApiConfig {
    /// Base URL of the engine REST API (e.g. "<http://camunda:8080/engine-rest>")
    pub base_url: String,
    /// Timeout for regular calls
    pub timeout_ms: u64,
    /// Long-poll timeout; fetch-and-lock calls get this on top of `timeout_ms`
    pub long_polling_timeout_ms: u64,
}

/// HTTP client for engine external-task operations
pub struct EngineRestClient {
    client: Client,
    base_url: Url,
    config: EngineApiConfig,
}

impl std::fmt::Debug for EngineRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRestClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout_ms", &self.config.timeout_ms)
            .field("long_polling_timeout_ms", &self.config.long_polling_timeout_ms)
            .finish()
    }
}

impl EngineRestClient {
    /// Create new engine client with the given configuration
    pub fn new(config: EngineApiConfig) -> DispatcherResult<Self> {
        // Url::join treats a base without trailing slash as a file and drops its last segment
        let normalized = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            DispatcherError::configuration(format!(
                "Invalid engine URL '{}': {}",
                config.base_url, e
            ))
        })?;

        let client = Client::builder()
            .user_agent(format!("external-task-dispatcher/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DispatcherError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            long_polling_timeout_ms = config.long_polling_timeout_ms,
            "Created EngineRestClient"
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn url(&self, path: &str) -> DispatcherResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| DispatcherError::engine(path, format!("Invalid URL: {e}")))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        url: Url,
        body: &B,
        timeout: Duration,
    ) -> DispatcherResult<Response> {
        debug!(operation = %operation, url = %url, "Calling engine");

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| DispatcherError::engine(operation, format!("Request failed: {e}")))?;

        Self::ensure_success(operation, response).await
    }

    async fn ensure_success(operation: &str, response: Response) -> DispatcherResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(DispatcherError::engine_status(
            operation,
            status.as_u16(),
            error_text,
        ))
    }

    async fn parse_json<T: DeserializeOwned>(operation: &str, response: Response) -> DispatcherResult<T> {
        response.json().await.map_err(|e| {
            DispatcherError::engine(operation, format!("Failed to parse response: {e}"))
        })
    }
}

#[async_trait]
impl ExternalTaskEngine for EngineRestClient {
    async fn fetch_and_lock(&self, request: &FetchAndLockRequest) -> DispatcherResult<Vec<LockedTask>> {
        let operation = "fetch_and_lock";
        let url = self.url(engine_paths::FETCH_AND_LOCK)?;
        let timeout = Duration::from_millis(request.async_response_timeout_ms) + self.request_timeout();

        let response = self.post_json(operation, url, request, timeout).await?;
        let tasks: Vec<LockedTask> = Self::parse_json(operation, response).await?;

        debug!(count = tasks.len(), "Fetched and locked tasks");
        Ok(tasks)
    }

    async fn complete(&self, task_id: &str, completion: &CompletionResult) -> DispatcherResult<()> {
        let url = self.url(&engine_paths::complete(task_id))?;
        self.post_json("complete", url, completion, self.request_timeout())
            .await?;
        Ok(())
    }

    async fn report_failure(&self, task_id: &str, failure: &FailureReport) -> DispatcherResult<()> {
        let url = self.url(&engine_paths::failure(task_id))?;
        self.post_json("report_failure", url, failure, self.request_timeout())
            .await?;
        Ok(())
    }

    async fn active_topic_names(&self) -> DispatcherResult<Vec<String>> {
        let operation = "query_external_tasks";
        let url = self.url(engine_paths::EXTERNAL_TASKS)?;

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| DispatcherError::engine(operation, format!("Request failed: {e}")))?;
        let response = Self::ensure_success(operation, response).await?;
        let tasks: Vec<ExternalTaskSummary> = Self::parse_json(operation, response).await?;

        Ok(tasks.into_iter().map(|task| task.topic_name).collect())
    }
}
