//! # Service Task Handler
//!
//! Calls the downstream HTTP API behind a topic:
//!
//! ```text
//! POST {base_url}/{topic lower-cased}?taskId={id}
//! Ocp-Apim-Subscription-Key: <key>
//! Content-Type: application/json
//!
//! <mapper request body>
//! ```
//!
//! Only HTTP 200 counts as success. Exactly one request is made per task; retries
//! are driven by the engine through the failure report.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::TaskHandler;
use crate::constants::{SUBSCRIPTION_KEY_HEADER, TASK_ID_QUERY_PARAM};
use crate::error::{DispatcherError, DispatcherResult, HandlerError};
use crate::models::{LockedTask, Variables};
use crate::registry::MapperRegistry;

/// Downstream endpoint and credential
#[derive(Clone)]
pub struct ServiceHandlerSettings {
    pub base_url: String,
    pub subscription_key: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ServiceHandlerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandlerSettings")
            .field("base_url", &self.base_url)
            .field("subscription_key", &"[MASKED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Handler for service-type tasks
#[derive(Debug)]
pub struct ServiceTaskHandler {
    client: Client,
    base_url: Url,
    settings: ServiceHandlerSettings,
    mappers: Arc<MapperRegistry>,
}

impl ServiceTaskHandler {
    pub fn new(settings: ServiceHandlerSettings, mappers: Arc<MapperRegistry>) -> DispatcherResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            DispatcherError::configuration(format!(
                "Invalid service handler base URL '{}': {}",
                settings.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DispatcherError::configuration(format!(
                "Service handler base URL '{}' cannot carry a path",
                settings.base_url
            )));
        }

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| DispatcherError::configuration(format!("Failed to create HTTP client: {e}")))?;

        info!(
            base_url = %settings.base_url,
            timeout_ms = settings.request_timeout.as_millis() as u64,
            "Created ServiceTaskHandler"
        );

        Ok(Self {
            client,
            base_url,
            settings,
            mappers,
        })
    }

    /// `{base_url}/{topic lower-cased}?taskId={id}`
    ///
    /// The topic is one percent-encoded path segment; a query on the base URL is kept.
    pub fn request_uri(&self, task: &LockedTask) -> DispatcherResult<Url> {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| {
                DispatcherError::configuration(format!(
                    "Service handler base URL '{}' cannot carry a path",
                    self.settings.base_url
                ))
            })?
            .pop_if_empty()
            .push(&task.topic_name.to_lowercase());
        url.query_pairs_mut().append_pair(TASK_ID_QUERY_PARAM, &task.id);
        Ok(url)
    }
}

#[async_trait]
impl TaskHandler for ServiceTaskHandler {
    async fn handle(&self, task: &LockedTask) -> Result<Variables, HandlerError> {
        info!(task_id = %task.id, topic = %task.topic_name, "Handling service task");

        let mapper = match self.mappers.resolve_for_dispatch(&task.topic_name) {
            Ok(mapper) => mapper,
            Err(e) => {
                error!(
                    task_id = %task.id,
                    topic = %task.topic_name,
                    error = %e,
                    "Topic has no mapper; failing task without retries"
                );
                return Err(HandlerError::terminal(e.to_string()));
            }
        };

        let uri = self.request_uri(task)?;
        let body = mapper.build_request_body(task)?;
        debug!(task_id = %task.id, uri = %uri, mapper = %mapper.mapper_name(), "Invoking downstream API");

        let response = self
            .client
            .post(uri)
            .header(SUBSCRIPTION_KEY_HEADER, &self.settings.subscription_key)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(DispatcherError::from)?;

        let status = response.status();
        if status != StatusCode::OK {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            return Err(DispatcherError::invoke(status.as_u16(), reason).into());
        }

        let bytes = response.bytes().await.map_err(DispatcherError::from)?;
        Ok(mapper.parse_response(&bytes))
    }

    fn handler_name(&self) -> &'static str {
        "service"
    }
}
