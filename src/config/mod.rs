//! # Dispatcher Configuration
//!
//! Configuration model for the dispatcher and its service handler.
//!
//! ## Sources
//!
//! Values are layered by [`ConfigManager`]: built-in defaults, then an optional TOML
//! file, then `DISPATCHER_*` environment variables (nested keys use `__`).
//!
//! ```toml
//! worker_id = "ETD"
//! engine_url = "http://camunda:8080/engine-rest"
//! topics = ["Svc-Quote"]
//! automatic_topic_discovery = true
//!
//! [service_handler]
//! base_url = "https://apim.example.com/process"
//! subscription_key_secret_url = "https://vault.example.com/secrets/APIMKey"
//!
//! [[topic_mappers]]
//! topic = "Svc-Quote"
//! mapper = "identity"
//! ```

pub mod loader;

use crate::constants;
use crate::error::{DispatcherError, DispatcherResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub use loader::ConfigManager;

/// Root dispatcher configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Worker identity presented to the engine
    pub worker_id: String,
    /// Engine REST API base URL
    pub engine_url: String,
    /// Timeout for non-polling engine calls, also added on top of the long-poll timeout
    pub engine_timeout_ms: u64,
    /// Statically configured topics
    pub topics: Vec<String>,
    pub automatic_topic_discovery: bool,
    /// Long-poll timeout passed to fetch-and-lock
    pub long_polling_timeout_ms: u64,
    pub task_lock_duration_ms: i64,
    pub topic_cache_invalidation_interval_ms: u64,
    pub service_task_prefix: String,
    pub message_task_prefix: String,
    /// When false, Message tasks are failed as unsupported
    pub message_tasks_enabled: bool,
    /// Retry ceiling used when the engine reports none for a task
    pub default_retries: i32,
    pub retry_timeout_ms: i64,
    pub empty_topics_wait_ms: u64,
    pub fast_failure_window_ms: u64,
    pub fast_failure_backoff_ms: u64,
    /// Topic name -> mapper catalog name
    pub topic_mappers: Vec<TopicMapping>,
    /// Every static topic must have an explicitly registered mapper
    pub require_topic_mappers: bool,
    pub service_handler: ServiceHandlerConfig,
}

/// Binds a topic to a mapper from the catalog.
///
/// A list of entries rather than a table keyed by topic, so topic names keep
/// their case through every configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicMapping {
    pub topic: String,
    pub mapper: String,
}

impl TopicMapping {
    pub fn new(topic: impl Into<String>, mapper: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            mapper: mapper.into(),
        }
    }
}

/// Downstream API settings for the service handler
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceHandlerConfig {
    pub base_url: String,
    /// Inline subscription key, used when no secret reference is configured
    pub subscription_key: String,
    /// Secret store reference for the subscription key
    pub subscription_key_secret_url: Option<String>,
    /// Bearer token for the secret store
    pub secret_store_token: Option<String>,
    pub request_timeout_ms: u64,
    pub secret_retrieval_attempts: u32,
    pub secret_retry_delay_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_id: constants::DEFAULT_WORKER_ID.to_string(),
            engine_url: constants::DEFAULT_ENGINE_URL.to_string(),
            engine_timeout_ms: constants::DEFAULT_ENGINE_TIMEOUT_MS,
            topics: Vec::new(),
            automatic_topic_discovery: false,
            long_polling_timeout_ms: constants::DEFAULT_LONG_POLLING_TIMEOUT_MS,
            task_lock_duration_ms: constants::DEFAULT_TASK_LOCK_DURATION_MS,
            topic_cache_invalidation_interval_ms:
                constants::DEFAULT_TOPIC_CACHE_INVALIDATION_INTERVAL_MS,
            service_task_prefix: constants::DEFAULT_SERVICE_TASK_PREFIX.to_string(),
            message_task_prefix: constants::DEFAULT_MESSAGE_TASK_PREFIX.to_string(),
            message_tasks_enabled: true,
            default_retries: constants::DEFAULT_RETRIES,
            retry_timeout_ms: constants::DEFAULT_RETRY_TIMEOUT_MS,
            empty_topics_wait_ms: constants::EMPTY_TOPICS_WAIT_MS,
            fast_failure_window_ms: constants::FAST_FAILURE_WINDOW_MS,
            fast_failure_backoff_ms: constants::FAST_FAILURE_BACKOFF_MS,
            topic_mappers: Vec::new(),
            require_topic_mappers: false,
            service_handler: ServiceHandlerConfig::default(),
        }
    }
}

impl Default for ServiceHandlerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            subscription_key: String::new(),
            subscription_key_secret_url: None,
            secret_store_token: None,
            request_timeout_ms: constants::DEFAULT_DOWNSTREAM_TIMEOUT_MS,
            secret_retrieval_attempts: constants::DEFAULT_SECRET_ATTEMPTS,
            secret_retry_delay_ms: constants::DEFAULT_SECRET_RETRY_DELAY_MS,
        }
    }
}

impl DispatcherConfig {
    /// Validate the configuration before anything is started
    pub fn validate(&self) -> DispatcherResult<()> {
        if self.worker_id.trim().is_empty() {
            return Err(DispatcherError::configuration("worker_id must not be empty"));
        }

        validate_url("engine_url", &self.engine_url)?;
        validate_url("service_handler.base_url", &self.service_handler.base_url)?;
        if let Some(secret_url) = &self.service_handler.subscription_key_secret_url {
            validate_url("service_handler.subscription_key_secret_url", secret_url)?;
        }

        if self.service_task_prefix.is_empty() || self.message_task_prefix.is_empty() {
            return Err(DispatcherError::configuration(
                "task type prefixes must not be empty",
            ));
        }
        if self.service_task_prefix == self.message_task_prefix {
            return Err(DispatcherError::configuration(format!(
                "service_task_prefix and message_task_prefix must differ, both are '{}'",
                self.service_task_prefix
            )));
        }
        if self.task_lock_duration_ms <= 0 {
            return Err(DispatcherError::configuration(format!(
                "task_lock_duration_ms must be positive, got {}",
                self.task_lock_duration_ms
            )));
        }
        if self.default_retries <= 0 {
            return Err(DispatcherError::configuration(format!(
                "default_retries must be positive, got {}",
                self.default_retries
            )));
        }
        if self.retry_timeout_ms < 0 {
            return Err(DispatcherError::configuration(
                "retry_timeout_ms must not be negative",
            ));
        }
        if self.automatic_topic_discovery && self.topic_cache_invalidation_interval_ms == 0 {
            return Err(DispatcherError::configuration(
                "topic_cache_invalidation_interval_ms must be positive when automatic topic discovery is enabled",
            ));
        }
        if self.service_handler.secret_retrieval_attempts == 0 {
            return Err(DispatcherError::configuration(
                "service_handler.secret_retrieval_attempts must be at least 1",
            ));
        }

        if self.topics.is_empty() && !self.automatic_topic_discovery {
            warn!("No topics configured and automatic topic discovery is disabled; the dispatcher will idle");
        }

        Ok(())
    }

    /// Replace the configured worker id with `<base>-<unique suffix>`.
    ///
    /// Several replicas sharing one configuration then still present distinct
    /// identities to the engine.
    #[must_use]
    pub fn with_unique_worker_id(mut self) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.worker_id = format!("{}-{}", self.worker_id, suffix);
        self
    }

    pub fn topic_cache_invalidation_interval(&self) -> Duration {
        Duration::from_millis(self.topic_cache_invalidation_interval_ms)
    }

    pub fn empty_topics_wait(&self) -> Duration {
        Duration::from_millis(self.empty_topics_wait_ms)
    }

    pub fn fast_failure_window(&self) -> Duration {
        Duration::from_millis(self.fast_failure_window_ms)
    }

    pub fn fast_failure_backoff(&self) -> Duration {
        Duration::from_millis(self.fast_failure_backoff_ms)
    }
}

fn validate_url(field: &str, value: &str) -> DispatcherResult<()> {
    if value.trim().is_empty() {
        return Err(DispatcherError::configuration(format!(
            "{field} must not be empty"
        )));
    }
    Url::parse(value).map_err(|e| {
        DispatcherError::configuration(format!("Invalid {field} '{value}': {e}"))
    })?;
    Ok(())
}
