//! Shared helpers for integration tests
#![allow(dead_code)]

pub mod downstream;
pub mod mock_engine;
pub mod strategies;

use async_trait::async_trait;
use external_task_dispatcher::config::DispatcherConfig;
use external_task_dispatcher::dispatcher::{Dispatcher, DispatcherSettings};
use external_task_dispatcher::error::DispatcherResult;
use external_task_dispatcher::handlers::MessageTaskHandler;
use external_task_dispatcher::registry::TopicRegistry;
use external_task_dispatcher::router::{RetryPolicy, TaskRouter};
use external_task_dispatcher::secrets::SecretStore;
use std::sync::Arc;

use mock_engine::MockEngine;

pub const TEST_WORKER_ID: &str = "ETD-test";

/// Configuration pointing the service handler at `base_url`
pub fn test_config(base_url: &str, topics: &[&str]) -> DispatcherConfig {
    let mut config = DispatcherConfig {
        worker_id: TEST_WORKER_ID.to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        ..DispatcherConfig::default()
    };
    config.service_handler.base_url = base_url.to_string();
    config.service_handler.subscription_key = "test-subscription-key".to_string();
    config.service_handler.request_timeout_ms = 5_000;
    config
}

/// Dispatcher over the mock engine with message handling only; service tasks
/// fail as unsupported
pub fn mock_dispatcher(engine: &MockEngine, topics: TopicRegistry) -> Dispatcher {
    let config = test_config("http://127.0.0.1:9/api", &[]);
    let router = TaskRouter::new(
        TEST_WORKER_ID,
        "Svc-",
        "Msg-",
        RetryPolicy::new(config.default_retries, config.retry_timeout_ms),
    )
    .with_message_handler(Arc::new(MessageTaskHandler));

    Dispatcher::new(
        Arc::new(engine.clone()),
        Arc::new(router),
        Arc::new(topics),
        DispatcherSettings::from(&config),
    )
}

pub fn static_topics(names: &[&str]) -> TopicRegistry {
    let names: Vec<String> = names.iter().map(|t| t.to_string()).collect();
    TopicRegistry::new(&names, false, std::time::Duration::from_secs(3_600))
}

/// Secret store that always returns the same value
pub struct StaticSecretStore(pub String);

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, _reference: &str) -> DispatcherResult<String> {
        Ok(self.0.clone())
    }
}
