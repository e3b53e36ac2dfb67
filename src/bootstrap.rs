//! # Dispatcher Bootstrap
//!
//! Asynchronous startup performed before the dispatch loop runs:
//!
//! ```text
//! DispatcherConfig
//!   -> credential (inline or secret store, bounded retries)
//!   -> engine client
//!   -> mapper registry (catalog + topic_mappers, verified for static topics)
//!   -> handlers -> router -> topic registry
//!   -> Dispatcher
//! ```
//!
//! Every error surfaced here is fatal for the process; once bootstrap succeeds the
//! loop itself has no fatal error path.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DispatcherConfig;
use crate::dispatcher::{Dispatcher, DispatcherSettings};
use crate::engine::{EngineApiConfig, EngineRestClient, ExternalTaskEngine};
use crate::error::DispatcherResult;
use crate::handlers::{MessageTaskHandler, ServiceHandlerSettings, ServiceTaskHandler};
use crate::models::TaskType;
use crate::registry::{MapperCatalog, MapperRegistry, TopicRegistry};
use crate::router::{RetryPolicy, TaskRouter};
use crate::secrets::{resolve_credential, HttpSecretStore, SecretStore};

/// A fully wired dispatcher plus the token that stops it
#[derive(Debug)]
pub struct DispatcherSystem {
    pub dispatcher: Arc<Dispatcher>,
    pub mappers: Arc<MapperRegistry>,
    shutdown: CancellationToken,
}

impl DispatcherSystem {
    /// Token observed by the dispatch loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request the loop to stop after the current iteration
    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            warn!("Dispatcher shutdown already requested");
            return;
        }
        info!("Dispatcher shutdown requested");
        self.shutdown.cancel();
    }

    /// Run the dispatch loop on the current task until stopped
    pub async fn run(&self) {
        self.dispatcher.run(self.shutdown.clone()).await;
    }

    /// Run the dispatch loop on a spawned task
    pub fn spawn(&self) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move { dispatcher.run(shutdown).await })
    }
}

/// Builds a [`DispatcherSystem`] from configuration
#[derive(Debug)]
pub struct DispatcherBootstrap;

impl DispatcherBootstrap {
    /// Production wiring: REST engine client, HTTP secret store, built-in mappers
    pub async fn bootstrap(config: DispatcherConfig) -> DispatcherResult<DispatcherSystem> {
        config.validate()?;

        let engine = EngineRestClient::new(EngineApiConfig {
            base_url: config.engine_url.clone(),
            timeout_ms: config.engine_timeout_ms,
            long_polling_timeout_ms: config.long_polling_timeout_ms,
        })?;
        let secret_store = HttpSecretStore::new(
            config.service_handler.secret_store_token.clone(),
            Duration::from_millis(config.service_handler.request_timeout_ms),
        )?;

        Self::bootstrap_with(
            config,
            Arc::new(engine),
            &MapperCatalog::with_builtin(),
            &secret_store,
        )
        .await
    }

    /// Wiring with injected engine, mapper catalog and secret store
    pub async fn bootstrap_with(
        config: DispatcherConfig,
        engine: Arc<dyn ExternalTaskEngine>,
        catalog: &MapperCatalog,
        secret_store: &dyn SecretStore,
    ) -> DispatcherResult<DispatcherSystem> {
        config.validate()?;
        info!(worker_id = %config.worker_id, "Bootstrapping dispatcher");

        let handler_config = &config.service_handler;
        let subscription_key = match &handler_config.subscription_key_secret_url {
            Some(reference) if !reference.is_empty() => {
                resolve_credential(
                    secret_store,
                    reference,
                    handler_config.secret_retrieval_attempts,
                    Duration::from_millis(handler_config.secret_retry_delay_ms),
                )
                .await?
            }
            _ => handler_config.subscription_key.clone(),
        };

        let mappers = Arc::new(MapperRegistry::from_config(
            catalog,
            &config.topic_mappers,
            config.require_topic_mappers,
        )?);

        let service_handler = ServiceTaskHandler::new(
            ServiceHandlerSettings {
                base_url: handler_config.base_url.clone(),
                subscription_key,
                request_timeout: Duration::from_millis(handler_config.request_timeout_ms),
            },
            mappers.clone(),
        )?;

        let mut router = TaskRouter::new(
            config.worker_id.clone(),
            config.service_task_prefix.clone(),
            config.message_task_prefix.clone(),
            RetryPolicy::new(config.default_retries, config.retry_timeout_ms),
        )
        .with_service_handler(Arc::new(service_handler));
        if config.message_tasks_enabled {
            router = router.with_message_handler(Arc::new(MessageTaskHandler));
        } else {
            info!("Message tasks disabled; they will be failed as unsupported");
        }

        // only service tasks go through a mapper
        let service_topics: Vec<String> = config
            .topics
            .iter()
            .filter(|topic| router.classify(topic) == TaskType::Service)
            .cloned()
            .collect();
        mappers.verify_topics(&service_topics)?;

        let topics = Arc::new(TopicRegistry::new(
            &config.topics,
            config.automatic_topic_discovery,
            config.topic_cache_invalidation_interval(),
        ));

        let dispatcher = Dispatcher::new(
            engine,
            Arc::new(router),
            topics,
            DispatcherSettings::from(&config),
        );

        info!(
            worker_id = %config.worker_id,
            static_topics = config.topics.len(),
            auto_discover = config.automatic_topic_discovery,
            mapped_topics = mappers.stats().registered_topics,
            "Dispatcher bootstrap complete"
        );

        Ok(DispatcherSystem {
            dispatcher: Arc::new(dispatcher),
            mappers,
            shutdown: CancellationToken::new(),
        })
    }
}
