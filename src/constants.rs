//! # Dispatcher Constants
//!
//! Defaults and fixed wire-level names shared by the configuration model,
//! the engine client and the service handler.

/// Default topic-name prefix identifying Service tasks
pub const DEFAULT_SERVICE_TASK_PREFIX: &str = "Svc-";

/// Default topic-name prefix identifying Message tasks
pub const DEFAULT_MESSAGE_TASK_PREFIX: &str = "Msg-";

/// Base name of the worker identity when none is configured
pub const DEFAULT_WORKER_ID: &str = "ETD";

pub const DEFAULT_ENGINE_URL: &str = "http://camunda:8080/engine-rest";

/// Tasks requested per fetch-and-lock call; the dispatcher processes one task at a time
pub const MAX_TASKS_PER_FETCH: u32 = 1;

/// Retry ceiling used when the engine reports no remaining retries for a task
pub const DEFAULT_RETRIES: i32 = 5;

pub const DEFAULT_RETRY_TIMEOUT_MS: i64 = 5_000;

pub const DEFAULT_LONG_POLLING_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_TASK_LOCK_DURATION_MS: i64 = 60_000;

pub const DEFAULT_TOPIC_CACHE_INVALIDATION_INTERVAL_MS: u64 = 60 * 60 * 1_000;

/// Wait applied when there are no topics to fetch for
pub const EMPTY_TOPICS_WAIT_MS: u64 = 10_000;

/// Two loop-level errors closer together than this count as a fast failure
pub const FAST_FAILURE_WINDOW_MS: u64 = 1_000;

/// Backoff applied after a fast failure
pub const FAST_FAILURE_BACKOFF_MS: u64 = 10_000;

pub const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_DOWNSTREAM_TIMEOUT_MS: u64 = 100_000;

pub const DEFAULT_SECRET_ATTEMPTS: u32 = 5;

pub const DEFAULT_SECRET_RETRY_DELAY_MS: u64 = 500;

/// Header carrying the downstream API subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Query parameter carrying the task id on downstream requests
pub const TASK_ID_QUERY_PARAM: &str = "taskId";

/// Name of the mapper every topic falls back to
pub const IDENTITY_MAPPER: &str = "identity";

/// Engine REST resource paths, relative to the engine base URL
pub mod engine_paths {
    pub const FETCH_AND_LOCK: &str = "external-task/fetchAndLock";
    pub const EXTERNAL_TASKS: &str = "external-task";

    pub fn complete(task_id: &str) -> String {
        format!("external-task/{task_id}/complete")
    }

    pub fn failure(task_id: &str) -> String {
        format!("external-task/{task_id}/failure")
    }
}

/// Error messages reported to the engine for terminal failures
pub mod failure_messages {
    pub const UNKNOWN_TASK_TYPE: &str = "unknown task type";

    pub fn unsupported_task_type(task_type: impl std::fmt::Display) -> String {
        format!("unsupported task type '{task_type}'")
    }
}
