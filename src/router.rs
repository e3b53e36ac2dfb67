//! # Task Router
//!
//! Classifies a locked task by topic-name prefix and hands it to the handler for
//! its type. Every routed task leaves here as exactly one [`TaskOutcome`]:
//! handler errors are converted into a [`FailureReport`] and never escape.
//!
//! ## Retry budget
//!
//! | Failure | `retries` reported |
//! |---|---|
//! | Terminal (unknown or unsupported type) | `0` |
//! | Retryable, engine reported `R` | `max(R - 1, 0)` |
//! | Retryable, engine reported nothing | `default_retries - 1` |

use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::failure_messages;
use crate::error::HandlerError;
use crate::handlers::TaskHandler;
use crate::models::{CompletionResult, FailureReport, LockedTask, TaskType};

/// How failed tasks are rescheduled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub default_retries: i32,
    pub retry_timeout_ms: i64,
}

impl RetryPolicy {
    pub fn new(default_retries: i32, retry_timeout_ms: i64) -> Self {
        Self {
            default_retries,
            retry_timeout_ms,
        }
    }

    /// Retries left after one more failed attempt
    pub fn remaining_after_failure(&self, prior: Option<i32>) -> i32 {
        prior.unwrap_or(self.default_retries).saturating_sub(1).max(0)
    }
}

/// Result of routing one task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed(CompletionResult),
    Failed(FailureReport),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// Prefix classification plus delegation to the per-type handler
pub struct TaskRouter {
    worker_id: String,
    service_prefix: String,
    message_prefix: String,
    retry_policy: RetryPolicy,
    service_handler: Option<Arc<dyn TaskHandler>>,
    message_handler: Option<Arc<dyn TaskHandler>>,
}

impl std::fmt::Debug for TaskRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRouter")
            .field("worker_id", &self.worker_id)
            .field("service_prefix", &self.service_prefix)
            .field("message_prefix", &self.message_prefix)
            .field("retry_policy", &self.retry_policy)
            .field(
                "service_handler",
                &self.service_handler.as_ref().map(|h| h.handler_name()),
            )
            .field(
                "message_handler",
                &self.message_handler.as_ref().map(|h| h.handler_name()),
            )
            .finish()
    }
}

impl TaskRouter {
    /// Router with no handlers registered; tasks of every type fail terminally
    pub fn new(
        worker_id: impl Into<String>,
        service_prefix: impl Into<String>,
        message_prefix: impl Into<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            service_prefix: service_prefix.into(),
            message_prefix: message_prefix.into(),
            retry_policy,
            service_handler: None,
            message_handler: None,
        }
    }

    pub fn with_service_handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.service_handler = Some(handler);
        self
    }

    pub fn with_message_handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.message_handler = Some(handler);
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Longest matching prefix wins, Service on a tie; no match is `Unknown`
    pub fn classify(&self, topic_name: &str) -> TaskType {
        [
            (self.service_prefix.as_str(), TaskType::Service),
            (self.message_prefix.as_str(), TaskType::Message),
        ]
        .into_iter()
        .filter(|(prefix, _)| !prefix.is_empty() && topic_name.starts_with(prefix))
        .max_by_key(|(prefix, task_type)| (prefix.len(), *task_type == TaskType::Service))
        .map(|(_, task_type)| task_type)
        .unwrap_or(TaskType::Unknown)
    }

    /// Route a task to its handler and turn the result into an outcome
    pub async fn route(&self, task: &LockedTask) -> TaskOutcome {
        let task_type = self.classify(&task.topic_name);
        debug!(task_id = %task.id, topic = %task.topic_name, task_type = %task_type, "Routing task");

        let handler = match task_type {
            TaskType::Service => self.service_handler.as_ref(),
            TaskType::Message => self.message_handler.as_ref(),
            TaskType::Unknown => {
                warn!(task_id = %task.id, topic = %task.topic_name, "Topic matches no task type prefix");
                return TaskOutcome::Failed(
                    self.failure_report(task, &HandlerError::terminal(failure_messages::UNKNOWN_TASK_TYPE)),
                );
            }
        };

        let Some(handler) = handler else {
            warn!(task_id = %task.id, topic = %task.topic_name, task_type = %task_type, "No handler for task type");
            return TaskOutcome::Failed(self.failure_report(
                task,
                &HandlerError::terminal(failure_messages::unsupported_task_type(task_type)),
            ));
        };

        match handler.handle(task).await {
            Ok(variables) => TaskOutcome::Completed(CompletionResult {
                worker_id: self.worker_id.clone(),
                variables,
            }),
            Err(e) => {
                warn!(
                    task_id = %task.id,
                    topic = %task.topic_name,
                    handler = handler.handler_name(),
                    terminal = e.is_terminal(),
                    error = %e,
                    "Task handler failed"
                );
                TaskOutcome::Failed(self.failure_report(task, &e))
            }
        }
    }

    /// Failure report for `task`; terminal errors zero the retry budget
    pub fn failure_report(&self, task: &LockedTask, error: &HandlerError) -> FailureReport {
        let retries_remaining = if error.is_terminal() {
            0
        } else {
            self.retry_policy.remaining_after_failure(task.retries_remaining)
        };

        FailureReport {
            worker_id: self.worker_id.clone(),
            error_message: error.reason().to_string(),
            error_details: error.details().to_string(),
            retries_remaining,
            retry_timeout_ms: self.retry_policy.retry_timeout_ms,
        }
    }
}
