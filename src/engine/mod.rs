//! # Workflow Engine Contract
//!
//! The dispatcher talks to the engine only through [`ExternalTaskEngine`], so the
//! dispatch loop can run against the REST client in production and against an
//! in-memory engine in tests.

pub mod rest_client;

use crate::error::DispatcherResult;
use crate::models::{CompletionResult, FailureReport, FetchAndLockRequest, LockedTask};
use async_trait::async_trait;

pub use rest_client::{EngineApiConfig, EngineRestClient};

/// Remote external-task API of the workflow engine
#[async_trait]
pub trait ExternalTaskEngine: Send + Sync {
    /// Long-poll for tasks on the requested topics and lock them for this worker
    async fn fetch_and_lock(&self, request: &FetchAndLockRequest) -> DispatcherResult<Vec<LockedTask>>;

    /// Mark a locked task as done and pass its output variables back
    async fn complete(&self, task_id: &str, completion: &CompletionResult) -> DispatcherResult<()>;

    /// Report a failed attempt with the remaining retry budget
    async fn report_failure(&self, task_id: &str, failure: &FailureReport) -> DispatcherResult<()>;

    /// Topic names of the external tasks currently known to the engine
    async fn active_topic_names(&self) -> DispatcherResult<Vec<String>>;
}
