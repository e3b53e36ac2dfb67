//! # Dispatch Loop
//!
//! The top-level control loop of the worker.
//!
//! ```text
//! Idle -> Discovering -> Fetching -> Dispatching (per task) -> Idle
//!   \__________________ BackingOff (on loop-level error) ______/
//! ```
//!
//! Iterations run strictly one after another and at most one task is requested per
//! fetch, so the downstream API never sees more than one in-flight request from this
//! worker. Discovery and fetch errors are caught here and never end the loop; the
//! only exit is the shutdown token, checked at the top of every iteration. Waits
//! (empty topic set, fast-failure backoff) end early on shutdown; remote calls
//! already in flight run to completion.

mod fast_failure;

pub use fast_failure::FastFailureDetector;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::constants::MAX_TASKS_PER_FETCH;
use crate::engine::ExternalTaskEngine;
use crate::error::{DispatcherResult, HandlerError};
use crate::logging::{log_error, log_task_operation};
use crate::models::{FailureReport, FetchAndLockRequest, LockedTask};
use crate::registry::TopicRegistry;
use crate::router::{TaskOutcome, TaskRouter};

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Discovering,
    Fetching,
    Dispatching,
    BackingOff,
}

/// What one loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Topic set was empty; no fetch was issued
    NoTopics,
    /// Fetch issued; this many tasks were dispatched
    Dispatched(usize),
}

/// Loop timing and fetch parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherSettings {
    pub worker_id: String,
    pub max_tasks: u32,
    pub long_polling_timeout_ms: u64,
    pub task_lock_duration_ms: i64,
    pub empty_topics_wait: Duration,
    pub fast_failure_window: Duration,
    pub fast_failure_backoff: Duration,
}

impl From<&DispatcherConfig> for DispatcherSettings {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            worker_id: config.worker_id.clone(),
            max_tasks: MAX_TASKS_PER_FETCH,
            long_polling_timeout_ms: config.long_polling_timeout_ms,
            task_lock_duration_ms: config.task_lock_duration_ms,
            empty_topics_wait: config.empty_topics_wait(),
            fast_failure_window: config.fast_failure_window(),
            fast_failure_backoff: config.fast_failure_backoff(),
        }
    }
}

#[derive(Debug, Default)]
struct DispatchStats {
    iterations: AtomicU64,
    tasks_fetched: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    failure_reports_lost: AtomicU64,
    loop_errors: AtomicU64,
    backoffs: AtomicU64,
}

/// Point-in-time copy of the loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub iterations: u64,
    pub tasks_fetched: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub failure_reports_lost: u64,
    pub loop_errors: u64,
    pub backoffs: u64,
}

/// Long-polling dispatcher driving tasks from the engine through the router
pub struct Dispatcher {
    engine: Arc<dyn ExternalTaskEngine>,
    router: Arc<TaskRouter>,
    topics: Arc<TopicRegistry>,
    settings: DispatcherSettings,
    fast_failure: Mutex<FastFailureDetector>,
    state: Mutex<DispatchState>,
    stats: DispatchStats,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .field("router", &self.router)
            .field("topics", &self.topics)
            .field("state", &self.state())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        engine: Arc<dyn ExternalTaskEngine>,
        router: Arc<TaskRouter>,
        topics: Arc<TopicRegistry>,
        settings: DispatcherSettings,
    ) -> Self {
        let fast_failure = FastFailureDetector::new(settings.fast_failure_window, settings.fast_failure_backoff);
        Self {
            engine,
            router,
            topics,
            settings,
            fast_failure: Mutex::new(fast_failure),
            state: Mutex::new(DispatchState::Idle),
            stats: DispatchStats::default(),
        }
    }

    pub fn state(&self) -> DispatchState {
        *self.state.lock()
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn topics(&self) -> &Arc<TopicRegistry> {
        &self.topics
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            iterations: self.stats.iterations.load(Ordering::Relaxed),
            tasks_fetched: self.stats.tasks_fetched.load(Ordering::Relaxed),
            tasks_completed: self.stats.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.stats.tasks_failed.load(Ordering::Relaxed),
            failure_reports_lost: self.stats.failure_reports_lost.load(Ordering::Relaxed),
            loop_errors: self.stats.loop_errors.load(Ordering::Relaxed),
            backoffs: self.stats.backoffs.load(Ordering::Relaxed),
        }
    }

    fn set_state(&self, state: DispatchState) {
        *self.state.lock() = state;
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            worker_id = %self.settings.worker_id,
            topics = ?self.topics.current_topics(),
            auto_discover = self.topics.auto_discover(),
            "Dispatch loop starting"
        );

        while !shutdown.is_cancelled() {
            match self.run_iteration().await {
                Ok(IterationOutcome::NoTopics) => {
                    debug!(
                        wait_ms = self.settings.empty_topics_wait.as_millis() as u64,
                        "No topics known to fetch and lock, waiting"
                    );
                    Self::wait_or_shutdown(self.settings.empty_topics_wait, &shutdown).await;
                }
                Ok(IterationOutcome::Dispatched(count)) => {
                    debug!(count = count, "Iteration complete");
                }
                Err(e) => self.handle_loop_error(e, &shutdown).await,
            }
            self.set_state(DispatchState::Idle);
        }

        info!(
            worker_id = %self.settings.worker_id,
            stats = ?self.stats(),
            "Dispatch loop stopped"
        );
    }

    /// One pass: refresh topics, fetch, dispatch.
    ///
    /// Errors returned here are loop-level (discovery or fetch); task failures are
    /// reported to the engine and never surface.
    pub async fn run_iteration(&self) -> DispatcherResult<IterationOutcome> {
        self.stats.iterations.fetch_add(1, Ordering::Relaxed);

        if self.topics.auto_discover() {
            self.set_state(DispatchState::Discovering);
            self.refresh_topics().await?;
        }

        let topics = self.topics.descriptors(self.settings.task_lock_duration_ms);
        if topics.is_empty() {
            return Ok(IterationOutcome::NoTopics);
        }

        self.set_state(DispatchState::Fetching);
        let request = FetchAndLockRequest {
            worker_id: self.settings.worker_id.clone(),
            max_tasks: self.settings.max_tasks,
            async_response_timeout_ms: self.settings.long_polling_timeout_ms,
            topics,
        };
        debug!(topics = request.topics.len(), "Start fetch and lock");
        let tasks = self.engine.fetch_and_lock(&request).await?;
        debug!(count = tasks.len(), "Fetched tasks");
        self.stats.tasks_fetched.fetch_add(tasks.len() as u64, Ordering::Relaxed);

        self.set_state(DispatchState::Dispatching);
        for task in &tasks {
            self.dispatch_task(task).await;
        }

        Ok(IterationOutcome::Dispatched(tasks.len()))
    }

    async fn refresh_topics(&self) -> DispatcherResult<()> {
        if self.topics.maybe_invalidate(Instant::now()) {
            info!("Topic cache invalidated");
        }

        let names = self.engine.active_topic_names().await?;
        let added = self.topics.discover(&names);
        if added == 0 {
            debug!("No new topics found");
        }
        Ok(())
    }

    /// Route one task and send exactly one outcome report for it
    pub async fn dispatch_task(&self, task: &LockedTask) {
        log_task_operation("received", &task.id, &task.topic_name, "locked", None);

        match self.router.route(task).await {
            TaskOutcome::Completed(completion) => {
                match self.engine.complete(&task.id, &completion).await {
                    Ok(()) => {
                        self.stats.tasks_completed.fetch_add(1, Ordering::Relaxed);
                        log_task_operation("complete", &task.id, &task.topic_name, "completed", None);
                    }
                    Err(e) => {
                        warn!(
                            task_id = %task.id,
                            topic = %task.topic_name,
                            error = %e,
                            "Completing task failed, reporting failure instead"
                        );
                        let report = self.router.failure_report(task, &HandlerError::from(e));
                        self.report_failure(task, report).await;
                    }
                }
            }
            TaskOutcome::Failed(report) => self.report_failure(task, report).await,
        }
    }

    async fn report_failure(&self, task: &LockedTask, report: FailureReport) {
        self.stats.tasks_failed.fetch_add(1, Ordering::Relaxed);

        match self.engine.report_failure(&task.id, &report).await {
            Ok(()) => {
                let details = format!("retries={} error={}", report.retries_remaining, report.error_message);
                log_task_operation("failure", &task.id, &task.topic_name, "failed", Some(&details));
            }
            Err(e) => {
                self.stats.failure_reports_lost.fetch_add(1, Ordering::Relaxed);
                log_error(
                    "dispatcher",
                    "report_failure",
                    &e.to_string(),
                    Some(&format!("task_id={} topic={}", task.id, task.topic_name)),
                );
            }
        }
    }

    async fn handle_loop_error(&self, e: crate::error::DispatcherError, shutdown: &CancellationToken) {
        self.stats.loop_errors.fetch_add(1, Ordering::Relaxed);
        error!(
            severity = "critical",
            error = %e,
            recoverable = e.is_recoverable(),
            state = ?self.state(),
            "Error while waiting for tasks"
        );

        let backoff = self.fast_failure.lock().record_error(Instant::now());
        if let Some(backoff) = backoff {
            self.stats.backoffs.fetch_add(1, Ordering::Relaxed);
            self.set_state(DispatchState::BackingOff);
            warn!(backoff_ms = backoff.as_millis() as u64, "Fast failure detected, backing off");
            Self::wait_or_shutdown(backoff, shutdown).await;
        }
    }

    async fn wait_or_shutdown(duration: Duration, shutdown: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown.cancelled() => {
                debug!("Wait interrupted by shutdown");
            }
        }
    }
}
