//! In-memory engine for dispatcher tests
//!
//! Records every call and serves scripted fetch-and-lock results.

use async_trait::async_trait;
use external_task_dispatcher::engine::ExternalTaskEngine;
use external_task_dispatcher::error::{DispatcherError, DispatcherResult};
use external_task_dispatcher::models::{
    CompletionResult, FailureReport, FetchAndLockRequest, LockedTask,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Scripted response for one fetch-and-lock call
#[derive(Debug, Clone)]
pub enum FetchScript {
    Tasks(Vec<LockedTask>),
    Error(String),
}

/// Mock engine state for tracking calls and simulating behavior
#[derive(Debug, Default)]
pub struct MockEngineState {
    /// Every fetch-and-lock request received
    pub fetch_requests: Vec<FetchAndLockRequest>,
    /// Successful completions
    pub completions: Vec<(String, CompletionResult)>,
    /// Completion calls including rejected ones
    pub complete_attempts: usize,
    /// Failure reports, including rejected ones
    pub failures: Vec<(String, FailureReport)>,
    pub discovery_calls: usize,
    /// Topic names returned by discovery
    pub active_topics: Vec<String>,
    /// Served in order; an empty queue yields no tasks
    pub fetch_script: VecDeque<FetchScript>,
    /// Every fetch fails once the script is exhausted
    pub fail_all_fetches: bool,
    pub fail_complete: bool,
    pub fail_report_failure: bool,
    pub fail_discovery: bool,
}

/// Mock engine implementation for testing
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockEngineState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one batch of tasks for the next fetch
    pub fn with_tasks(self, tasks: Vec<LockedTask>) -> Self {
        self.state
            .lock()
            .fetch_script
            .push_back(FetchScript::Tasks(tasks));
        self
    }

    pub fn with_fetch_error(self, message: &str) -> Self {
        self.state
            .lock()
            .fetch_script
            .push_back(FetchScript::Error(message.to_string()));
        self
    }

    pub fn with_active_topics(self, topics: &[&str]) -> Self {
        self.state.lock().active_topics = topics.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Replace the topics discovery reports from now on
    pub fn set_active_topics(&self, topics: &[&str]) {
        self.state.lock().active_topics = topics.iter().map(|t| t.to_string()).collect();
    }

    pub fn failing_all_fetches(self) -> Self {
        self.state.lock().fail_all_fetches = true;
        self
    }

    pub fn failing_complete(self) -> Self {
        self.state.lock().fail_complete = true;
        self
    }

    pub fn failing_report_failure(self) -> Self {
        self.state.lock().fail_report_failure = true;
        self
    }

    pub fn failing_discovery(self) -> Self {
        self.state.lock().fail_discovery = true;
        self
    }

    pub fn fetch_requests(&self) -> Vec<FetchAndLockRequest> {
        self.state.lock().fetch_requests.clone()
    }

    pub fn completions(&self) -> Vec<(String, CompletionResult)> {
        self.state.lock().completions.clone()
    }

    pub fn complete_attempts(&self) -> usize {
        self.state.lock().complete_attempts
    }

    pub fn failures(&self) -> Vec<(String, FailureReport)> {
        self.state.lock().failures.clone()
    }

    pub fn discovery_calls(&self) -> usize {
        self.state.lock().discovery_calls
    }
}

#[async_trait]
impl ExternalTaskEngine for MockEngine {
    async fn fetch_and_lock(&self, request: &FetchAndLockRequest) -> DispatcherResult<Vec<LockedTask>> {
        let mut state = self.state.lock();
        state.fetch_requests.push(request.clone());

        match state.fetch_script.pop_front() {
            Some(FetchScript::Tasks(tasks)) => Ok(tasks),
            Some(FetchScript::Error(message)) => Err(DispatcherError::engine("fetch_and_lock", message)),
            None if state.fail_all_fetches => {
                Err(DispatcherError::engine("fetch_and_lock", "connection refused"))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn complete(&self, task_id: &str, completion: &CompletionResult) -> DispatcherResult<()> {
        let mut state = self.state.lock();
        state.complete_attempts += 1;
        if state.fail_complete {
            return Err(DispatcherError::engine_status("complete", 500, "lock expired"));
        }
        state.completions.push((task_id.to_string(), completion.clone()));
        Ok(())
    }

    async fn report_failure(&self, task_id: &str, failure: &FailureReport) -> DispatcherResult<()> {
        let mut state = self.state.lock();
        state.failures.push((task_id.to_string(), failure.clone()));
        if state.fail_report_failure {
            return Err(DispatcherError::engine("report_failure", "engine unreachable"));
        }
        Ok(())
    }

    async fn active_topic_names(&self) -> DispatcherResult<Vec<String>> {
        let mut state = self.state.lock();
        state.discovery_calls += 1;
        if state.fail_discovery {
            return Err(DispatcherError::engine("query_external_tasks", "engine unreachable"));
        }
        Ok(state.active_topics.clone())
    }
}
