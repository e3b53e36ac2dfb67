//! Topic descriptors and the fetch-and-lock request.

use serde::{Deserialize, Serialize};

/// One topic the dispatcher is willing to claim tasks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDescriptor {
    #[serde(rename = "topicName")]
    pub name: String,
    #[serde(rename = "lockDuration")]
    pub lock_duration_ms: i64,
}

impl TopicDescriptor {
    pub fn new(name: impl Into<String>, lock_duration_ms: i64) -> Self {
        Self {
            name: name.into(),
            lock_duration_ms,
        }
    }
}

/// Body of the engine's long-polling fetch-and-lock call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAndLockRequest {
    pub worker_id: String,
    pub max_tasks: u32,
    #[serde(rename = "asyncResponseTimeout")]
    pub async_response_timeout_ms: u64,
    pub topics: Vec<TopicDescriptor>,
}
