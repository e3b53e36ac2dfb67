//! Task classification derived from topic-name prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of external task, derived from its topic name. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Service,
    Message,
    Unknown,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Service => write!(f, "Service"),
            TaskType::Message => write!(f, "Message"),
            TaskType::Unknown => write!(f, "Unknown"),
        }
    }
}
