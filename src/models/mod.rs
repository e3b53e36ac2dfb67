//! # Task Envelope Data Model
//!
//! Wire-level records exchanged with the workflow engine and the downstream API.
//!
//! - [`task`] - the locked task and its completion/failure companions
//! - [`topic`] - topic descriptors and the fetch-and-lock request built from them
//! - [`task_type`] - topic-prefix based task classification

pub mod task;
pub mod task_type;
pub mod topic;

pub use task::{CompletionResult, ExternalTaskSummary, FailureReport, LockedTask, VariableValue, Variables};
pub use task_type::TaskType;
pub use topic::{FetchAndLockRequest, TopicDescriptor};
