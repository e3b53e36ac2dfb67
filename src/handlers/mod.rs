//! # Task Handlers
//!
//! A handler performs the actual work for one task type. Handlers return either
//! the output variables or a [`HandlerError`] that tells the router whether the
//! failure is terminal or retryable; they never report to the engine themselves.

pub mod message_handler;
pub mod service_handler;

use crate::error::HandlerError;
use crate::models::{LockedTask, Variables};
use async_trait::async_trait;

pub use message_handler::MessageTaskHandler;
pub use service_handler::{ServiceHandlerSettings, ServiceTaskHandler};

/// Executes the business action behind a locked task
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Handle the task and return its output variables
    async fn handle(&self, task: &LockedTask) -> Result<Variables, HandlerError>;

    /// Handler name used in logs
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
