use async_trait::async_trait;
use tracing::info;

use super::TaskHandler;
use crate::error::HandlerError;
use crate::models::{LockedTask, Variables};

/// Extension point for message-type tasks.
///
/// Accepts every task and completes it with no output variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageTaskHandler;

#[async_trait]
impl TaskHandler for MessageTaskHandler {
    async fn handle(&self, task: &LockedTask) -> Result<Variables, HandlerError> {
        info!(
            task_id = %task.id,
            topic = %task.topic_name,
            "Message task received but not acted upon"
        );
        Ok(Variables::new())
    }

    fn handler_name(&self) -> &'static str {
        "message"
    }
}
