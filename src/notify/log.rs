//! Log delivery channel.

use async_trait::async_trait;

use crate::alerts::AlertEvent;

use super::{NotificationChannel, NotificationError};

/// Emits the alert to the structured log. Never fails.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        event.emit();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
