//! Local console notification channel.

use std::io::Write;

use async_trait::async_trait;

use crate::alerts::{AlertEvent, AlertZone};

use super::{NotificationChannel, NotificationError};

/// Writes the alert to the operator's terminal, with a bell for danger
/// alerts so an attended console pings audibly.
#[derive(Default)]
pub struct LocalChannel {
    /// Suppress the terminal bell (for quiet environments)
    pub silent: bool,
}

#[async_trait]
impl NotificationChannel for LocalChannel {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let mut stdout = std::io::stdout().lock();
        let bell = if event.zone == AlertZone::Danger && !self.silent {
            "\x07"
        } else {
            ""
        };
        let _ = writeln!(
            stdout,
            "{bell}[{}] {} | {}",
            event.zone.as_str(),
            event.timestamp.format("%H:%M:%S"),
            event.message
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
