//! Alert notification delivery.
//!
//! One implementation per channel (Email, SMS, Log, Local); the dispatcher
//! fans a single event out to the channel set configured for its severity
//! and isolates per-channel failures.

mod email;
mod local;
mod log;
mod sms;

pub use email::EmailChannel;
pub use local::LocalChannel;
pub use log::LogChannel;
pub use sms::SmsChannel;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alerts::{AlertEvent, AlertZone};
use crate::config::NotificationConfig;

/// Identifier for a delivery channel, used in routing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Log,
    Local,
}

/// Errors from the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A notification delivery mechanism.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, event: &AlertEvent) -> Result<(), NotificationError>;
    fn name(&self) -> &'static str;
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub delivered: usize,
}

/// Fans alert events out across the configured channels.
pub struct NotificationDispatcher {
    channels: HashMap<ChannelKind, Box<dyn NotificationChannel>>,
    warning_route: Vec<ChannelKind>,
    danger_route: Vec<ChannelKind>,
}

impl NotificationDispatcher {
    /// Build the dispatcher from notification settings.
    ///
    /// Log and Local channels are always available; Email requires SMTP
    /// settings and SMS additionally requires a carrier gateway.
    pub fn from_config(config: &NotificationConfig) -> Self {
        let mut channels: HashMap<ChannelKind, Box<dyn NotificationChannel>> = HashMap::new();
        channels.insert(ChannelKind::Log, Box::new(LogChannel));
        channels.insert(ChannelKind::Local, Box::new(LocalChannel::default()));

        if let Some(email_cfg) = &config.email {
            match EmailChannel::new(email_cfg) {
                Ok(channel) => {
                    info!(recipient = %email_cfg.recipient, "Email notifications enabled");
                    channels.insert(ChannelKind::Email, Box::new(channel));
                }
                Err(e) => warn!("Failed to initialize email channel: {}", e),
            }

            if let Some(sms_cfg) = &config.sms {
                match SmsChannel::new(email_cfg, sms_cfg) {
                    Ok(channel) => {
                        info!(gateway = %sms_cfg.carrier_gateway, "SMS notifications enabled");
                        channels.insert(ChannelKind::Sms, Box::new(channel));
                    }
                    Err(e) => warn!("Failed to initialize SMS channel: {}", e),
                }
            }
        }

        Self {
            channels,
            warning_route: config.routing.warning.clone(),
            danger_route: config.routing.danger.clone(),
        }
    }

    /// Build a dispatcher from explicit channels (used by tests and
    /// embedders that bring their own delivery).
    pub fn new(
        channels: Vec<(ChannelKind, Box<dyn NotificationChannel>)>,
        warning_route: Vec<ChannelKind>,
        danger_route: Vec<ChannelKind>,
    ) -> Self {
        Self {
            channels: channels.into_iter().collect(),
            warning_route,
            danger_route,
        }
    }

    /// Deliver an event to every channel routed for its severity.
    ///
    /// Channels are invoked independently: a failure is logged and does
    /// not prevent the remaining channels from being attempted, and the
    /// call itself never fails.
    pub async fn dispatch(&self, event: &AlertEvent) -> DispatchSummary {
        let route = match event.zone {
            AlertZone::Danger => &self.danger_route,
            AlertZone::Warning => &self.warning_route,
            AlertZone::Normal => return DispatchSummary::default(),
        };

        let mut summary = DispatchSummary::default();
        for kind in route {
            let Some(channel) = self.channels.get(kind) else {
                debug!(channel = ?kind, "Channel routed but not configured, skipping");
                continue;
            };

            summary.attempted += 1;
            match channel.send(event).await {
                Ok(()) => {
                    debug!(channel = channel.name(), position_id = %event.position_id,
                        "Notification delivered");
                    summary.delivered += 1;
                }
                Err(e) => {
                    warn!(channel = channel.name(), position_id = %event.position_id,
                        error = %e, "Notification channel degraded");
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::position::{Position, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    fn event(zone: AlertZone) -> AlertEvent {
        let position = Position {
            id: "pos-1".to_string(),
            asset: "BTC".to_string(),
            side: Side::Long,
            entry_price: dec!(100),
            current_price: dec!(60),
            liquidation_price: dec!(50),
            size: dec!(10),
            collateral: dec!(100),
            last_updated: Utc::now(),
        };
        AlertEvent::new(&position, Metric::TravelPercent, dec!(-80), zone, Utc::now())
    }

    struct RecordingChannel {
        label: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send(&self, _event: &AlertEvent) -> Result<(), NotificationError> {
            self.seen.lock().unwrap().push(self.label);
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn send(&self, _event: &AlertEvent) -> Result<(), NotificationError> {
            Err(NotificationError::Smtp("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing-email"
        }
    }

    fn recording(
        label: &'static str,
        seen: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Box<dyn NotificationChannel> {
        Box::new(RecordingChannel {
            label,
            seen: Arc::clone(seen),
        })
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_the_rest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotificationDispatcher::new(
            vec![
                (ChannelKind::Email, Box::new(FailingChannel)),
                (ChannelKind::Sms, recording("sms", &seen)),
                (ChannelKind::Log, recording("log", &seen)),
                (ChannelKind::Local, recording("local", &seen)),
            ],
            vec![ChannelKind::Log, ChannelKind::Email],
            vec![
                ChannelKind::Sms,
                ChannelKind::Email,
                ChannelKind::Log,
                ChannelKind::Local,
            ],
        );

        let summary = dispatcher.dispatch(&event(AlertZone::Danger)).await;

        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.delivered, 3);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["sms", "log", "local"]);
    }

    #[tokio::test]
    async fn test_warning_routes_to_warning_subset() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotificationDispatcher::new(
            vec![
                (ChannelKind::Email, recording("email", &seen)),
                (ChannelKind::Sms, recording("sms", &seen)),
                (ChannelKind::Log, recording("log", &seen)),
            ],
            vec![ChannelKind::Log, ChannelKind::Email],
            vec![ChannelKind::Sms, ChannelKind::Email, ChannelKind::Log],
        );

        let summary = dispatcher.dispatch(&event(AlertZone::Warning)).await;

        assert_eq!(summary.delivered, 2);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec!["log", "email"]);
    }

    #[tokio::test]
    async fn test_unconfigured_channel_is_skipped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotificationDispatcher::new(
            vec![(ChannelKind::Log, recording("log", &seen))],
            vec![ChannelKind::Log, ChannelKind::Email],
            vec![],
        );

        let summary = dispatcher.dispatch(&event(AlertZone::Warning)).await;

        // Email is routed but never configured: skipped, not attempted
        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.delivered, 1);
    }

    #[tokio::test]
    async fn test_normal_zone_dispatches_nothing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = NotificationDispatcher::new(
            vec![(ChannelKind::Log, recording("log", &seen))],
            vec![ChannelKind::Log],
            vec![ChannelKind::Log],
        );

        let summary = dispatcher.dispatch(&event(AlertZone::Normal)).await;
        assert_eq!(summary, DispatchSummary::default());
        assert!(seen.lock().unwrap().is_empty());
    }
}
