//! Configuration management for the position sentinel.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::metrics::Metric;
use crate::notify::ChannelKind;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitor loop settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Per-metric alert thresholds
    #[serde(default)]
    pub alert_ranges: AlertRanges,
    /// Notification delivery settings
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Price feed settings
    #[serde(default)]
    pub prices: PriceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Master switch for alert evaluation; when false a tick is a no-op
    #[serde(default = "default_monitor_enabled")]
    pub enabled: bool,
    /// Seconds between evaluation cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum seconds between repeated alerts for the same (position, metric)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Path to the JSON portfolio document read each cycle
    #[serde(default = "default_portfolio_path")]
    pub portfolio_path: String,
}

/// Which way a metric gets worse.
///
/// `Ascending` metrics alarm as the value grows (leverage, heat index);
/// `Descending` metrics alarm as the value falls (travel percent toward
/// liquidation, shrinking liquidation distance). Explicit metadata rather
/// than a sign convention on the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    Ascending,
    Descending,
}

/// Zone boundaries for a single metric.
///
/// With direction `Ascending`: `v <= low` is Normal, `low < v <= medium`
/// is Warning, `v > medium` is Danger. `Descending` mirrors the
/// comparisons. `high` bounds the Danger band for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRange {
    pub low: Decimal,
    pub medium: Decimal,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default = "default_direction")]
    pub direction: ThresholdDirection,
}

impl MetricRange {
    fn ascending(low: Decimal, medium: Decimal) -> Self {
        Self {
            low,
            medium,
            high: None,
            direction: ThresholdDirection::Ascending,
        }
    }

    fn descending(low: Decimal, medium: Decimal, high: Option<Decimal>) -> Self {
        Self {
            low,
            medium,
            high,
            direction: ThresholdDirection::Descending,
        }
    }
}

/// Thresholds for every recognized metric, with explicit defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRanges {
    #[serde(default = "default_value_range")]
    pub value: MetricRange,
    #[serde(default = "default_size_range")]
    pub size: MetricRange,
    #[serde(default = "default_collateral_range")]
    pub collateral: MetricRange,
    #[serde(default = "default_leverage_range")]
    pub leverage: MetricRange,
    #[serde(default = "default_heat_index_range")]
    pub heat_index: MetricRange,
    #[serde(default = "default_travel_percent_range")]
    pub travel_percent: MetricRange,
    #[serde(default = "default_liquidation_distance_range")]
    pub liquidation_distance: MetricRange,
}

impl AlertRanges {
    /// Look up the range configured for a metric.
    pub fn range(&self, metric: Metric) -> &MetricRange {
        match metric {
            Metric::Value => &self.value,
            Metric::Size => &self.size,
            Metric::Collateral => &self.collateral,
            Metric::Leverage => &self.leverage,
            Metric::HeatIndex => &self.heat_index,
            Metric::TravelPercent => &self.travel_percent,
            Metric::LiquidationDistance => &self.liquidation_distance,
        }
    }

    /// All (metric, range) pairs, in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricRange)> {
        Metric::ALL.iter().map(move |&m| (m, self.range(m)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// SMTP settings; Email and SMS channels are disabled when absent
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// SMS-via-carrier-gateway settings; requires `email` for transport
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    /// Which channels receive which severity
    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Carrier email-to-SMS gateway domain, e.g. "vtext.com"
    pub carrier_gateway: String,
    pub recipient_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_warning_channels")]
    pub warning: Vec<ChannelKind>,
    #[serde(default = "default_danger_channels")]
    pub danger: Vec<ChannelKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Asset symbols tracked for price refresh
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    /// Quote currency for price lookups
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_feed_enabled")]
    pub coingecko_enabled: bool,
    #[serde(default = "default_feed_enabled")]
    pub binance_enabled: bool,
    /// Per-source fetch timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

// Default value functions

fn default_monitor_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    600
}

fn default_portfolio_path() -> String {
    "data/portfolio.json".to_string()
}

fn default_direction() -> ThresholdDirection {
    ThresholdDirection::Ascending
}

fn default_value_range() -> MetricRange {
    MetricRange::ascending(Decimal::ZERO, Decimal::new(2000, 0))
}

fn default_size_range() -> MetricRange {
    MetricRange::ascending(Decimal::ZERO, Decimal::new(15_000, 0))
}

fn default_collateral_range() -> MetricRange {
    MetricRange::ascending(Decimal::ZERO, Decimal::new(1000, 0))
}

fn default_leverage_range() -> MetricRange {
    MetricRange::ascending(Decimal::ZERO, Decimal::new(5, 0))
}

fn default_heat_index_range() -> MetricRange {
    MetricRange::ascending(Decimal::ZERO, Decimal::new(200, 0))
}

fn default_travel_percent_range() -> MetricRange {
    MetricRange::descending(
        Decimal::new(-25, 0),
        Decimal::new(-50, 0),
        Some(Decimal::new(-75, 0)),
    )
}

fn default_liquidation_distance_range() -> MetricRange {
    MetricRange::descending(Decimal::new(5, 0), Decimal::new(2, 0), None)
}

fn default_smtp_port() -> u16 {
    587
}

fn default_warning_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Log, ChannelKind::Email]
}

fn default_danger_channels() -> Vec<ChannelKind> {
    vec![
        ChannelKind::Sms,
        ChannelKind::Email,
        ChannelKind::Log,
        ChannelKind::Local,
    ]
}

fn default_assets() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()]
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_feed_enabled() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("sentinel").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .prefix("SENTINEL"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.monitor.poll_interval_secs >= 1,
            "poll_interval_secs must be at least 1"
        );

        for (metric, range) in self.alert_ranges.iter() {
            match range.direction {
                ThresholdDirection::Ascending => {
                    anyhow::ensure!(
                        range.low <= range.medium,
                        "{metric} thresholds must satisfy low <= medium for ascending ranges"
                    );
                    if let Some(high) = range.high {
                        anyhow::ensure!(
                            range.medium <= high,
                            "{metric} thresholds must satisfy medium <= high for ascending ranges"
                        );
                    }
                }
                ThresholdDirection::Descending => {
                    anyhow::ensure!(
                        range.low >= range.medium,
                        "{metric} thresholds must satisfy low >= medium for descending ranges"
                    );
                    if let Some(high) = range.high {
                        anyhow::ensure!(
                            range.medium >= high,
                            "{metric} thresholds must satisfy medium >= high for descending ranges"
                        );
                    }
                }
            }
        }

        if self.notification.sms.is_some() {
            anyhow::ensure!(
                self.notification.email.is_some(),
                "sms notification requires email (SMTP) settings for transport"
            );
        }

        anyhow::ensure!(
            !self.prices.assets.is_empty(),
            "prices.assets must list at least one asset"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            alert_ranges: AlertRanges::default(),
            notification: NotificationConfig::default(),
            prices: PriceConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_monitor_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            cooldown_secs: default_cooldown_secs(),
            portfolio_path: default_portfolio_path(),
        }
    }
}

impl Default for AlertRanges {
    fn default() -> Self {
        Self {
            value: default_value_range(),
            size: default_size_range(),
            collateral: default_collateral_range(),
            leverage: default_leverage_range(),
            heat_index: default_heat_index_range(),
            travel_percent: default_travel_percent_range(),
            liquidation_distance: default_liquidation_distance_range(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: None,
            sms: None,
            routing: RoutingConfig::default(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            warning: default_warning_channels(),
            danger: default_danger_channels(),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            currency: default_currency(),
            coingecko_enabled: default_feed_enabled(),
            binance_enabled: default_feed_enabled(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
