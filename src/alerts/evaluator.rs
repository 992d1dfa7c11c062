//! Severity zone classification against configured thresholds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, warn};

use crate::config::{AlertRanges, MetricRange, ThresholdDirection};
use crate::metrics::{Metric, PositionMetrics};
use crate::position::Position;

/// Severity zone of a metric value, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AlertZone {
    /// Within normal operating range; never triggers
    Normal,
    /// Crossed the low boundary
    Warning,
    /// Crossed the medium boundary; action required
    Danger,
}

impl AlertZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertZone::Normal => "NORMAL",
            AlertZone::Warning => "WARNING",
            AlertZone::Danger => "DANGER",
        }
    }
}

/// An alert raised for one (position, metric) crossing.
///
/// Transient: consumed by the dispatcher immediately, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub position_id: String,
    pub asset: String,
    pub metric: Metric,
    pub value: Decimal,
    pub zone: AlertZone,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl AlertEvent {
    pub fn new(
        position: &Position,
        metric: Metric,
        value: Decimal,
        zone: AlertZone,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "{} alert for {} ({}): {} = {:.2} => {} zone",
            metric,
            position.id,
            position.asset,
            metric,
            value,
            zone.as_str()
        );
        Self {
            position_id: position.id.clone(),
            asset: position.asset.clone(),
            metric,
            value,
            zone,
            timestamp,
            message,
        }
    }

    /// Emit as structured log for downstream parsing.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self.zone {
            AlertZone::Danger => error!(target: "position_alert", "POSITION_ALERT: {}", json),
            _ => warn!(target: "position_alert", "POSITION_ALERT: {}", json),
        }
    }
}

/// Classifies metric values into severity zones.
pub struct AlertEvaluator {
    ranges: AlertRanges,
}

impl AlertEvaluator {
    pub fn new(ranges: AlertRanges) -> Self {
        Self { ranges }
    }

    /// Classify a single value against one metric's configured range.
    ///
    /// Boundaries are inclusive toward the less severe zone: a value
    /// exactly at `low` is Normal, exactly at `medium` is Warning.
    pub fn classify(&self, metric: Metric, value: Decimal) -> AlertZone {
        Self::classify_against(self.ranges.range(metric), value)
    }

    fn classify_against(range: &MetricRange, value: Decimal) -> AlertZone {
        match range.direction {
            ThresholdDirection::Ascending => {
                if value <= range.low {
                    AlertZone::Normal
                } else if value <= range.medium {
                    AlertZone::Warning
                } else {
                    AlertZone::Danger
                }
            }
            ThresholdDirection::Descending => {
                if value >= range.low {
                    AlertZone::Normal
                } else if value >= range.medium {
                    AlertZone::Warning
                } else {
                    AlertZone::Danger
                }
            }
        }
    }

    /// Evaluate every configured metric for a position.
    ///
    /// Returns candidate events for all Warning/Danger classifications;
    /// cooldown gating happens upstream. Metrics undefined for this
    /// position (degenerate leverage/heat index) are skipped.
    pub fn evaluate(
        &self,
        position: &Position,
        metrics: &PositionMetrics,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for (metric, _range) in self.ranges.iter() {
            let Some(value) = metrics.metric_value(position, metric) else {
                continue;
            };
            let zone = self.classify(metric, value);
            if zone > AlertZone::Normal {
                events.push(AlertEvent::new(position, metric, value, zone, now));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertRanges;
    use crate::position::Side;
    use rust_decimal_macros::dec;

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::new(AlertRanges::default())
    }

    #[test]
    fn test_ascending_boundaries_inclusive_downward() {
        let eval = evaluator();
        // Default leverage range: low=0, medium=5, ascending
        assert_eq!(eval.classify(Metric::Leverage, dec!(0)), AlertZone::Normal);
        assert_eq!(eval.classify(Metric::Leverage, dec!(5)), AlertZone::Warning);
        assert_eq!(
            eval.classify(Metric::Leverage, dec!(5.01)),
            AlertZone::Danger
        );
    }

    #[test]
    fn test_descending_travel_percent_zones() {
        let eval = evaluator();
        // Default travel range: low=-25, medium=-50, descending
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-10)),
            AlertZone::Normal
        );
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-25)),
            AlertZone::Normal
        );
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-30)),
            AlertZone::Warning
        );
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-50)),
            AlertZone::Warning
        );
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-80)),
            AlertZone::Danger
        );
    }

    #[test]
    fn test_beyond_high_stays_danger() {
        let eval = evaluator();
        // Default travel high is -75; far past it is still Danger
        assert_eq!(
            eval.classify(Metric::TravelPercent, dec!(-500)),
            AlertZone::Danger
        );
    }

    #[test]
    fn test_zone_ordering() {
        assert!(AlertZone::Normal < AlertZone::Warning);
        assert!(AlertZone::Warning < AlertZone::Danger);
    }

    #[test]
    fn test_evaluate_skips_undefined_metrics() {
        let eval = evaluator();
        let position = Position {
            id: "pos-1".to_string(),
            asset: "BTC".to_string(),
            side: Side::Long,
            entry_price: dec!(100),
            current_price: dec!(40),
            liquidation_price: dec!(50),
            size: dec!(10),
            collateral: Decimal::ZERO,
            last_updated: Utc::now(),
        };
        let metrics = crate::metrics::compute(&position);
        let events = eval.evaluate(&position, &metrics, Utc::now());

        // Leverage/heat index are undefined with zero collateral; travel
        // percent at -120 is deep in the Danger zone.
        assert!(events.iter().all(|e| e.metric != Metric::Leverage));
        assert!(events.iter().all(|e| e.metric != Metric::HeatIndex));
        assert!(events
            .iter()
            .any(|e| e.metric == Metric::TravelPercent && e.zone == AlertZone::Danger));
    }

    #[test]
    fn test_normal_positions_produce_no_events() {
        // Ranges with headroom so a healthy position sits in Normal for
        // every metric.
        let mut ranges = AlertRanges::default();
        ranges.value.low = dec!(5000);
        ranges.value.medium = dec!(10_000);
        ranges.size.low = dec!(100);
        ranges.size.medium = dec!(500);
        ranges.collateral.low = dec!(5000);
        ranges.collateral.medium = dec!(10_000);
        ranges.leverage.low = dec!(2);
        ranges.leverage.medium = dec!(5);
        ranges.heat_index.low = dec!(50);
        ranges.heat_index.medium = dec!(200);
        let eval = AlertEvaluator::new(ranges);

        let position = Position {
            id: "pos-1".to_string(),
            asset: "BTC".to_string(),
            side: Side::Long,
            entry_price: dec!(100),
            current_price: dec!(100),
            liquidation_price: dec!(50),
            size: dec!(10),
            collateral: dec!(2000),
            last_updated: Utc::now(),
        };
        let metrics = crate::metrics::compute(&position);
        let events = eval.evaluate(&position, &metrics, Utc::now());
        assert!(events.is_empty(), "unexpected events: {events:?}");
    }
}
