//! Risk metric derivations for leveraged positions.
//!
//! Every function here is pure: no I/O, no clocks, no mutation of the
//! inputs. Degenerate inputs (zero prices, equal entry/liquidation) degrade
//! to a sentinel value with a warning instead of erroring, so a dashboard
//! driven by these numbers always has something to render. The ingestion
//! boundary in [`crate::position`] is where bad data gets rejected.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::position::{Position, Side};
use crate::utils::decimal::{safe_div, weighted_average};

/// The metrics this engine derives, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Value,
    Size,
    Collateral,
    Leverage,
    HeatIndex,
    TravelPercent,
    LiquidationDistance,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Value,
        Metric::Size,
        Metric::Collateral,
        Metric::Leverage,
        Metric::HeatIndex,
        Metric::TravelPercent,
        Metric::LiquidationDistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Value => "value",
            Metric::Size => "size",
            Metric::Collateral => "collateral",
            Metric::Leverage => "leverage",
            Metric::HeatIndex => "heat_index",
            Metric::TravelPercent => "travel_percent",
            Metric::LiquidationDistance => "liquidation_distance",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived metrics for one position, recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionMetrics {
    pub value: Decimal,
    pub leverage: Option<Decimal>,
    pub travel_percent: Decimal,
    pub liquidation_distance: Decimal,
    pub heat_index: Option<Decimal>,
}

impl PositionMetrics {
    /// Value of one derived (or pass-through) metric for zone evaluation.
    ///
    /// Leverage and heat index are undefined for degenerate inputs; those
    /// return None and are skipped by the evaluator.
    pub fn metric_value(&self, position: &Position, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::Value => Some(self.value),
            Metric::Size => Some(position.size),
            Metric::Collateral => Some(position.collateral),
            Metric::Leverage => self.leverage,
            Metric::HeatIndex => self.heat_index,
            Metric::TravelPercent => Some(self.travel_percent),
            Metric::LiquidationDistance => Some(self.liquidation_distance),
        }
    }
}

/// Portfolio-level aggregate totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PortfolioTotals {
    pub total_size: Decimal,
    pub total_value: Decimal,
    pub total_collateral: Decimal,
    /// Size-weighted average leverage
    pub avg_leverage: Decimal,
    /// Size-weighted average travel percent
    pub avg_travel_percent: Decimal,
    /// Average heat index over positions where it is defined and non-zero
    pub avg_heat_index: Decimal,
}

/// Current notional value of a position.
///
/// Long: `size * current_price`. Short: `size * (2 * entry - current)`,
/// so a short gains value as price falls below entry. Returns zero with a
/// warning for non-positive size or price; this path feeds displays and
/// must not fail.
pub fn position_value(position: &Position) -> Decimal {
    if position.size <= Decimal::ZERO || position.current_price <= Decimal::ZERO {
        tracing::warn!(
            position_id = %position.id,
            size = %position.size,
            current_price = %position.current_price,
            "Degenerate inputs for position value, returning 0"
        );
        return Decimal::ZERO;
    }

    let value = match position.side {
        Side::Long => position.size * position.current_price,
        Side::Short => {
            position.size * (Decimal::TWO * position.entry_price - position.current_price)
        }
    };
    value.round_dp(2)
}

/// Leverage = notional size / posted collateral, to 2 decimal places.
///
/// Undefined (None) when either input is non-positive.
pub fn leverage(size: Decimal, collateral: Decimal) -> Option<Decimal> {
    if size <= Decimal::ZERO || collateral <= Decimal::ZERO {
        return None;
    }
    Some((size / collateral).round_dp(2))
}

/// Signed progress between entry and liquidation price, as a percentage.
///
/// `((current - entry) / (entry - liquidation)) * 100`. Negative values
/// mean the price has moved toward liquidation. Returns zero when entry
/// equals liquidation rather than dividing by zero.
pub fn travel_percent(entry: Decimal, current: Decimal, liquidation: Decimal) -> Decimal {
    let span = entry - liquidation;
    if span == Decimal::ZERO {
        tracing::warn!(
            %entry, %liquidation,
            "Entry equals liquidation price, travel percent undefined, returning 0"
        );
        return Decimal::ZERO;
    }
    ((current - entry) / span) * Decimal::ONE_HUNDRED
}

/// Absolute price distance to liquidation, to 2 decimal places.
pub fn liquidation_distance(current: Decimal, liquidation: Decimal) -> Decimal {
    (liquidation - current).abs().round_dp(2)
}

/// Composite risk score `(size * leverage) / collateral`, to 2 decimal
/// places. Undefined (None) when collateral is non-positive.
pub fn heat_index(size: Decimal, leverage: Decimal, collateral: Decimal) -> Option<Decimal> {
    if collateral <= Decimal::ZERO {
        return None;
    }
    Some(((size * leverage) / collateral).round_dp(2))
}

/// Derive the full metric set for one position.
pub fn compute(position: &Position) -> PositionMetrics {
    let value = position_value(position);
    let lev = leverage(position.size, position.collateral);
    let travel = travel_percent(
        position.entry_price,
        position.current_price,
        position.liquidation_price,
    );
    let distance = liquidation_distance(position.current_price, position.liquidation_price);
    // Undefined leverage contributes zero heat; heat index itself is only
    // undefined when collateral is.
    let heat = heat_index(position.size, lev.unwrap_or_default(), position.collateral);

    PositionMetrics {
        value,
        leverage: lev,
        travel_percent: travel,
        liquidation_distance: distance,
        heat_index: heat,
    }
}

/// Aggregate totals across the whole portfolio.
///
/// Sums for size/value/collateral; size-weighted averages for leverage and
/// travel percent; heat index averaged only over positions where it is
/// defined and non-zero. An empty portfolio yields all zeros.
pub fn aggregate_totals(positions: &[(Position, PositionMetrics)]) -> PortfolioTotals {
    let mut totals = PortfolioTotals::default();
    let mut leverage_weighted = Vec::with_capacity(positions.len());
    let mut travel_weighted = Vec::with_capacity(positions.len());
    let mut heat_sum = Decimal::ZERO;
    let mut heat_count = Decimal::ZERO;

    for (position, metrics) in positions {
        totals.total_size += position.size;
        totals.total_value += metrics.value;
        totals.total_collateral += position.collateral;

        leverage_weighted.push((metrics.leverage.unwrap_or_default(), position.size));
        travel_weighted.push((metrics.travel_percent, position.size));

        if let Some(heat) = metrics.heat_index {
            if heat != Decimal::ZERO {
                heat_sum += heat;
                heat_count += Decimal::ONE;
            }
        }
    }

    totals.avg_leverage = weighted_average(&leverage_weighted).round_dp(2);
    totals.avg_travel_percent = weighted_average(&travel_weighted).round_dp(2);
    totals.avg_heat_index = safe_div(heat_sum, heat_count).round_dp(2);
    totals
}
