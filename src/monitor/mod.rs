//! The polling scheduler driving the evaluation cycle.
//!
//! Each tick: refresh prices, read the position snapshot, derive metrics,
//! classify zones, and dispatch whatever the cooldown lets through. One
//! position failing never stops the rest, and one tick failing never stops
//! the loop.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::alerts::{AlertEvaluator, CooldownTracker};
use crate::config::Config;
use crate::metrics;
use crate::notify::NotificationDispatcher;
use crate::position::{Position, PositionSource};
use crate::prices::PriceService;

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// False when monitoring is disabled and the tick was a no-op
    pub evaluated: bool,
    pub positions_checked: usize,
    pub positions_failed: usize,
    pub alerts_dispatched: usize,
    pub alerts_suppressed: usize,
}

/// Drives the fetch -> metrics -> evaluate -> dispatch cycle.
///
/// All collaborators arrive through the constructor; the monitor holds no
/// global state.
pub struct Monitor {
    enabled: bool,
    poll_interval: Duration,
    source: Box<dyn PositionSource>,
    prices: PriceService,
    evaluator: AlertEvaluator,
    cooldown: CooldownTracker,
    dispatcher: NotificationDispatcher,
}

impl Monitor {
    pub fn new(
        config: &Config,
        source: Box<dyn PositionSource>,
        prices: PriceService,
        cooldown: CooldownTracker,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            enabled: config.monitor.enabled,
            poll_interval: Duration::from_secs(config.monitor.poll_interval_secs),
            source,
            prices,
            evaluator: AlertEvaluator::new(config.alert_ranges.clone()),
            cooldown,
            dispatcher,
        }
    }

    /// Run the poll loop until the shutdown signal fires.
    ///
    /// The inter-tick sleep is interruptible, so shutdown completes within
    /// a bounded time rather than waiting out a long interval.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            enabled = self.enabled,
            "Monitor loop started"
        );

        loop {
            if *shutdown.borrow() {
                info!("Shutdown already requested, stopping monitor loop");
                break;
            }

            match self.tick().await {
                Ok(summary) => debug!(?summary, "Tick complete"),
                Err(e) => error!(error = %format!("{e:#}"), "Tick failed, retrying next interval"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("Shutdown signal received, stopping monitor loop");
                    break;
                }
            }
        }
    }

    /// Run exactly one evaluation cycle.
    ///
    /// Also serves the manual "check alerts now" action from the CLI.
    pub async fn tick(&self) -> Result<TickSummary> {
        if !self.enabled {
            debug!("Alert monitoring disabled, skipping tick");
            return Ok(TickSummary::default());
        }

        let prices = self.prices.refresh().await;

        let positions = self
            .source
            .read_all()
            .await
            .context("Failed to read position snapshot")?;

        let now = Utc::now();
        let mut summary = TickSummary {
            evaluated: true,
            ..TickSummary::default()
        };
        let mut enriched = Vec::with_capacity(positions.len());

        for mut position in positions {
            if let Some(price) = prices.get(&position.asset) {
                position.current_price = *price;
            }

            match self.evaluate_position(&position, now).await {
                Ok((derived, dispatched, suppressed)) => {
                    summary.positions_checked += 1;
                    summary.alerts_dispatched += dispatched;
                    summary.alerts_suppressed += suppressed;
                    enriched.push((position, derived));
                }
                Err(e) => {
                    summary.positions_failed += 1;
                    error!(
                        position_id = %position.id,
                        error = %format!("{e:#}"),
                        "Position evaluation failed, continuing with remaining positions"
                    );
                }
            }
        }

        let totals = metrics::aggregate_totals(&enriched);
        info!(
            positions = summary.positions_checked,
            total_value = %totals.total_value,
            avg_leverage = %totals.avg_leverage,
            avg_travel_percent = %totals.avg_travel_percent,
            avg_heat_index = %totals.avg_heat_index,
            alerts = summary.alerts_dispatched,
            "Evaluation cycle complete"
        );

        Ok(summary)
    }

    /// Evaluate one position, returning its derived metrics and the
    /// (dispatched, cooldown-suppressed) counts.
    async fn evaluate_position(
        &self,
        position: &Position,
        now: chrono::DateTime<Utc>,
    ) -> Result<(metrics::PositionMetrics, usize, usize)> {
        position.validate()?;

        let derived = metrics::compute(position);
        let events = self.evaluator.evaluate(position, &derived, now);

        let mut dispatched = 0;
        let mut suppressed = 0;
        for event in events {
            if self.cooldown.allow(&event.position_id, event.metric, now) {
                self.dispatcher.dispatch(&event).await;
                dispatched += 1;
            } else {
                debug!(
                    position_id = %event.position_id,
                    metric = %event.metric,
                    "Alert suppressed by cooldown"
                );
                suppressed += 1;
            }
        }

        Ok((derived, dispatched, suppressed))
    }
}
