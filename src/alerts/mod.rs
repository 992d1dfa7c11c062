//! Threshold alerting: zone classification and cooldown suppression.

mod cooldown;
mod evaluator;

pub use cooldown::CooldownTracker;
pub use evaluator::{AlertEvaluator, AlertEvent, AlertZone};
