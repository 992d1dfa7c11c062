//! Per-(position, metric) alert suppression window.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::metrics::Metric;

/// Suppresses repeat alerts for the same position and metric.
///
/// State is in-memory for the process lifetime and resets on restart; the
/// worst case after a restart is a single duplicate notification.
/// Suppression is purely time-based: a return to Normal does not clear the
/// window. Keyed by metric, not by severity level, so an escalation from
/// Warning to Danger inside the window stays suppressed.
pub struct CooldownTracker {
    cooldown: Duration,
    last_triggered: Mutex<HashMap<(String, Metric), DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs as i64),
            last_triggered: Mutex::new(HashMap::new()),
        }
    }

    /// Check-and-set in one step: returns true and records `now` iff the
    /// cooldown window for this (position, metric) has elapsed. The map
    /// lock makes the pair atomic, so concurrent callers cannot both pass
    /// for the same key.
    pub fn allow(&self, position_id: &str, metric: Metric, now: DateTime<Utc>) -> bool {
        let mut map = self
            .last_triggered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let key = (position_id.to_string(), metric);
        match map.get(&key) {
            Some(last) if now - *last < self.cooldown => false,
            _ => {
                map.insert(key, now);
                true
            }
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.last_triggered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_trigger_allowed() {
        let tracker = CooldownTracker::new(600);
        assert!(tracker.allow("pos-1", Metric::TravelPercent, Utc::now()));
        assert_eq!(tracker.tracked(), 1);
    }

    #[test]
    fn test_repeat_within_window_suppressed() {
        let tracker = CooldownTracker::new(600);
        let t0 = Utc::now();
        assert!(tracker.allow("pos-1", Metric::TravelPercent, t0));
        // 10 seconds later: still inside the 600s window
        assert!(!tracker.allow("pos-1", Metric::TravelPercent, t0 + Duration::seconds(10)));
        // 601 seconds later: window elapsed
        assert!(tracker.allow("pos-1", Metric::TravelPercent, t0 + Duration::seconds(601)));
    }

    #[test]
    fn test_suppressed_call_does_not_extend_window() {
        let tracker = CooldownTracker::new(600);
        let t0 = Utc::now();
        assert!(tracker.allow("pos-1", Metric::TravelPercent, t0));
        assert!(!tracker.allow("pos-1", Metric::TravelPercent, t0 + Duration::seconds(599)));
        // Window measured from t0, not from the suppressed attempt
        assert!(tracker.allow("pos-1", Metric::TravelPercent, t0 + Duration::seconds(600)));
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = CooldownTracker::new(600);
        let t0 = Utc::now();
        assert!(tracker.allow("pos-1", Metric::TravelPercent, t0));
        // Different metric, same position
        assert!(tracker.allow("pos-1", Metric::Leverage, t0));
        // Different position, same metric
        assert!(tracker.allow("pos-2", Metric::TravelPercent, t0));
        assert_eq!(tracker.tracked(), 3);
    }

    #[test]
    fn test_exact_boundary_allows() {
        // now - last == cooldown is allowed (>= rule)
        let tracker = CooldownTracker::new(600);
        let t0 = Utc::now();
        assert!(tracker.allow("pos-1", Metric::HeatIndex, t0));
        assert!(tracker.allow("pos-1", Metric::HeatIndex, t0 + Duration::seconds(600)));
    }
}
