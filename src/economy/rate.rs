//! Smoothed "messages/sec" figure for manual typing.
//!
//! Manual messages are credited the moment they happen; this only tracks
//! recent event timestamps so the display can show an average.

use std::collections::VecDeque;

use super::formulas;
use super::state::EconomyState;

/// Default sliding window length.
pub const MANUAL_WINDOW_MS: f64 = 2_000.0;

#[derive(Clone, Debug)]
pub struct ManualRate {
    window_ms: f64,
    /// Event timestamps, oldest first.
    events: VecDeque<f64>,
}

impl Default for ManualRate {
    fn default() -> Self {
        Self::new(MANUAL_WINDOW_MS)
    }
}

impl ManualRate {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(1.0),
            events: VecDeque::new(),
        }
    }

    /// Record a manual event at `now_ms`.
    pub fn record(&mut self, now_ms: f64) {
        self.prune(now_ms);
        self.events.push_back(now_ms);
    }

    /// Events that fall inside the window ending at `now_ms`.
    pub fn events_in_window(&mut self, now_ms: f64) -> usize {
        self.prune(now_ms);
        self.events.len()
    }

    /// Average manual income over the window (messages/sec).
    pub fn rate(&mut self, state: &EconomyState, now_ms: f64) -> f64 {
        let per_sec = self.events_in_window(now_ms) as f64 / (self.window_ms / 1000.0);
        per_sec * formulas::manual_multiplier(state) * formulas::global_message_multiplier(state)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn prune(&mut self, now_ms: f64) {
        let cutoff = now_ms - self.window_ms;
        while self.events.front().is_some_and(|&t| t <= cutoff) {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_is_zero() {
        let mut rate = ManualRate::default();
        let state = EconomyState::new();
        assert!(rate.rate(&state, 10_000.0).abs() < 1e-12);
    }

    #[test]
    fn rate_averages_over_window() {
        let mut rate = ManualRate::default();
        let state = EconomyState::new();
        for i in 0..10 {
            rate.record(1_000.0 + i as f64 * 100.0);
        }
        // 10 events in a 2s window = 5/s
        assert!((rate.rate(&state, 2_000.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn old_events_drop_out() {
        let mut rate = ManualRate::default();
        rate.record(0.0);
        rate.record(500.0);
        rate.record(2_400.0);
        assert_eq!(rate.events_in_window(2_400.0), 2);
        assert_eq!(rate.events_in_window(4_500.0), 0);
    }

    #[test]
    fn rate_includes_multipliers() {
        let mut rate = ManualRate::default();
        let mut state = EconomyState::new();
        state.upgrades.manual_power = 1;
        state.upgrades.message_multiplier = 1;
        rate.record(100.0);
        rate.record(200.0);
        // 1/s x 2 x 1.15
        assert!((rate.rate(&state, 300.0) - 2.3).abs() < 1e-9);
    }
}
