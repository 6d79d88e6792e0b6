//! Fixed-timestep economy clock using an accumulator pattern.
//!
//! The host calls `update()` once per frame with a wall-clock timestamp.
//! GameTime converts the variable frame delta into a whole number of fixed
//! ticks, carrying the remainder, so a throttled background tab catches up
//! on its next frame instead of losing production.

/// Result of feeding one wall-clock timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStep {
    /// Wall-clock milliseconds since the previous frame (after clamping).
    pub elapsed_ms: f64,
    /// Discrete ticks to run this frame.
    pub ticks: u32,
}

pub struct GameTime {
    /// Milliseconds per tick (e.g. 100ms = 10 ticks/sec)
    ms_per_tick: f64,
    /// Longest gap honoured in one frame.
    max_catch_up_ms: f64,
    /// Accumulated milliseconds not yet consumed as ticks
    accumulator: f64,
    /// Total elapsed ticks since creation
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None if first frame
    last_timestamp: Option<f64>,
}

impl GameTime {
    /// Create a new GameTime with the given tick rate.
    /// `ticks_per_sec`: how many economy ticks per real-time second (e.g. 10).
    pub fn new(ticks_per_sec: u32, max_catch_up_ms: f64) -> Self {
        Self {
            ms_per_tick: 1000.0 / ticks_per_sec.max(1) as f64,
            max_catch_up_ms: max_catch_up_ms.max(0.0),
            accumulator: 0.0,
            total_ticks: 0,
            last_timestamp: None,
        }
    }

    /// Feed wall-clock timestamp (from `performance.now()` or similar).
    /// Returns the elapsed time and the number of ticks to process.
    pub fn update(&mut self, now_ms: f64) -> FrameStep {
        let delta = match self.last_timestamp {
            // Clock going backwards counts as no time; huge gaps are capped.
            Some(prev) => (now_ms - prev).clamp(0.0, self.max_catch_up_ms),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = (self.accumulator / self.ms_per_tick) as u32;
        self.accumulator -= ticks as f64 * self.ms_per_tick;
        self.total_ticks += ticks as u64;
        FrameStep {
            elapsed_ms: delta,
            ticks,
        }
    }

    /// Timestamp of the most recent frame, if any.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn ms_per_tick(&self) -> f64 {
        self.ms_per_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: f64 = 3_600_000.0;

    #[test]
    fn first_frame_returns_zero_ticks() {
        let mut gt = GameTime::new(10, HOUR);
        let step = gt.update(0.0);
        assert_eq!(step.ticks, 0);
        assert!(step.elapsed_ms.abs() < 1e-12);
    }

    #[test]
    fn one_tick_at_100ms() {
        let mut gt = GameTime::new(10, HOUR); // 100ms per tick
        gt.update(0.0);
        assert_eq!(gt.update(100.0).ticks, 1);
        assert_eq!(gt.total_ticks, 1);
    }

    #[test]
    fn remainder_carried_over() {
        let mut gt = GameTime::new(10, HOUR);
        gt.update(0.0);
        assert_eq!(gt.update(150.0).ticks, 1); // 50ms left over
        assert_eq!(gt.update(200.0).ticks, 1); // 50 + 50
        assert_eq!(gt.total_ticks, 2);
    }

    #[test]
    fn background_gap_catches_up() {
        let mut gt = GameTime::new(10, HOUR);
        gt.update(0.0);
        // Tab throttled for 10 seconds
        let step = gt.update(10_000.0);
        assert_eq!(step.ticks, 100);
        assert!((step.elapsed_ms - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn gap_beyond_cap_is_clamped() {
        let mut gt = GameTime::new(10, 500.0);
        gt.update(0.0);
        let step = gt.update(10_000.0);
        assert_eq!(step.ticks, 5);
        assert!((step.elapsed_ms - 500.0).abs() < 1e-9);
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let mut gt = GameTime::new(10, HOUR);
        gt.update(1_000.0);
        let step = gt.update(500.0);
        assert_eq!(step.ticks, 0);
        assert!(step.elapsed_ms.abs() < 1e-12);
        assert_eq!(gt.update(600.0).ticks, 1);
    }

    #[test]
    fn steady_60fps() {
        let mut gt = GameTime::new(10, HOUR);
        gt.update(0.0);
        let mut total = 0u32;
        // 60 frames at ~16.67ms each = 1 second
        for i in 1..=60 {
            total += gt.update(i as f64 * 16.667).ticks;
        }
        assert!((9..=11).contains(&total), "expected ~10 ticks, got {}", total);
    }
}
