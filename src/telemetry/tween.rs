//! Time-driven interpolation between successive readings.
//!
//! Duration is proportional to the size of the change and capped:
//! counters take 1 ms per unit up to `counter_max`, bars take 10 ms per
//! percentage point up to `bar_max`. Progress is computed from the elapsed
//! monotonic time, so a late frame jumps ahead instead of slowing down.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: f64,
    to: f64,
    start: Instant,
    duration: Duration,
    secs_per_unit: f64,
    cap: Duration,
}

impl Tween {
    /// Scalar counter (bytes, ops, whole percent).
    pub fn counter(value: f64, cap: Duration, now: Instant) -> Self {
        Self::settled(value, 0.001, cap, now)
    }

    /// Percentage bar.
    pub fn bar(value: f64, cap: Duration, now: Instant) -> Self {
        Self::settled(value, 0.01, cap, now)
    }

    fn settled(value: f64, secs_per_unit: f64, cap: Duration, now: Instant) -> Self {
        Self {
            from: value,
            to: value,
            start: now,
            duration: Duration::ZERO,
            secs_per_unit,
            cap,
        }
    }

    /// Animate from the currently displayed value to `target`.
    pub fn retarget(&mut self, target: f64, now: Instant) {
        let current = self.value_at(now);
        let secs = (target - current).abs() * self.secs_per_unit;
        self.from = current;
        self.to = target;
        self.start = now;
        self.duration = Duration::from_secs_f64(secs).min(self.cap);
    }

    pub fn value_at(&self, now: Instant) -> f64 {
        let progress = self.progress(now);
        self.from + (self.to - self.from) * progress
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}
