//! Fixed-interval poll schedule: one fetch immediately, then one per
//! interval until cancelled. Ticks are not held back by outstanding
//! requests.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next: Option<Instant>,
}

impl PollSchedule {
    /// Start polling; the first tick is due at `now`.
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: Some(now),
        }
    }

    /// Consume a due tick. Missed ticks are not replayed: after a stall the
    /// next tick is one interval from `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next else {
            return false;
        };
        if due > now {
            return false;
        }
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next = Some(next);
        true
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: Duration = Duration::from_secs(5);

    #[test]
    fn first_tick_is_immediate_then_fixed_interval() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::start(FIVE, t0);
        assert!(schedule.tick(t0));
        assert!(!schedule.tick(t0 + Duration::from_secs(4)));
        assert!(schedule.tick(t0 + FIVE));
        assert_eq!(schedule.next_due(), Some(t0 + FIVE * 2));
    }

    #[test]
    fn stall_does_not_burst() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::start(FIVE, t0);
        schedule.tick(t0);
        let late = t0 + Duration::from_secs(23);
        assert!(schedule.tick(late));
        assert!(!schedule.tick(late));
        assert_eq!(schedule.next_due(), Some(late + FIVE));
    }

    #[test]
    fn cancelled_schedule_never_fires() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::start(FIVE, t0);
        schedule.cancel();
        assert!(!schedule.is_active());
        assert!(!schedule.tick(t0 + FIVE * 10));
    }
}
