//! Leading + trailing throttle for hover events.
//!
//! The first value after a quiet period passes straight through. Values that
//! arrive inside the interval are coalesced: only the latest one is kept and
//! released by [`Throttle::poll`] once the interval has elapsed. Timestamps
//! are passed in by the caller, so tests can drive the clock directly.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_fire: None, pending: None }
    }

    fn ready(&self, now: Instant) -> bool {
        match self.last_fire {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Offer a new value. Returns it immediately if the interval has elapsed,
    /// otherwise stores it (replacing any older pending value).
    pub fn offer(&mut self, value: T, now: Instant) -> Option<T> {
        if self.ready(now) {
            self.last_fire = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value if its time has come.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// When the pending value becomes due, if there is one.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(self.last_fire.map_or_else(Instant::now, |last| last + self.interval))
    }

    /// Drop any pending value and forget the last fire time.
    pub fn clear(&mut self) {
        self.pending = None;
        self.last_fire = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn first_value_passes_immediately() {
        let mut t = Throttle::new(15 * MS);
        assert_eq!(t.offer(1, Instant::now()), Some(1));
    }

    #[test]
    fn burst_keeps_only_latest_value() {
        let t0 = Instant::now();
        let mut t = Throttle::new(15 * MS);
        assert_eq!(t.offer(1, t0), Some(1));
        assert_eq!(t.offer(2, t0 + 3 * MS), None);
        assert_eq!(t.offer(3, t0 + 9 * MS), None);
        assert_eq!(t.poll(t0 + 14 * MS), None);
        assert_eq!(t.next_due(), Some(t0 + 15 * MS));
        assert_eq!(t.poll(t0 + 15 * MS), Some(3));
        assert_eq!(t.poll(t0 + 60 * MS), None);
    }

    #[test]
    fn trailing_fire_restarts_the_interval() {
        let t0 = Instant::now();
        let mut t = Throttle::new(15 * MS);
        t.offer('a', t0);
        t.offer('b', t0 + 5 * MS);
        assert_eq!(t.poll(t0 + 16 * MS), Some('b'));
        assert_eq!(t.offer('c', t0 + 20 * MS), None);
        assert_eq!(t.offer('d', t0 + 31 * MS), Some('d'));
        assert_eq!(t.next_due(), None);
    }

    #[test]
    fn clear_drops_pending_and_rearms() {
        let t0 = Instant::now();
        let mut t = Throttle::new(15 * MS);
        t.offer(1, t0);
        t.offer(2, t0 + MS);
        t.clear();
        assert_eq!(t.poll(t0 + 100 * MS), None);
        assert_eq!(t.offer(3, t0 + 2 * MS), Some(3));
    }

    #[test]
    fn zero_interval_never_holds_values() {
        let t0 = Instant::now();
        let mut t = Throttle::new(Duration::ZERO);
        assert_eq!(t.offer(1, t0), Some(1));
        assert_eq!(t.offer(2, t0), Some(2));
    }
}
