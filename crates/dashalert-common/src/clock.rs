//! Injectable wall-clock source.
//!
//! Every timestamp the repository persists comes from a [`Clock`]. Mutating
//! operations read it exactly once and reuse that instant for every column
//! they write.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// A zero-argument producer of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: every call returns an instant one step
/// after the previous one.
///
/// # Examples
///
/// ```
/// use dashalert_common::clock::{Clock, StepClock};
///
/// let clock = StepClock::default();
/// let a = clock.now();
/// let b = clock.now();
/// assert!(a < b);
/// assert_eq!((b - a).num_seconds(), 1);
/// ```
#[derive(Debug)]
pub struct StepClock {
    next_millis: AtomicI64,
    step_millis: i64,
}

impl StepClock {
    /// Starts at `start` and advances by `step` on every call.
    ///
    /// Millisecond resolution; a step below one millisecond is raised to one
    /// so successive instants stay distinct.
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next_millis: AtomicI64::new(start.timestamp_millis()),
            step_millis: step.num_milliseconds().max(1),
        }
    }
}

impl Default for StepClock {
    /// Starts at the unix epoch and advances one second per call.
    fn default() -> Self {
        Self {
            next_millis: AtomicI64::new(0),
            step_millis: 1_000,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn step_clock_strictly_increases() {
        let clock = StepClock::default();
        let mut prev = clock.now();
        for _ in 0..10 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn step_clock_honours_start_and_step() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = StepClock::new(start, Duration::seconds(30));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::seconds(30));
    }

    #[test]
    fn step_clock_keeps_sub_second_steps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = StepClock::new(start, Duration::milliseconds(500));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::milliseconds(500));
        assert_eq!(clock.now(), start + Duration::seconds(1));
    }

    #[test]
    fn step_clock_is_shareable_across_threads() {
        let clock = Arc::new(StepClock::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..25).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 100);
    }

    #[test]
    fn system_clock_is_close_to_now() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
