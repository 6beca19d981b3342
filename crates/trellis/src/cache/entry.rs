//! TTL-stamped cache entries.
//!
//! Validity is re-checked against a [`ClockSource`] on every read. Nothing
//! expires on a timer.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Source of the current time for TTL checks.
pub trait ClockSource: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A value with the time it was written and how long it stays valid.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// When the value was written
    pub written_at: DateTime<Utc>,
    /// How long the value stays valid
    pub ttl: TimeDelta,
}

impl<T> CacheEntry<T> {
    /// Stamp `data` as written at `written_at`.
    pub fn new(data: T, written_at: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            data,
            written_at,
            ttl,
        }
    }

    /// An entry is valid while `now - written_at <= ttl`, boundary included.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.written_at <= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case::just_written(0, true)]
    #[case::before_boundary(29_999, true)]
    #[case::at_boundary(30_000, true)]
    #[case::after_boundary(30_001, false)]
    fn ttl_boundary_is_inclusive(#[case] elapsed_ms: i64, #[case] valid: bool) {
        let entry = CacheEntry::new((), start(), TimeDelta::seconds(30));
        let now = start() + TimeDelta::milliseconds(elapsed_ms);
        assert_eq!(entry.is_valid_at(now), valid);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(start());
        clock.advance(TimeDelta::seconds(5));
        assert_eq!(clock.now(), start() + TimeDelta::seconds(5));
    }
}
