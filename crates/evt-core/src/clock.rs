//! Wall-clock timestamps with second granularity.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whole seconds since the Unix epoch.
///
/// Sub-second precision is intentionally discarded, so intervals shorter
/// than a second measure as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from seconds since the epoch.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the seconds since the epoch.
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    /// Rounds to the nearest whole second.
    fn from(dt: DateTime<Utc>) -> Self {
        Self((dt.timestamp_millis() + 500).div_euclid(1000))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time for event lifecycles and batch serialization.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(Utc::now())
    }
}

/// A clock that only moves when told to.
///
/// Useful for driving timing events deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicI64::new(start.as_secs()),
        }
    }

    /// Moves the clock forward by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jumps the clock to `at`.
    pub fn set(&self, at: Timestamp) {
        self.secs.store(at.as_secs(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn datetime_rounds_to_nearest_second() {
        let down = Utc.timestamp_millis_opt(1_700_000_000_499).unwrap();
        let up = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        assert_eq!(Timestamp::from(down).as_secs(), 1_700_000_000);
        assert_eq!(Timestamp::from(up).as_secs(), 1_700_000_001);
    }

    #[test]
    fn manual_clock_advances_and_jumps() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        assert_eq!(clock.now().as_secs(), 100);
        clock.advance(5);
        assert_eq!(clock.now().as_secs(), 105);
        clock.set(Timestamp::from_secs(10));
        assert_eq!(clock.now().as_secs(), 10);
    }

    #[test]
    fn timestamp_serializes_as_integer() {
        let json = serde_json::to_string(&Timestamp::from_secs(42)).unwrap();
        assert_eq!(json, "42");
    }
}
