//! Contiguous spans of active tracking time.

use crate::clock::Timestamp;
use crate::error::TrackerError;

const STOP_BEFORE_START: &str = "stop timestamp precedes start timestamp";

/// A start timestamp with an optional stop timestamp.
///
/// Start is inclusive and stop exclusive. Once set, `stop >= start` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    start: Timestamp,
    stop: Option<Timestamp>,
}

impl TimeInterval {
    /// Creates an interval, closed if `stop` is given.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::TimeInterval`] if `stop` precedes `start`.
    pub fn new(start: Timestamp, stop: Option<Timestamp>) -> Result<Self, TrackerError> {
        if stop.is_some_and(|stop| stop < start) {
            return Err(TrackerError::interval(STOP_BEFORE_START));
        }
        Ok(Self { start, stop })
    }

    /// Creates an open interval beginning at `start`.
    #[must_use]
    pub const fn open(start: Timestamp) -> Self {
        Self { start, stop: None }
    }

    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub const fn stop(&self) -> Option<Timestamp> {
        self.stop
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.stop.is_some()
    }

    /// Closes the interval at `stop`.
    ///
    /// A second call overwrites the previous stop.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::TimeInterval`] if `stop` precedes the start.
    pub fn set_stop(&mut self, stop: Timestamp) -> Result<(), TrackerError> {
        if stop < self.start {
            return Err(TrackerError::interval(STOP_BEFORE_START));
        }
        self.stop = Some(stop);
        Ok(())
    }

    /// Length of the interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::TimeInterval`] while the interval is open.
    pub fn size(&self) -> Result<u64, TrackerError> {
        let stop = self
            .stop
            .ok_or(TrackerError::interval("interval has no stop timestamp"))?;
        Ok(stop.as_secs().abs_diff(self.start.as_secs()))
    }
}
