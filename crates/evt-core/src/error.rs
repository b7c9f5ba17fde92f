//! Error kinds raised at the point of misuse.

use thiserror::Error;

/// Programmer errors returned by lifecycle, batch and tracker operations.
///
/// Transport failures are not represented here. They are expected runtime
/// conditions and are reported through the dispatcher's callbacks instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Invalid constructor or setter input.
    #[error("bad argument: {reason}")]
    BadArgument { reason: &'static str },

    /// A lifecycle operation was invoked in a state that forbids it.
    #[error("illegal event state: {reason}")]
    IllegalEventState { reason: &'static str },

    /// Malformed interval: stop before start, or size queried while open.
    #[error("time interval error: {reason}")]
    TimeInterval { reason: &'static str },

    /// No dispatcher has been configured on the tracker.
    #[error("tracker was not initialized with a dispatcher")]
    UninitializedTracker,
}

impl TrackerError {
    pub(crate) const fn bad_argument(reason: &'static str) -> Self {
        Self::BadArgument { reason }
    }

    pub(crate) const fn illegal_state(reason: &'static str) -> Self {
        Self::IllegalEventState { reason }
    }

    pub(crate) const fn interval(reason: &'static str) -> Self {
        Self::TimeInterval { reason }
    }
}
