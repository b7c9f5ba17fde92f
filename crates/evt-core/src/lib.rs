//! Core event tracking for evt.
//!
//! This crate contains:
//! - Event lifecycles: single, volume and timing events that fire once
//! - Time intervals and active-time accumulation across pause/resume
//! - The batch wire message and its protocol version
//! - The [`Dispatcher`] capability and the [`Tracker`] context

pub mod batch;
pub mod clock;
mod dispatcher;
mod error;
pub mod event;
pub mod interval;
mod tracker;

pub use batch::{EventBatch, PROTOCOL_VERSION, WireEvent, WireMessage};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use dispatcher::Dispatcher;
pub use error::TrackerError;
pub use event::{Event, EventKind, TimingState, Volume};
pub use interval::TimeInterval;
pub use tracker::Tracker;
