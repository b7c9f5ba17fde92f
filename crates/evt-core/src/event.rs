//! Tagged occurrences and their fire-once lifecycles.
//!
//! Three flavours share one [`Event`] type:
//!
//! - [`EventKind::Single`]: a discrete occurrence, one timestamp.
//! - [`EventKind::Volume`]: an occurrence with a non-negative quantity.
//! - [`EventKind::Timing`]: a quantity derived from active time accumulated
//!   over one or more start/pause/resume cycles.
//!
//! Every flavour fires exactly once. After firing, the event is a read-only
//! record that can only be serialized.

use serde::{Deserialize, Serialize};

use crate::batch::WireEvent;
use crate::clock::Timestamp;
use crate::error::TrackerError;
use crate::interval::TimeInterval;
use crate::tracker::Tracker;

const ALREADY_FIRED: &str = "event cannot be fired more than once";
const NOT_FIRED: &str = "event was not fired yet";
const NOT_TIMING: &str = "operation requires a timing event";

/// A validated non-negative event quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(u64);

impl Volume {
    /// Creates a volume after validation.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::BadArgument`] if `value` is negative.
    pub fn new(value: i64) -> Result<Self, TrackerError> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| TrackerError::bad_argument("event volume must be non-negative"))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for Volume {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a timing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingState {
    Initial,
    Started,
    Paused,
    Fired,
}

/// Active-time bookkeeping for a timing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    state: TimingState,
    closed: Vec<TimeInterval>,
    open: Option<TimeInterval>,
    volume: Volume,
}

impl Timing {
    fn new() -> Self {
        Self {
            state: TimingState::Initial,
            closed: Vec::new(),
            open: None,
            volume: Volume::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> TimingState {
        self.state
    }

    /// Closed intervals in the order they were recorded.
    #[must_use]
    pub fn intervals(&self) -> &[TimeInterval] {
        &self.closed
    }

    /// Start of the first recorded interval, if any.
    fn arisen(&self) -> Option<Timestamp> {
        self.closed
            .first()
            .or(self.open.as_ref())
            .map(TimeInterval::start)
    }

    fn closed_total(&self) -> Result<u64, TrackerError> {
        let mut total = 0u64;
        for interval in &self.closed {
            total = total.saturating_add(interval.size()?);
        }
        Ok(total)
    }

    fn start(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        match self.state {
            TimingState::Initial => {
                self.open = Some(TimeInterval::open(now));
                self.state = TimingState::Started;
                Ok(())
            }
            TimingState::Started => Err(TrackerError::illegal_state("event was already started")),
            TimingState::Paused => Err(TrackerError::illegal_state(
                "paused event must be resumed, not started",
            )),
            TimingState::Fired => Err(TrackerError::illegal_state(ALREADY_FIRED)),
        }
    }

    fn pause(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        if self.state != TimingState::Started {
            return Err(TrackerError::illegal_state(
                "event was not started or resumed",
            ));
        }
        let closed = self.closed_open_interval(now)?;
        self.closed.push(closed);
        self.open = None;
        self.state = TimingState::Paused;
        Ok(())
    }

    fn resume(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        if self.state != TimingState::Paused {
            return Err(TrackerError::illegal_state("event was not paused"));
        }
        self.open = Some(TimeInterval::open(now));
        self.state = TimingState::Started;
        Ok(())
    }

    /// Closes any open interval and sums active time into the volume.
    fn fire(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        let last = match self.state {
            TimingState::Started => Some(self.closed_open_interval(now)?),
            TimingState::Paused => None,
            TimingState::Initial => {
                return Err(TrackerError::illegal_state("event was not started"));
            }
            TimingState::Fired => return Err(TrackerError::illegal_state(ALREADY_FIRED)),
        };

        let mut total = self.closed_total()?;
        if let Some(interval) = &last {
            total = total.saturating_add(interval.size()?);
        }

        self.closed.extend(last);
        self.open = None;
        self.volume = Volume(total);
        self.state = TimingState::Fired;
        Ok(())
    }

    /// Copy of the open interval closed at `now`. Leaves `self` untouched.
    fn closed_open_interval(&self, now: Timestamp) -> Result<TimeInterval, TrackerError> {
        let mut interval = self
            .open
            .ok_or(TrackerError::illegal_state("event has no open interval"))?;
        interval.set_stop(now)?;
        Ok(interval)
    }
}

/// Variant-specific event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Single,
    Volume(Volume),
    Timing(Timing),
}

/// A tagged occurrence that fires exactly once.
///
/// Tags are caller-chosen correlation keys; uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    tag: String,
    fired_at: Option<Timestamp>,
    kind: EventKind,
}

impl Event {
    /// Creates a discrete event.
    pub fn single(tag: impl Into<String>) -> Self {
        Self::with_kind(tag, EventKind::Single)
    }

    /// Creates an event carrying a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::BadArgument`] if `volume` is negative.
    pub fn volume(tag: impl Into<String>, volume: i64) -> Result<Self, TrackerError> {
        Ok(Self::with_kind(tag, EventKind::Volume(Volume::new(volume)?)))
    }

    /// Creates a timing event in its initial state.
    pub fn timing(tag: impl Into<String>) -> Self {
        Self::with_kind(tag, EventKind::Timing(Timing::new()))
    }

    fn with_kind(tag: impl Into<String>, kind: EventKind) -> Self {
        Self {
            tag: tag.into(),
            fired_at: None,
            kind,
        }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// When the event was fired.
    #[must_use]
    pub const fn fired_at(&self) -> Option<Timestamp> {
        self.fired_at
    }

    #[must_use]
    pub const fn is_fired(&self) -> bool {
        self.fired_at.is_some()
    }

    /// The event's canonical timestamp.
    ///
    /// For single and volume events this is the fire time, `None` before
    /// firing. For timing events it is the start of the first interval.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] for a timing event that
    /// was never started.
    pub fn time_arised(&self) -> Result<Option<Timestamp>, TrackerError> {
        match &self.kind {
            EventKind::Single | EventKind::Volume(_) => Ok(self.fired_at),
            EventKind::Timing(timing) if timing.state == TimingState::Initial => {
                Err(TrackerError::illegal_state("event was not started yet"))
            }
            EventKind::Timing(timing) => Ok(timing.arisen()),
        }
    }

    /// Current quantity, `None` for single events.
    #[must_use]
    pub const fn volume_value(&self) -> Option<Volume> {
        match &self.kind {
            EventKind::Single => None,
            EventKind::Volume(volume) => Some(*volume),
            EventKind::Timing(timing) => Some(timing.volume),
        }
    }

    /// Replaces the quantity of a volume or timing event.
    ///
    /// A timing event recomputes its volume when fired, so a value set here
    /// is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::BadArgument`] for a negative value or a
    /// single event, and [`TrackerError::IllegalEventState`] once fired.
    pub fn set_volume(&mut self, volume: i64) -> Result<(), TrackerError> {
        let volume = Volume::new(volume)?;
        if self.is_fired() {
            return Err(TrackerError::illegal_state("fired event is read-only"));
        }
        match &mut self.kind {
            EventKind::Single => Err(TrackerError::bad_argument("single events carry no volume")),
            EventKind::Volume(current) => {
                *current = volume;
                Ok(())
            }
            EventKind::Timing(timing) => {
                timing.volume = volume;
                Ok(())
            }
        }
    }

    /// State of a timing event, `None` for other kinds.
    #[must_use]
    pub const fn timing_state(&self) -> Option<TimingState> {
        match &self.kind {
            EventKind::Timing(timing) => Some(timing.state),
            _ => None,
        }
    }

    /// Seconds of active time recorded in closed intervals so far.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] for non-timing events.
    pub fn active_seconds(&self) -> Result<u64, TrackerError> {
        self.as_timing()?.closed_total()
    }

    /// Opens the first interval of a timing event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] unless the event is a
    /// timing event in its initial state.
    pub fn start(&mut self, tracker: &Tracker) -> Result<(), TrackerError> {
        let now = tracker.now();
        self.as_timing_mut()?.start(now)
    }

    /// Closes the open interval; paused time is not counted.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] unless the event is a
    /// started timing event.
    pub fn pause(&mut self, tracker: &Tracker) -> Result<(), TrackerError> {
        let now = tracker.now();
        self.as_timing_mut()?.pause(now)
    }

    /// Opens a new interval after a pause.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] unless the event is a
    /// paused timing event.
    pub fn resume(&mut self, tracker: &Tracker) -> Result<(), TrackerError> {
        let now = tracker.now();
        self.as_timing_mut()?.resume(now)
    }

    /// Finalizes the event and submits it to the tracker's dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UninitializedTracker`] if no dispatcher is
    /// set and [`TrackerError::IllegalEventState`] if the event already
    /// fired (or, for timing events, was never started). The event is left
    /// unchanged on error.
    pub fn fire(&mut self, tracker: &Tracker) -> Result<(), TrackerError> {
        let dispatcher = tracker.dispatcher()?;
        self.mark_fired(tracker.now())?;
        tracing::debug!(tag = %self.tag, "event fired");
        dispatcher.submit(self)
    }

    fn mark_fired(&mut self, now: Timestamp) -> Result<(), TrackerError> {
        match &mut self.kind {
            EventKind::Timing(timing) => timing.fire(now)?,
            EventKind::Single | EventKind::Volume(_) if self.fired_at.is_some() => {
                return Err(TrackerError::illegal_state(ALREADY_FIRED));
            }
            EventKind::Single | EventKind::Volume(_) => {}
        }
        self.fired_at = Some(now);
        Ok(())
    }

    /// Builds the wire representation of a fired event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::IllegalEventState`] before the event fires.
    pub fn to_wire_record(&self) -> Result<WireEvent, TrackerError> {
        if !self.is_fired() {
            return Err(TrackerError::illegal_state(NOT_FIRED));
        }
        let when_arised = self
            .time_arised()?
            .ok_or(TrackerError::illegal_state(NOT_FIRED))?;
        Ok(WireEvent {
            tag: self.tag.clone(),
            when_arised,
            volume: self.volume_value().map(Volume::value),
        })
    }

    fn as_timing(&self) -> Result<&Timing, TrackerError> {
        match &self.kind {
            EventKind::Timing(timing) => Ok(timing),
            _ => Err(TrackerError::illegal_state(NOT_TIMING)),
        }
    }

    fn as_timing_mut(&mut self) -> Result<&mut Timing, TrackerError> {
        match &mut self.kind {
            EventKind::Timing(timing) => Ok(timing),
            _ => Err(TrackerError::illegal_state(NOT_TIMING)),
        }
    }
}
