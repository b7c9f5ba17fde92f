//! The entry point application code holds on to.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock, Timestamp};
use crate::dispatcher::Dispatcher;
use crate::error::TrackerError;
use crate::event::Event;

/// Creates events and routes fired ones to the active dispatcher.
///
/// Construct one per process or session and pass it to call sites. At most
/// one dispatcher is active at a time; none is set by default.
pub struct Tracker {
    dispatcher: Option<Arc<dyn Dispatcher>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("has_dispatcher", &self.dispatcher.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    /// Creates a tracker reading the system clock, with no dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a tracker reading `clock`, with no dispatcher.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            dispatcher: None,
            clock,
        }
    }

    /// Current time according to the tracker's clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The active dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UninitializedTracker`] if none is set.
    pub fn dispatcher(&self) -> Result<&Arc<dyn Dispatcher>, TrackerError> {
        self.dispatcher
            .as_ref()
            .ok_or(TrackerError::UninitializedTracker)
    }

    /// Replaces the active dispatcher.
    ///
    /// The previous dispatcher's pending batch is not drained; flush it
    /// first if its events matter.
    pub fn set_dispatcher(&mut self, dispatcher: Arc<dyn Dispatcher>) {
        if self.dispatcher.is_some() {
            tracing::debug!("replacing active dispatcher");
        }
        self.dispatcher = Some(dispatcher);
    }

    /// Unsets the active dispatcher, returning it.
    pub fn clear_dispatcher(&mut self) -> Option<Arc<dyn Dispatcher>> {
        self.dispatcher.take()
    }

    /// Fires a single event, or a volume event when `volume` is given.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UninitializedTracker`] if no dispatcher is
    /// set and [`TrackerError::BadArgument`] for a negative volume.
    pub fn fire(&self, tag: &str, volume: Option<i64>) -> Result<(), TrackerError> {
        self.dispatcher()?;
        let mut event = match volume {
            Some(volume) => Event::volume(tag, volume)?,
            None => Event::single(tag),
        };
        event.fire(self)
    }

    /// Creates and starts a timing event.
    ///
    /// The caller drives the returned event through pause, resume and fire.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UninitializedTracker`] if no dispatcher is set.
    pub fn start(&self, tag: &str) -> Result<Event, TrackerError> {
        self.dispatcher()?;
        let mut event = Event::timing(tag);
        event.start(self)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dispatcher::testing::RecordingDispatcher;

    fn tracker_with_recorder() -> (Tracker, Arc<ManualClock>, Arc<RecordingDispatcher>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(2_000)));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut tracker = Tracker::with_clock(clock.clone());
        tracker.set_dispatcher(dispatcher.clone());
        (tracker, clock, dispatcher)
    }

    #[test]
    fn operations_fail_without_dispatcher() {
        let tracker = Tracker::new();
        assert!(matches!(
            tracker.dispatcher(),
            Err(TrackerError::UninitializedTracker)
        ));
        assert_eq!(
            tracker.fire("page_view", None),
            Err(TrackerError::UninitializedTracker)
        );
        assert!(matches!(
            tracker.start("form_fill"),
            Err(TrackerError::UninitializedTracker)
        ));
    }

    #[test]
    fn fire_without_volume_sends_single_event() {
        let (tracker, _clock, dispatcher) = tracker_with_recorder();
        tracker.fire("page_view", None).unwrap();

        let submitted = dispatcher.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].tag, "page_view");
        assert_eq!(submitted[0].when_arised, Timestamp::from_secs(2_000));
        assert_eq!(submitted[0].volume, None);

        let json = serde_json::to_string(&submitted[0]).unwrap();
        assert!(!json.contains("volume"));
    }

    #[test]
    fn fire_with_volume_validates_and_sends() {
        let (tracker, _clock, dispatcher) = tracker_with_recorder();
        assert!(matches!(
            tracker.fire("download", Some(-3)),
            Err(TrackerError::BadArgument { .. })
        ));
        tracker.fire("download", Some(0)).unwrap();
        assert_eq!(dispatcher.submitted()[0].volume, Some(0));
    }

    #[test]
    fn started_event_submits_once_with_active_time() {
        let (tracker, clock, dispatcher) = tracker_with_recorder();
        let mut event = tracker.start("form_fill").unwrap();
        clock.advance(4);
        event.pause(&tracker).unwrap();
        clock.advance(60);
        event.resume(&tracker).unwrap();
        clock.advance(6);
        event.fire(&tracker).unwrap();

        let submitted = dispatcher.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].volume, Some(10));
    }

    #[test]
    fn set_dispatcher_does_not_drain_previous() {
        let (mut tracker, _clock, first) = tracker_with_recorder();
        tracker.fire("before", None).unwrap();

        let second = Arc::new(RecordingDispatcher::default());
        tracker.set_dispatcher(second.clone());
        tracker.fire("after", None).unwrap();

        assert_eq!(first.submitted().len(), 1);
        assert_eq!(second.submitted().len(), 1);
        assert_eq!(second.submitted()[0].tag, "after");

        assert!(tracker.clear_dispatcher().is_some());
        assert!(tracker.dispatcher().is_err());
    }
}
