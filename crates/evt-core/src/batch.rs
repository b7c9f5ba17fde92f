//! Batched wire message assembly.
//!
//! A batch serializes to:
//!
//! ```json
//! {"version":"1.0","events":[{"tag":"page_view","whenArised":1700000000}],"whenSent":1700000005}
//! ```
//!
//! `volume` is present only for volume and timing events. Events keep
//! their submission order.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::TrackerError;
use crate::event::Event;

/// Wire protocol version. Bump on incompatible format changes.
pub const PROTOCOL_VERSION: &str = "1.0";

/// One fired event as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub tag: String,
    pub when_arised: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

/// The full message posted to the collection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub version: String,
    pub events: Vec<WireEvent>,
    pub when_sent: Timestamp,
}

impl WireMessage {
    /// Parses a serialized batch.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Fired events awaiting delivery.
///
/// Only fired events can be added, so every member is a read-only record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    events: Vec<WireEvent>,
}

impl EventBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fired event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::BadArgument`] if the event has not fired.
    pub fn add_event(&mut self, event: &Event) -> Result<(), TrackerError> {
        if !event.is_fired() {
            return Err(TrackerError::bad_argument(
                "only fired events can be batched",
            ));
        }
        let record = event.to_wire_record()?;
        self.events.push(record);
        Ok(())
    }

    /// Batched events in submission order.
    #[must_use]
    pub fn events(&self) -> &[WireEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes the first `count` events, keeping anything added after them.
    pub fn remove_delivered(&mut self, count: usize) {
        self.events.drain(..count.min(self.events.len()));
    }

    /// Builds the wire message stamped with `when_sent`.
    #[must_use]
    pub fn to_message(&self, when_sent: Timestamp) -> WireMessage {
        WireMessage {
            version: PROTOCOL_VERSION.to_string(),
            events: self.events.clone(),
            when_sent,
        }
    }

    /// Serializes the batch as a JSON string stamped with `when_sent`.
    pub fn serialize(&self, when_sent: Timestamp) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_message(when_sent))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use insta::assert_snapshot;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::dispatcher::testing::RecordingDispatcher;
    use crate::tracker::Tracker;

    fn tracker_at(secs: i64) -> (Tracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(secs)));
        let mut tracker = Tracker::with_clock(clock.clone());
        tracker.set_dispatcher(Arc::new(RecordingDispatcher::default()));
        (tracker, clock)
    }

    #[test]
    fn add_event_rejects_unfired_events() {
        let mut batch = EventBatch::new();
        assert!(matches!(
            batch.add_event(&Event::single("pending")),
            Err(TrackerError::BadArgument { .. })
        ));
        assert!(batch.is_empty());
    }

    #[test]
    fn serialize_matches_wire_format() {
        let (tracker, clock) = tracker_at(1_700_000_000);
        let mut batch = EventBatch::new();

        let mut view = Event::single("page_view");
        view.fire(&tracker).unwrap();
        batch.add_event(&view).unwrap();

        let mut timer = Event::timing("form_fill");
        timer.start(&tracker).unwrap();
        clock.advance(3);
        timer.fire(&tracker).unwrap();
        batch.add_event(&timer).unwrap();

        let json = batch.serialize(Timestamp::from_secs(1_700_000_005)).unwrap();
        assert_snapshot!(json, @r#"{"version":"1.0","events":[{"tag":"page_view","whenArised":1700000000},{"tag":"form_fill","whenArised":1700000000,"volume":3}],"whenSent":1700000005}"#);
    }

    #[test]
    fn round_trip_preserves_order_and_values() {
        let (tracker, clock) = tracker_at(500);
        let mut batch = EventBatch::new();
        for (i, tag) in ["a", "b", "c"].into_iter().enumerate() {
            let mut event = Event::volume(tag, i64::try_from(i).unwrap() * 10).unwrap();
            event.fire(&tracker).unwrap();
            batch.add_event(&event).unwrap();
            clock.advance(1);
        }

        let json = batch.serialize(clock.now()).unwrap();
        let parsed = WireMessage::parse(&json).unwrap();

        assert_eq!(parsed.version, PROTOCOL_VERSION);
        assert_eq!(parsed.events, batch.events());
        assert_eq!(parsed.when_sent, Timestamp::from_secs(503));
        let tags: Vec<_> = parsed.events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["a", "b", "c"]);
    }

    #[test]
    fn empty_batch_serializes_empty_events() {
        let json = EventBatch::new().serialize(Timestamp::from_secs(1)).unwrap();
        assert_snapshot!(json, @r#"{"version":"1.0","events":[],"whenSent":1}"#);
    }

    #[test]
    fn remove_delivered_keeps_later_events() {
        let (tracker, _clock) = tracker_at(10);
        let mut batch = EventBatch::new();
        for tag in ["sent-1", "sent-2", "late"] {
            let mut event = Event::single(tag);
            event.fire(&tracker).unwrap();
            batch.add_event(&event).unwrap();
        }

        batch.remove_delivered(2);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.events()[0].tag, "late");

        batch.remove_delivered(5);
        assert!(batch.is_empty());
    }
}
