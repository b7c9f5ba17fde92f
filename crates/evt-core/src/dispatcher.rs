//! The capability through which fired events leave the tracker.

use crate::error::TrackerError;
use crate::event::Event;

/// Accepts fired events into a pending batch.
///
/// Implementations decide when and how the batch is delivered.
pub trait Dispatcher: Send + Sync {
    /// Accepts a fired event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::BadArgument`] if the event has not fired.
    /// Must not fail for a fired event.
    fn submit(&self, event: &Event) -> Result<(), TrackerError>;
}
