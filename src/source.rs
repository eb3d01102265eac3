//! The seam between the composite stream and its two sub-resources.

use crate::event::Event;
use futures::Stream;

/// An open sub-resource that reports what happens to it as [`Event`]s.
///
/// Opening is done by each implementation's constructor; the stream is how
/// the composite subscribes to it, and `close` releases it.
pub(crate) trait Source: Stream<Item = Event> + Send + Unpin {
    /// Releases the underlying resource. Calling it twice is a no-op.
    fn close(&mut self);
}
