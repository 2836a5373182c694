//! Delivery failures reported by [`crate::EventBus::publish`].

use std::error::Error;
use std::fmt;

use crate::payloads::EventId;

/// Result alias for bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Publishing did not reach a live subscriber.
///
/// The event has already been appended to the replay ring, so late
/// subscribers still see it; callers usually log this and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBusError {
    /// Every receiver had been dropped when the event was sent.
    NoSubscribers {
        /// Id assigned to the retained event.
        event_id: EventId,
        /// Kind of the retained event.
        event_kind: &'static str,
    },
}

impl EventBusError {
    /// Id of the event that went undelivered.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        let Self::NoSubscribers { event_id, .. } = self;
        *event_id
    }

    /// Kind of the event that went undelivered.
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        let Self::NoSubscribers { event_kind, .. } = self;
        *event_kind
    }
}

impl fmt::Display for EventBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubscribers { .. } => f.write_str("event had no live subscribers"),
        }
    }
}

impl Error for EventBusError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_expose_the_retained_event() {
        let err = EventBusError::NoSubscribers {
            event_id: 7,
            event_kind: "import_dispatched",
        };
        assert_eq!((err.event_id(), err.event_kind()), (7, "import_dispatched"));
        assert_eq!(err.to_string(), "event had no live subscribers");
        assert!(err.source().is_none());
    }
}
