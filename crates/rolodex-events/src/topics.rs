//! Event topic identifiers used by subscribers.

use crate::payloads::Event;

/// Machine-friendly discriminator for subscribers.
#[must_use]
pub const fn event_kind(event: &Event) -> &'static str {
    event.kind()
}

/// Whether the event reports the end of a run.
#[must_use]
pub const fn is_terminal_event(event: &Event) -> bool {
    matches!(
        event,
        Event::ScanNotFound { .. }
            | Event::ImportDispatched { .. }
            | Event::RunCancelled { .. }
            | Event::RunFailed { .. }
    )
}
