//! Event bus routing helpers.

use crate::error::{EventBusError, EventBusResult};
use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::Sender;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

/// Item yielded to subscribers; `Err` reports events skipped because the
/// subscriber lagged behind the channel.
pub type EventItem = Result<EventEnvelope, BroadcastStreamRecvError>;

/// Stream handed to subscribers: replayed backlog first, then live events.
pub type EventStream = Pin<Box<dyn Stream<Item = EventItem> + Send>>;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity (clamped to at least one).
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to live events.
    ///
    /// When `last_event_id` is supplied, retained events newer than it are
    /// yielded ahead of live ones. The live receiver is attached before the
    /// backlog is read, and live events already covered by the backlog are
    /// skipped, so nothing is lost or repeated at the seam. No runtime is
    /// needed to subscribe.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        let live = BroadcastStream::new(self.sender.subscribe());
        let Some(after) = last_event_id else {
            return Box::pin(live);
        };
        let backlog = self.backlog_since(after);
        let seen = backlog.last().map_or(after, |envelope| envelope.id);
        let live = live.filter(move |item| match item {
            Ok(envelope) => envelope.id > seen,
            Err(_) => true,
        });
        Box::pin(tokio_stream::iter(backlog.into_iter().map(Ok::<_, BroadcastStreamRecvError>)).chain(live))
    }

    /// Publish a new event to all subscribers.
    ///
    /// The event is retained for replay even when nobody is listening.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::NoSubscribers`] when no live subscriber
    /// received the event.
    pub fn publish(&self, event: Event) -> EventBusResult<EventId> {
        let event_kind = event.kind();
        // The replay lock spans id assignment through send; replay and live
        // order must match for subscribe to splice them.
        let mut replay = self.lock_replay();
        let id = self.next_id();
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        if replay.len() == self.replay_capacity {
            let _ = replay.pop_front();
        }
        replay.push_back(envelope.clone());
        let sent = self.sender.send(envelope);
        drop(replay);
        sent
            .map(|_| id)
            .map_err(|_| EventBusError::NoSubscribers {
                event_id: id,
                event_kind,
            })
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn next_id(&self) -> EventId {
        let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);
        id
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
