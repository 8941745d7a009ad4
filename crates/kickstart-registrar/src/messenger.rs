// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Publish/subscribe bus keyed by [`EventType`].
//!
//! Each event type has its own broadcast channel and remembers the last event
//! published on it; a new subscriber sees that event first, then live ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::event::{Event, EventType};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct Channel {
    tx: broadcast::Sender<Event>,
    last: Option<Event>,
}

impl Channel {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, last: None }
    }
}

/// Event bus. Clones share the same channels.
#[derive(Debug, Clone, Default)]
pub struct Messenger {
    channels: Arc<Mutex<HashMap<EventType, Channel>>>,
}

impl Messenger {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber of its type and remember it
    /// for later subscribers.
    pub fn publish(&self, event: Event) {
        let mut channels = self.lock();
        let channel = channels.entry(event.event_type).or_insert_with(Channel::new);
        channel.last = Some(event.clone());
        // no receivers is fine; the event is still replayed to later subscribers
        let delivered = channel.tx.send(event).unwrap_or(0);
        debug!(delivered, "published event");
    }

    /// Subscribe to one event type.
    pub fn subscribe(&self, event_type: EventType) -> EventSubscriber {
        let mut channels = self.lock();
        let channel = channels.entry(event_type).or_insert_with(Channel::new);
        EventSubscriber {
            event_type,
            replay: channel.last.clone(),
            rx: channel.tx.subscribe(),
        }
    }

    /// Forget the remembered event of `event_type`, so new subscribers start
    /// with live events only.
    pub fn clear_event(&self, event_type: EventType) {
        if let Some(channel) = self.lock().get_mut(&event_type) {
            channel.last = None;
        }
    }

    /// Last event published for `event_type`, if not cleared.
    pub fn last_event(&self, event_type: EventType) -> Option<Event> {
        self.lock()
            .get(&event_type)
            .and_then(|channel| channel.last.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventType, Channel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of one event type.
#[derive(Debug)]
pub struct EventSubscriber {
    event_type: EventType,
    replay: Option<Event>,
    rx: broadcast::Receiver<Event>,
}

impl EventSubscriber {
    /// Event type this subscriber listens to.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Next event: the replayed one first, then live events.
    ///
    /// Returns `None` once the bus is gone. A subscriber that falls too far
    /// behind skips the events it missed.
    pub async fn recv(&mut self) -> Option<Event> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(event = %self.event_type, skipped, "subscriber lagged; events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
