//! Fan-out of thing events to in-process subscribers.

use std::future::Future;

use tokio::sync::broadcast;

use thinghub_domain::error::ThingError;
use thinghub_domain::event::Event;

use crate::ports::EventPublisher;

/// [`EventPublisher`] over a tokio [`broadcast`] channel.
///
/// Every subscriber sees every event published after it subscribed. A
/// subscriber that falls more than `capacity` events behind loses the
/// oldest ones and gets [`broadcast::error::RecvError::Lagged`]. Events
/// published while nobody listens are discarded.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// # Panics
    ///
    /// Panics if `capacity` is zero; the daemon configuration rejects it first.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ThingError>> + Send {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(?kind, receivers, "event published"),
            Err(_) => tracing::trace!(?kind, "event dropped, no subscriber"),
        }
        async { Ok(()) }
    }
}
