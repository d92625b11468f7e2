//! Event bus port: publish/subscribe for thing events.

use std::future::Future;

use thinghub_domain::error::ThingError;
use thinghub_domain::event::Event;

/// Publishes thing events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ThingError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ThingError>> + Send {
        (**self).publish(event)
    }
}
