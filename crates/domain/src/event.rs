//! Event: an owned record of a notification a thing emitted, suitable for
//! publishing outside the thing (event bus, logs, subscribers).

use serde::{Deserialize, Serialize};

use crate::thing::{AttributeChange, EventKind};
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Code of the emitting thing's type.
    pub thing: String,
    /// URN of the emitting thing, once it has been bound.
    pub thing_id: Option<String>,
    /// Empty for [`EventKind::MetaChanged`].
    pub changes: Vec<AttributeChange>,
    pub timestamp: Timestamp,
}

impl Event {
    #[must_use]
    pub fn new(
        kind: EventKind,
        thing: impl Into<String>,
        thing_id: Option<String>,
        changes: Vec<AttributeChange>,
    ) -> Self {
        Self {
            kind,
            thing: thing.into(),
            thing_id,
            changes,
            timestamp: now(),
        }
    }
}
