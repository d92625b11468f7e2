//! Typed listener registry.
//!
//! Each channel has its own callback type, so a listener only ever sees
//! the payload of the event it subscribed to.

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeValue;
use crate::metadata::Metadata;

/// The closed set of events a thing emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AttributeChanged,
    InputStateChanged,
    OutputStateChanged,
    MetaChanged,
}

/// Which slot of an attribute was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Read from the device.
    Input,
    /// Set locally, headed for the device.
    Output,
}

impl Direction {
    #[must_use]
    pub fn event_kind(self) -> EventKind {
        match self {
            Self::Input => EventKind::InputStateChanged,
            Self::Output => EventKind::OutputStateChanged,
        }
    }
}

/// Payload of an attribute-level notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub code: String,
    pub purpose: Option<String>,
    pub direction: Direction,
    pub value: Option<AttributeValue>,
}

/// Payload of an input/output-state notification: every attribute of the
/// batch whose slot in `direction` changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub direction: Direction,
    pub changes: Vec<AttributeChange>,
}

impl StateChange {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.direction.event_kind()
    }
}

pub type AttributeListener = Box<dyn FnMut(&AttributeChange) + Send>;
pub type StateListener = Box<dyn FnMut(&StateChange) + Send>;
pub type MetaListener = Box<dyn FnMut(&Metadata) + Send>;

/// Listeners of one thing. Append-only.
#[derive(Default)]
pub(crate) struct Listeners {
    /// Keyed by attribute code; `None` listens to every attribute.
    attribute: Vec<(Option<String>, AttributeListener)>,
    state: Vec<StateListener>,
    meta: Vec<MetaListener>,
}

impl Listeners {
    pub(crate) fn on_attribute(&mut self, code: Option<String>, listener: AttributeListener) {
        self.attribute.push((code, listener));
    }

    pub(crate) fn on_state(&mut self, listener: StateListener) {
        self.state.push(listener);
    }

    pub(crate) fn on_meta(&mut self, listener: MetaListener) {
        self.meta.push(listener);
    }

    pub(crate) fn attribute_changed(&mut self, change: &AttributeChange) {
        for (code, listener) in &mut self.attribute {
            if code.as_deref().is_none_or(|code| code == change.code) {
                listener(change);
            }
        }
    }

    pub(crate) fn state_changed(&mut self, change: &StateChange) {
        for listener in &mut self.state {
            listener(change);
        }
    }

    pub(crate) fn meta_changed(&mut self, metadata: &Metadata) {
        for listener in &mut self.meta {
            listener(metadata);
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("attribute", &self.attribute.len())
            .field("state", &self.state.len())
            .field("meta", &self.meta.len())
            .finish()
    }
}
