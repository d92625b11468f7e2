//! Thing: the runtime instance of a [`ThingType`], holding live
//! attribute values, the transaction stack, listeners and the driver
//! binding.
//!
//! ## Binding states
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Unbound` | No driver yet; everything works locally, pushes are dropped. |
//! | `Bound` | A driver receives pushes and delivers pulls. |
//! | `Disconnected` | The driver was detached; identity is kept, pushes are dropped. |
//!
//! ## Ordering
//!
//! When a batch of changes is dispatched, per-attribute listeners run
//! first, then the input/output-state listeners, and only then is the
//! batch pushed to the driver as a single call.
//!
//! Keys addressing a sub-entity (`sub/attr`) follow the options of the
//! root's innermost transaction: the sub-entity gets a mirror frame that
//! closes with the root's, and its pushes leave through the root's driver
//! under the qualified key.

mod listeners;
mod snapshot;
mod transaction;

use std::fmt;
use std::time::Duration;

use crate::attribute::{Attribute, AttributeValue, Change, Changes};
use crate::driver::{Driver, PulledCallback};
use crate::error::{NotFoundError, ThingError, ValidationError};
use crate::identity::Identity;
use crate::key::{Intent, Key};
use crate::metadata::{MetaOptions, Metadata};
use crate::model::ThingType;

pub use listeners::{
    AttributeChange, AttributeListener, Direction, EventKind, MetaListener, StateChange,
    StateListener,
};
pub use snapshot::{ReadMode, StateSnapshot};
pub use transaction::TransactionOptions;

use listeners::Listeners;
use transaction::Transaction;

/// Public view of the driver binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound,
    Disconnected,
}

enum Binding {
    Unbound,
    Bound(Box<dyn Driver>),
    Disconnected,
}

impl Binding {
    fn state(&self) -> BindingState {
        match self {
            Self::Unbound => BindingState::Unbound,
            Self::Bound(_) => BindingState::Bound,
            Self::Disconnected => BindingState::Disconnected,
        }
    }
}

/// A live device model.
pub struct Thing {
    thing_type: ThingType,
    attributes: Vec<Attribute>,
    subentities: Vec<(String, Thing)>,
    identity: Option<Identity>,
    binding: Binding,
    transactions: Vec<Transaction>,
    listeners: Listeners,
    metadata: Option<Metadata>,
}

impl Thing {
    pub(crate) fn new(
        thing_type: ThingType,
        attributes: Vec<Attribute>,
        subentities: Vec<(String, Thing)>,
    ) -> Self {
        Self {
            thing_type,
            attributes,
            subentities,
            identity: None,
            binding: Binding::Unbound,
            transactions: Vec::new(),
            listeners: Listeners::default(),
            metadata: None,
        }
    }

    /// Code of the type this thing was instantiated from.
    #[must_use]
    pub fn code(&self) -> &str {
        self.thing_type.code()
    }

    #[must_use]
    pub fn thing_type(&self) -> &ThingType {
        &self.thing_type
    }

    /// Identity resolved at first bind; `None` means not identified yet.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn binding_state(&self) -> BindingState {
        self.binding.state()
    }

    /// Live attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[must_use]
    pub fn subentity(&self, code: &str) -> Option<&Thing> {
        self.subentities
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, thing)| thing)
    }

    pub fn subentity_mut(&mut self, code: &str) -> Option<&mut Thing> {
        self.subentities
            .iter_mut()
            .find(|(c, _)| c == code)
            .map(|(_, thing)| thing)
    }

    /// Number of currently open transactions.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.transactions.len()
    }

    // ------------------------------------------------------------------
    // Find
    // ------------------------------------------------------------------

    /// Resolve `key` to an attribute, following sub-entity paths.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when a path segment or the attribute
    /// cannot be resolved.
    pub fn attribute(&self, key: &str) -> Result<&Attribute, NotFoundError> {
        self.resolve(&Key::parse(key), Intent::Get)
    }

    fn resolve(&self, key: &Key, intent: Intent) -> Result<&Attribute, NotFoundError> {
        match key {
            Key::Path(segments, inner) => self.descend(segments)?.resolve(inner, intent),
            _ => self
                .find_index(key, intent)
                .map(|index| &self.attributes[index]),
        }
    }

    fn descend(&self, segments: &[String]) -> Result<&Thing, NotFoundError> {
        let mut current = self;
        for segment in segments {
            current = current
                .subentity(segment)
                .ok_or_else(|| NotFoundError::subentity(segment.clone()))?;
        }
        Ok(current)
    }

    fn descend_mut(&mut self, segments: &[String]) -> Result<&mut Thing, NotFoundError> {
        let mut current = self;
        for segment in segments {
            current = current
                .subentity_mut(segment)
                .ok_or_else(|| NotFoundError::subentity(segment.clone()))?;
        }
        Ok(current)
    }

    /// Index of the attribute matching a non-path key on this instance.
    fn find_index(&self, key: &Key, intent: Intent) -> Result<usize, NotFoundError> {
        match key {
            Key::ByCode(code) => self
                .attributes
                .iter()
                .position(|a| a.code() == code)
                .ok_or_else(|| NotFoundError::attribute(code.clone())),
            Key::ByPurpose(purpose) => {
                let matches: Vec<usize> = self
                    .attributes
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.purpose() == Some(purpose.as_str()))
                    .map(|(index, _)| index)
                    .collect();
                self.disambiguate(&matches, intent)
                    .ok_or_else(|| NotFoundError::attribute(purpose.clone()))
            }
            Key::Path(..) => Err(NotFoundError::attribute(key.to_string())),
        }
    }

    /// Pick one of several attributes sharing a purpose.
    ///
    /// Writes prefer a control attribute, reads and subscriptions prefer a
    /// reading attribute; failing that any control, then any reading, then
    /// the first match wins.
    fn disambiguate(&self, matches: &[usize], intent: Intent) -> Option<usize> {
        let control = matches
            .iter()
            .copied()
            .find(|&index| self.attributes[index].roles().control);
        let reading = matches
            .iter()
            .copied()
            .find(|&index| self.attributes[index].roles().reading);

        match intent {
            Intent::Set if control.is_some() => control,
            Intent::Get | Intent::On if reading.is_some() => reading,
            _ => control.or(reading).or_else(|| matches.first().copied()),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current value for `key`: the input value if present, otherwise the
    /// output value.
    ///
    /// Unknown keys are logged and read as `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        match self.resolve(&Key::parse(key), Intent::Get) {
            Ok(attribute) => attribute.value().cloned(),
            Err(err) => {
                tracing::warn!(thing = %self.code(), key, error = %err, "get: attribute not found");
                None
            }
        }
    }

    /// Snapshot of every attribute, preferring input values.
    #[must_use]
    pub fn state(&self) -> StateSnapshot {
        self.state_with(ReadMode::Preferred)
    }

    #[must_use]
    pub fn state_with(&self, mode: ReadMode) -> StateSnapshot {
        let values = self
            .attributes
            .iter()
            .map(|a| {
                let value = match mode {
                    ReadMode::Input => a.input(),
                    ReadMode::Output => a.output(),
                    ReadMode::Preferred => a.value(),
                };
                (a.code().to_string(), value.cloned())
            })
            .collect();
        let subentities = self
            .subentities
            .iter()
            .map(|(code, thing)| (code.clone(), thing.state_with(mode)))
            .collect();
        StateSnapshot::new(values, subentities)
    }

    /// JSON representation of the current state.
    #[must_use]
    pub fn json_representation(&self) -> serde_json::Value {
        self.state().to_json()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Set the attribute addressed by `key`.
    ///
    /// Returns `Ok(true)` when the value changed (or `force` is active),
    /// `Ok(false)` for a no-op, including unknown keys, which are logged.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] when the value is rejected; the
    /// attribute keeps its previous value.
    pub fn set(&mut self, key: &str, value: impl Into<AttributeValue>) -> Result<bool, ThingError> {
        self.set_key(&Key::parse(key), value.into())
    }

    /// Run a single `set` inside its own transaction with `options`.
    ///
    /// # Errors
    ///
    /// See [`Thing::set`].
    pub fn set_with(
        &mut self,
        key: &str,
        value: impl Into<AttributeValue>,
        options: TransactionOptions,
    ) -> Result<bool, ThingError> {
        self.start(options);
        let result = self.set(key, value);
        self.end();
        result
    }

    fn set_key(&mut self, key: &Key, value: AttributeValue) -> Result<bool, ThingError> {
        if let Key::Path(segments, inner) = key {
            if let Err(err) = self.descend(segments) {
                tracing::warn!(thing = %self.code(), %key, error = %err, "set: sub-entity not found");
                return Ok(false);
            }
            let Some(frame) = self.transactions.last_mut() else {
                self.start(TransactionOptions::IMMEDIATE);
                let result = self.set_key(key, value);
                self.end();
                return result;
            };
            let options = frame.options;
            let mirror = frame.nest(segments);
            let sub = self.descend_mut(segments)?;
            if mirror {
                sub.start(options);
            }
            return sub.set_key(inner, value);
        }

        let index = match self.find_index(key, Intent::Set) {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(thing = %self.code(), %key, error = %err, "set: attribute not found");
                return Ok(false);
            }
        };

        let options = self
            .transactions
            .last()
            .map_or(TransactionOptions::IMMEDIATE, |frame| frame.options);

        let attribute = &mut self.attributes[index];
        let value = if options.validate {
            attribute.validate(value).inspect_err(|err| {
                tracing::debug!(code = attribute.code(), error = %err, "set: value rejected");
            })?
        } else {
            value
        };

        let slot = if options.push {
            &mut attribute.output
        } else {
            &mut attribute.input
        };
        if !options.force && slot.as_ref() == Some(&value) {
            return Ok(false);
        }
        *slot = Some(value);
        if options.push {
            attribute.output_changed = true;
        } else {
            attribute.input_changed = true;
        }

        match self.transactions.last_mut() {
            Some(frame) => frame.record(index),
            None => {
                let batch = self.dispatch(&[index], options);
                self.push(&batch);
            }
        }
        Ok(true)
    }

    /// Apply a batch of changes as one atomic unit.
    ///
    /// Every value is validated before anything is written: one invalid
    /// value rejects the whole batch. Unknown keys are logged and skipped.
    /// The model's validator, if any, sees the batch first and may rewrite
    /// or reject it.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] when the model validator or an
    /// attribute rejects the batch.
    pub fn update<I, K, V>(&mut self, changes: I, options: TransactionOptions) -> Result<(), ThingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let mut batch: Changes = changes
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        if let Some(validator) = self.thing_type.validator() {
            validator(&mut batch, &self.state())?;
        }

        if options.validate {
            self.check_batch(&batch)?;
        }

        self.start(options);
        let result = batch
            .into_iter()
            .try_for_each(|(key, value)| self.set(&key, value).map(drop));
        self.end();
        result
    }

    fn check_batch(&self, batch: &[Change]) -> Result<(), ValidationError> {
        for (key, value) in batch {
            if let Ok(attribute) = self.resolve(&Key::parse(key), Intent::Set) {
                attribute.validate(value.clone())?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Open a transaction frame. Frames nest but never inherit options.
    pub fn start(&mut self, options: TransactionOptions) {
        self.transactions.push(Transaction::new(options));
    }

    /// Close the innermost transaction and dispatch its pending changes.
    ///
    /// Calling `end` with no open transaction is logged and ignored.
    pub fn end(&mut self) {
        match self.transactions.pop() {
            Some(frame) => {
                let batch = self.settle(frame);
                self.push(&batch);
            }
            None => tracing::debug!(thing = %self.code(), "end: no open transaction"),
        }
    }

    /// Fire the listeners of a closed frame, own attributes first, then
    /// the mirror frames of the sub-entities it reached into. Returns the
    /// batch to push, with sub-entity codes qualified by their path.
    fn settle(&mut self, frame: Transaction) -> Changes {
        let mut batch = self.dispatch(&frame.pending, frame.options);
        for path in frame.nested {
            let Ok(sub) = self.descend_mut(&path) else {
                continue;
            };
            let Some(mirror) = sub.transactions.pop() else {
                continue;
            };
            let prefix = path.join("/");
            batch.extend(
                sub.settle(mirror)
                    .into_iter()
                    .map(|(code, value)| (format!("{prefix}/{code}"), value)),
            );
        }
        batch
    }

    /// Notify, then signal state changes; returns what has to be pushed.
    fn dispatch(&mut self, pending: &[usize], options: TransactionOptions) -> Changes {
        if pending.is_empty() {
            return Vec::new();
        }

        let direction = if options.push {
            Direction::Output
        } else {
            Direction::Input
        };

        if options.notify {
            for &index in pending {
                let change = self.change_of(index, direction);
                self.listeners.attribute_changed(&change);
            }
        }

        let mut input = Vec::new();
        let mut output = Vec::new();
        for &index in pending {
            if self.attributes[index].input_changed {
                input.push(self.change_of(index, Direction::Input));
            }
            if self.attributes[index].output_changed {
                output.push(self.change_of(index, Direction::Output));
            }
            let attribute = &mut self.attributes[index];
            attribute.input_changed = false;
            attribute.output_changed = false;
        }
        if !input.is_empty() {
            self.listeners.state_changed(&StateChange {
                direction: Direction::Input,
                changes: input,
            });
        }
        if !output.is_empty() {
            self.listeners.state_changed(&StateChange {
                direction: Direction::Output,
                changes: output,
            });
        }

        if !options.push {
            return Vec::new();
        }
        pending
            .iter()
            .filter_map(|&index| {
                let attribute = &self.attributes[index];
                attribute
                    .output()
                    .map(|value| (attribute.code().to_string(), value.clone()))
            })
            .collect()
    }

    fn change_of(&self, index: usize, direction: Direction) -> AttributeChange {
        let attribute = &self.attributes[index];
        let value = match direction {
            Direction::Input => attribute.input(),
            Direction::Output => attribute.output(),
        };
        AttributeChange {
            code: attribute.code().to_string(),
            purpose: attribute.purpose().map(str::to_string),
            direction,
            value: value.cloned(),
        }
    }

    fn push(&mut self, batch: &[Change]) {
        if batch.is_empty() {
            return;
        }
        match &mut self.binding {
            Binding::Bound(driver) => driver.push(batch),
            Binding::Unbound | Binding::Disconnected => {
                tracing::debug!(thing = %self.thing_type.code(), count = batch.len(), "push: no driver bound");
            }
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Listen to attribute changes for `key`, or for every attribute when
    /// `key` is `None`. Returns `false` when the key does not resolve.
    pub fn on<F>(&mut self, key: Option<&str>, listener: F) -> bool
    where
        F: FnMut(&AttributeChange) + Send + 'static,
    {
        let Some(raw) = key else {
            self.listeners.on_attribute(None, Box::new(listener));
            return true;
        };

        let key = Key::parse(raw);
        if let Key::Path(segments, inner) = &key {
            return match self.descend_mut(segments) {
                Ok(sub) => sub.on(Some(&inner.to_string()), listener),
                Err(err) => {
                    tracing::warn!(thing = %self.code(), key = raw, error = %err, "on: sub-entity not found");
                    false
                }
            };
        }

        match self.find_index(&key, Intent::On) {
            Ok(index) => {
                let code = self.attributes[index].code().to_string();
                self.listeners.on_attribute(Some(code), Box::new(listener));
                true
            }
            Err(err) => {
                tracing::warn!(thing = %self.code(), key = raw, error = %err, "on: attribute not found");
                false
            }
        }
    }

    /// Listen to input- and output-state changes.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.listeners.on_state(Box::new(listener));
    }

    /// Listen to metadata changes.
    pub fn on_meta<F>(&mut self, listener: F)
    where
        F: FnMut(&Metadata) + Send + 'static,
    {
        self.listeners.on_meta(Box::new(listener));
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Metadata, created on first access.
    pub fn meta(&mut self) -> &Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }

    /// Metadata if it has been created already.
    #[must_use]
    pub fn peek_meta(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Merge metadata values and notify meta listeners when anything
    /// changed. Returns the changed keys.
    pub fn update_meta<I, K>(&mut self, values: I, options: MetaOptions) -> Vec<String>
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let metadata = self.metadata.get_or_insert_with(Metadata::default);
        metadata.update(values, options);
        self.commit_meta()
    }

    /// Merge persisted metadata entries (see [`Metadata::restore`]).
    pub fn restore_meta<I>(&mut self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, crate::metadata::MetaEntry)>,
    {
        let metadata = self.metadata.get_or_insert_with(Metadata::default);
        metadata.restore(entries, true);
        self.commit_meta()
    }

    fn commit_meta(&mut self) -> Vec<String> {
        let metadata = self.metadata.get_or_insert_with(Metadata::default);
        let changed = metadata.changed();
        if !changed.is_empty() {
            self.listeners.meta_changed(metadata);
        }
        changed
    }

    fn meta_changed(&mut self) {
        let metadata = self.metadata.get_or_insert_with(Metadata::default);
        self.listeners.meta_changed(metadata);
    }

    // ------------------------------------------------------------------
    // Driver binding
    // ------------------------------------------------------------------

    /// Bind `driver`, disconnecting any driver bound before.
    ///
    /// The identity is resolved on the first bind and kept across driver
    /// swaps; attribute values are left untouched.
    pub fn bind(&mut self, mut driver: Box<dyn Driver>, pulled: PulledCallback) -> Identity {
        if let Binding::Bound(previous) = &mut self.binding {
            let wait = previous.disconnect();
            tracing::info!(
                thing = %self.thing_type.code(),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "swapping driver"
            );
        }

        let descriptor = driver.identity();
        let identity = self
            .identity
            .get_or_insert_with(|| Identity::resolve(&descriptor, self.thing_type.code()))
            .clone();

        driver.connect(pulled);
        self.binding = Binding::Bound(driver);
        tracing::debug!(thing_id = %identity.thing_id, driver = %descriptor.driver, "driver bound");
        identity
    }

    /// Detach the bound driver. Returns how long the driver asked to be
    /// given before a forced stop, or `None` if nothing was bound.
    pub fn unbind(&mut self) -> Option<Duration> {
        match std::mem::replace(&mut self.binding, Binding::Disconnected) {
            Binding::Bound(mut driver) => Some(driver.disconnect()),
            other => {
                self.binding = other;
                None
            }
        }
    }

    /// Probe the bound driver; an unreachable driver is disconnected.
    pub fn check_reachable(&mut self) -> bool {
        let reachable = match &self.binding {
            Binding::Bound(driver) => driver.reachable(),
            Binding::Unbound | Binding::Disconnected => return false,
        };
        if !reachable {
            tracing::warn!(thing = %self.code(), "driver unreachable, disconnecting");
            self.unbind();
            self.meta_changed();
        }
        reachable
    }

    /// Ask the bound driver for fresh data.
    pub fn pull(&mut self) {
        match &mut self.binding {
            Binding::Bound(driver) => driver.pull(),
            Binding::Unbound | Binding::Disconnected => {
                tracing::debug!(thing = %self.thing_type.code(), "pull: no driver bound");
            }
        }
    }

    /// Entry point for data delivered by the driver.
    ///
    /// Values land in the input slots and are never pushed back. Values
    /// the attributes reject are logged and skipped. `None` only signals
    /// that something about the device changed.
    pub fn pulled(&mut self, changes: Option<Changes>) {
        let Some(changes) = changes else {
            self.meta_changed();
            return;
        };

        self.start(TransactionOptions::PULLED);
        for (key, value) in changes {
            if let Err(err) = self.set(&key, value) {
                tracing::warn!(thing = %self.code(), %key, error = %err, "pulled value rejected");
            }
        }
        self.end();
    }
}

impl fmt::Debug for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thing")
            .field("code", &self.code())
            .field("identity", &self.identity)
            .field("binding", &self.binding.state())
            .field("transactions", &self.transactions.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
