//! Metadata: per-thing key/value facts (name, location, last update)
//! that live beside the attribute state and are persisted externally.
//!
//! Incoming values are first merged into a pending buffer by
//! [`Metadata::update`]; [`Metadata::changed`] commits the buffer into the
//! applied state and reports which keys actually moved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, now};

/// Well-known key for the human readable name.
pub const NAME: &str = "schema:name";
/// Well-known key for the location (room, floor, …).
pub const LOCATION: &str = "iot:location";

/// A single metadata value with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// Flags controlling [`Metadata::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaOptions {
    /// Stamp incoming values (with `timestamp`, or now) and record it as
    /// the last update time.
    pub set_timestamp: bool,
    /// Only accept a value whose timestamp is newer than the stored one.
    pub check_timestamp: bool,
    /// Timestamp carried by the incoming values.
    pub timestamp: Option<Timestamp>,
}

impl MetaOptions {
    #[must_use]
    pub fn stamped() -> Self {
        Self {
            set_timestamp: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn checked(timestamp: Timestamp) -> Self {
        Self {
            check_timestamp: true,
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }
}

/// Metadata of one thing.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    applied: BTreeMap<String, MetaEntry>,
    updated: BTreeMap<String, MetaEntry>,
    last_update: Option<Timestamp>,
}

impl Metadata {
    /// Applied value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.applied.get(key).map(|entry| &entry.value)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get(NAME).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.get(LOCATION).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    /// Whether values are waiting in the pending buffer.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.updated.is_empty()
    }

    /// Applied entries, as persisted by metadata stores.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, MetaEntry> {
        &self.applied
    }

    /// Merge values into the pending buffer. Returns how many were accepted.
    pub fn update<I, K>(&mut self, values: I, options: MetaOptions) -> usize
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let timestamp = match (options.timestamp, options.set_timestamp) {
            (Some(ts), _) => Some(ts),
            (None, true) => Some(now()),
            (None, false) => None,
        };
        if options.set_timestamp {
            self.last_update = timestamp;
        }

        let mut accepted = 0;
        for (key, value) in values {
            let entry = MetaEntry { value, timestamp };
            if self.merge(key.into(), entry, options.check_timestamp) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Merge persisted entries, each carrying its own timestamp.
    pub fn restore<I>(&mut self, entries: I, check_timestamp: bool) -> usize
    where
        I: IntoIterator<Item = (String, MetaEntry)>,
    {
        entries
            .into_iter()
            .filter(|(key, entry)| self.merge(key.clone(), entry.clone(), check_timestamp))
            .count()
    }

    fn merge(&mut self, key: String, entry: MetaEntry, check_timestamp: bool) -> bool {
        if check_timestamp {
            let current = self
                .updated
                .get(&key)
                .or_else(|| self.applied.get(&key))
                .and_then(|existing| existing.timestamp);
            let newer = match (entry.timestamp, current) {
                (_, None) => true,
                (Some(incoming), Some(current)) => incoming > current,
                (None, Some(_)) => false,
            };
            if !newer {
                return false;
            }
        }
        self.updated.insert(key, entry);
        true
    }

    /// Commit the pending buffer, returning the keys whose value changed.
    pub fn changed(&mut self) -> Vec<String> {
        let mut keys = Vec::new();
        for (key, entry) in std::mem::take(&mut self.updated) {
            let moved = self
                .applied
                .get(&key)
                .is_none_or(|current| current.value != entry.value);
            if moved {
                keys.push(key.clone());
            }
            self.applied.insert(key, entry);
        }
        keys
    }
}
