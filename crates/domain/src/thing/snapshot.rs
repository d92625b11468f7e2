//! Ordered, serialisable view of a thing's attribute values.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::attribute::AttributeValue;

/// Which slot `state()` reads back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Values received from the driver only.
    Input,
    /// Values set locally only.
    Output,
    /// The input value when present, otherwise the output value.
    #[default]
    Preferred,
}

/// Attribute values in declaration order, followed by sub-entity snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    values: Vec<(String, Option<AttributeValue>)>,
    subentities: Vec<(String, StateSnapshot)>,
}

impl StateSnapshot {
    pub(crate) fn new(
        values: Vec<(String, Option<AttributeValue>)>,
        subentities: Vec<(String, StateSnapshot)>,
    ) -> Self {
        Self {
            values,
            subentities,
        }
    }

    /// Value of the attribute with `code`; `None` when unset or unknown.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&AttributeValue> {
        self.values
            .iter()
            .find(|(c, _)| c == code)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Whether an attribute with `code` exists, set or not.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.values.iter().any(|(c, _)| c == code)
    }

    #[must_use]
    pub fn subentity(&self, code: &str) -> Option<&StateSnapshot> {
        self.subentities
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, snapshot)| snapshot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&AttributeValue>)> {
        self.values
            .iter()
            .map(|(code, value)| (code.as_str(), value.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.subentities.is_empty()
    }

    /// JSON object representation (unset values are `null`).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (code, value) in &self.values {
            map.insert(
                code.clone(),
                value
                    .as_ref()
                    .map_or(serde_json::Value::Null, AttributeValue::to_json),
            );
        }
        for (code, snapshot) in &self.subentities {
            map.insert(code.clone(), snapshot.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for StateSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + self.subentities.len()))?;
        for (code, value) in &self.values {
            map.serialize_entry(code, value)?;
        }
        for (code, snapshot) in &self.subentities {
            map.serialize_entry(code, snapshot)?;
        }
        map.end()
    }
}
