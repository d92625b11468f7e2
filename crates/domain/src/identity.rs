//! Identity: what a bound thing is known as, derived from its driver.

use serde::{Deserialize, Serialize};

use crate::id::ThingId;

/// Descriptor a driver reports for the device it talks to.
///
/// `fields` are ordered; their values are what distinguishes one device
/// from another behind the same driver (serial number, MAC, host, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverIdentity {
    pub driver: String,
    pub fields: Vec<(String, String)>,
}

impl DriverIdentity {
    #[must_use]
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Immutable identity of a thing, resolved on first bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// `urn:thing:<driver>:<field values…>:<thing code>`.
    pub thing_id: String,
    pub id: ThingId,
    pub driver: String,
    pub fields: Vec<(String, String)>,
}

impl Identity {
    /// Compose the identity of a thing with `code` reached through the
    /// driver described by `descriptor`.
    #[must_use]
    pub fn resolve(descriptor: &DriverIdentity, code: &str) -> Self {
        let mut thing_id = format!("urn:thing:{}", descriptor.driver);
        for (_, value) in &descriptor.fields {
            thing_id.push(':');
            thing_id.push_str(value);
        }
        thing_id.push(':');
        thing_id.push_str(code);

        Self {
            id: ThingId::from_urn(&thing_id),
            thing_id,
            driver: descriptor.driver.clone(),
            fields: descriptor.fields.clone(),
        }
    }
}
