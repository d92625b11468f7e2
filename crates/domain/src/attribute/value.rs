//! Typed values carried by attribute slots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
///
/// Absence (no reading yet, nothing set yet) is modelled as `Option::None`
/// by the slots holding these values, never as a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Truthiness used by boolean coercion: zero, `NaN` and the empty
    /// string are falsy, everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
        }
    }

    /// Numeric view of the value, if it is a number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value coming from a driver or a caller.
    ///
    /// `null` maps to `Ok(None)`; arrays and objects are not attribute values.
    ///
    /// # Errors
    ///
    /// Returns the rejected JSON value when it is not a scalar.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Self>, serde_json::Value> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(b) => Ok(Some(Self::Bool(b))),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Some(Self::Int(i))),
                None => n
                    .as_f64()
                    .map(|f| Some(Self::Float(f)))
                    .ok_or(serde_json::Value::Number(n)),
            },
            serde_json::Value::String(s) => Ok(Some(Self::String(s))),
            other => Err(other),
        }
    }

    /// JSON rendering, used by snapshots and descriptions.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(f),
            Self::Int(i) => i.fmt(f),
            Self::Float(x) => x.fmt(f),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_non_zero_numbers_as_truthy() {
        assert!(AttributeValue::Int(10).is_truthy());
        assert!(AttributeValue::Float(0.5).is_truthy());
        assert!(!AttributeValue::Int(0).is_truthy());
        assert!(!AttributeValue::Float(f64::NAN).is_truthy());
    }

    #[test]
    fn should_treat_empty_string_as_falsy() {
        assert!(!AttributeValue::from("").is_truthy());
        assert!(AttributeValue::from("off").is_truthy());
    }

    #[test]
    fn should_map_json_null_to_absent_value() {
        let value = AttributeValue::from_json(serde_json::Value::Null).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn should_map_json_integer_to_int_variant() {
        let value = AttributeValue::from_json(serde_json::json!(42)).unwrap();
        assert_eq!(value, Some(AttributeValue::Int(42)));
    }

    #[test]
    fn should_map_json_float_to_float_variant() {
        let value = AttributeValue::from_json(serde_json::json!(21.5)).unwrap();
        assert_eq!(value, Some(AttributeValue::Float(21.5)));
    }

    #[test]
    fn should_reject_json_objects() {
        let result = AttributeValue::from_json(serde_json::json!({"nested": "value"}));
        assert!(result.is_err());
    }

    #[test]
    fn should_serialize_untagged() {
        assert_eq!(
            serde_json::to_string(&AttributeValue::from("hello")).unwrap(),
            "\"hello\""
        );
        assert_eq!(
            serde_json::to_string(&AttributeValue::Bool(true)).unwrap(),
            "true"
        );
    }

    #[test]
    fn should_compare_by_value() {
        assert_eq!(AttributeValue::Int(10), AttributeValue::Int(10));
        assert_ne!(AttributeValue::Int(10), AttributeValue::Float(10.0));
    }
}
