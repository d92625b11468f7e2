//! Attribute: one named, typed, validated value slot on a thing.
//!
//! Attributes are declared once as templates on a [`ThingType`](crate::model::ThingType)
//! and cloned into every instance, so each thing owns its own slots.

mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use value::AttributeValue;

/// Ordered batch of `(key, value)` pairs, as pushed to and pulled from
/// drivers and passed to `update`.
pub type Change = (String, AttributeValue);
pub type Changes = Vec<Change>;

/// Namespace used when a purpose is written in its short `:name` form.
pub const PURPOSE_NAMESPACE: &str = "iot-purpose";

/// Expand a purpose to its canonical identifier.
///
/// `:on` becomes `iot-purpose:on`; anything already carrying a namespace
/// is returned unchanged.
#[must_use]
pub fn canonical_purpose(purpose: &str) -> String {
    match purpose.strip_prefix(':') {
        Some(rest) => format!("{PURPOSE_NAMESPACE}:{rest}"),
        None if purpose.contains(':') => purpose.to_string(),
        None => format!("{PURPOSE_NAMESPACE}:{purpose}"),
    }
}

/// Value kind, driving validation and coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Kind {
    Boolean,
    Integer,
    Number,
    String,
    /// Numeric channel of a named vector, such as the `r` of a `color`.
    VectorComponent { vector: String },
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::VectorComponent { vector } => write!(f, "vector-component({vector})"),
        }
    }
}

/// Whether an attribute is sensor-sourced, actuator-targeted, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub reading: bool,
    pub control: bool,
}

impl Roles {
    pub const READING: Self = Self {
        reading: true,
        control: false,
    };
    pub const CONTROL: Self = Self {
        reading: false,
        control: true,
    };
    pub const BOTH: Self = Self {
        reading: true,
        control: true,
    };
}

impl Default for Roles {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Kind-specific constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<AttributeValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A typed value slot.
///
/// `input` holds the last value pulled from the driver, `output` the last
/// value set locally for pushing to it.
#[derive(Debug, Clone)]
pub struct Attribute {
    code: String,
    kind: Kind,
    purpose: Option<String>,
    roles: Roles,
    constraints: Constraints,
    pub(crate) input: Option<AttributeValue>,
    pub(crate) output: Option<AttributeValue>,
    pub(crate) input_changed: bool,
    pub(crate) output_changed: bool,
}

impl Attribute {
    /// Start declaring an attribute with the given code and kind.
    #[must_use]
    pub fn builder(code: impl Into<String>, kind: Kind) -> AttributeBuilder {
        AttributeBuilder {
            code: code.into(),
            kind,
            purpose: None,
            roles: Roles::default(),
            constraints: Constraints::default(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    #[must_use]
    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> Roles {
        self.roles
    }

    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Last value received from the driver.
    #[must_use]
    pub fn input(&self) -> Option<&AttributeValue> {
        self.input.as_ref()
    }

    /// Last value set locally.
    #[must_use]
    pub fn output(&self) -> Option<&AttributeValue> {
        self.output.as_ref()
    }

    /// Input if present, otherwise output.
    #[must_use]
    pub fn value(&self) -> Option<&AttributeValue> {
        self.input.as_ref().or(self.output.as_ref())
    }

    /// Validate and coerce `value` according to this attribute's kind.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the value cannot be coerced or
    /// violates the attribute's constraints.
    pub fn validate(&self, value: AttributeValue) -> Result<AttributeValue, ValidationError> {
        let coerced = match &self.kind {
            Kind::Boolean => AttributeValue::Bool(value.is_truthy()),
            Kind::Integer => self.coerce_integer(value)?,
            Kind::Number | Kind::VectorComponent { .. } => self.coerce_number(value)?,
            Kind::String => self.coerce_string(value)?,
        };
        self.check_range(&coerced)?;
        self.check_enumeration(&coerced)?;
        Ok(coerced)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn coerce_integer(&self, value: AttributeValue) -> Result<AttributeValue, ValidationError> {
        match value {
            AttributeValue::Int(_) => Ok(value),
            AttributeValue::Float(f) if f.is_finite() => Ok(AttributeValue::Int(f.round() as i64)),
            other => Err(ValidationError::NotAnInteger {
                code: self.code.clone(),
                value: other,
            }),
        }
    }

    fn coerce_number(&self, value: AttributeValue) -> Result<AttributeValue, ValidationError> {
        match value.as_f64() {
            Some(f) if f.is_finite() => Ok(AttributeValue::Float(f)),
            _ => Err(ValidationError::NotANumber {
                code: self.code.clone(),
                value,
            }),
        }
    }

    fn coerce_string(&self, value: AttributeValue) -> Result<AttributeValue, ValidationError> {
        match value {
            AttributeValue::String(_) => Ok(value),
            AttributeValue::Int(_) | AttributeValue::Float(_) | AttributeValue::Bool(_) => {
                Ok(AttributeValue::String(value.to_string()))
            }
        }
    }

    fn check_range(&self, value: &AttributeValue) -> Result<(), ValidationError> {
        let Some(number) = value.as_f64() else {
            return Ok(());
        };
        if let Some(minimum) = self.constraints.minimum {
            if number < minimum {
                return Err(ValidationError::BelowMinimum {
                    code: self.code.clone(),
                    value: value.clone(),
                    minimum,
                });
            }
        }
        if let Some(maximum) = self.constraints.maximum {
            if number > maximum {
                return Err(ValidationError::AboveMaximum {
                    code: self.code.clone(),
                    value: value.clone(),
                    maximum,
                });
            }
        }
        Ok(())
    }

    fn check_enumeration(&self, value: &AttributeValue) -> Result<(), ValidationError> {
        match &self.constraints.enumeration {
            Some(allowed) if !allowed.contains(value) => Err(ValidationError::NotAllowed {
                code: self.code.clone(),
                value: value.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Structured description of this attribute.
    #[must_use]
    pub fn describe(&self) -> AttributeDescription {
        AttributeDescription {
            code: self.code.clone(),
            kind: self.kind.clone(),
            constraints: self.constraints.clone(),
            purpose: self.purpose.clone(),
            roles: self.roles,
        }
    }
}

/// Everything an external catalog needs to rebuild an attribute template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub code: String,
    pub kind: Kind,
    pub constraints: Constraints,
    pub purpose: Option<String>,
    pub roles: Roles,
}

/// Step-by-step builder for [`Attribute`] templates.
#[derive(Debug)]
pub struct AttributeBuilder {
    code: String,
    kind: Kind,
    purpose: Option<String>,
    roles: Roles,
    constraints: Constraints,
}

impl AttributeBuilder {
    /// Tag with a purpose; short `:name` forms are canonicalised.
    #[must_use]
    pub fn purpose(mut self, purpose: &str) -> Self {
        self.purpose = Some(canonical_purpose(purpose));
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn reading(self) -> Self {
        self.roles(Roles::READING)
    }

    #[must_use]
    pub fn control(self) -> Self {
        self.roles(Roles::CONTROL)
    }

    #[must_use]
    pub fn minimum(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    #[must_use]
    pub fn maximum(mut self, maximum: f64) -> Self {
        self.constraints.maximum = Some(maximum);
        self
    }

    #[must_use]
    pub fn enumeration<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        self.constraints.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.constraints.unit = Some(unit.into());
        self
    }

    /// Consume the builder and return the attribute template.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCode`] if the code is empty.
    pub fn build(self) -> Result<Attribute, ValidationError> {
        if self.code.is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        Ok(Attribute {
            code: self.code,
            kind: self.kind,
            purpose: self.purpose,
            roles: self.roles,
            constraints: self.constraints,
            input: None,
            output: None,
            input_changed: false,
            output_changed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boolean() -> Attribute {
        Attribute::builder("on", Kind::Boolean)
            .purpose(":on")
            .build()
            .unwrap()
    }

    fn brightness() -> Attribute {
        Attribute::builder("brightness", Kind::Integer)
            .minimum(0.0)
            .maximum(100.0)
            .unit("iot-unit:math.fraction.percent")
            .build()
            .unwrap()
    }

    #[test]
    fn should_canonicalise_short_purpose() {
        assert_eq!(canonical_purpose(":on"), "iot-purpose:on");
        assert_eq!(canonical_purpose("iot-purpose:on"), "iot-purpose:on");
        assert_eq!(canonical_purpose("on"), "iot-purpose:on");
    }

    #[test]
    fn should_coerce_numbers_to_boolean_by_truthiness() {
        let attr = boolean();
        assert_eq!(
            attr.validate(AttributeValue::Int(10)).unwrap(),
            AttributeValue::Bool(true)
        );
        assert_eq!(
            attr.validate(AttributeValue::Int(0)).unwrap(),
            AttributeValue::Bool(false)
        );
    }

    #[test]
    fn should_round_float_for_integer_kind() {
        let attr = brightness();
        assert_eq!(
            attr.validate(AttributeValue::Float(49.6)).unwrap(),
            AttributeValue::Int(50)
        );
    }

    #[test]
    fn should_reject_value_above_maximum() {
        let attr = brightness();
        let result = attr.validate(AttributeValue::Int(101));
        assert!(matches!(result, Err(ValidationError::AboveMaximum { .. })));
    }

    #[test]
    fn should_reject_value_below_minimum() {
        let attr = brightness();
        let result = attr.validate(AttributeValue::Int(-1));
        assert!(matches!(result, Err(ValidationError::BelowMinimum { .. })));
    }

    #[test]
    fn should_reject_non_numeric_input_for_number_kind() {
        let attr = Attribute::builder("temperature", Kind::Number)
            .build()
            .unwrap();
        let result = attr.validate(AttributeValue::from("warm"));
        assert!(matches!(result, Err(ValidationError::NotANumber { .. })));
        let result = attr.validate(AttributeValue::Bool(true));
        assert!(matches!(result, Err(ValidationError::NotANumber { .. })));
    }

    #[test]
    fn should_widen_integer_for_number_kind() {
        let attr = Attribute::builder("temperature", Kind::Number)
            .build()
            .unwrap();
        assert_eq!(
            attr.validate(AttributeValue::Int(21)).unwrap(),
            AttributeValue::Float(21.0)
        );
    }

    #[test]
    fn should_validate_vector_component_as_number() {
        let attr = Attribute::builder(
            "r",
            Kind::VectorComponent {
                vector: "color".to_string(),
            },
        )
        .minimum(0.0)
        .maximum(1.0)
        .build()
        .unwrap();
        assert_eq!(
            attr.validate(AttributeValue::Int(1)).unwrap(),
            AttributeValue::Float(1.0)
        );
        assert!(attr.validate(AttributeValue::Float(1.5)).is_err());
    }

    #[test]
    fn should_enforce_string_enumeration() {
        let attr = Attribute::builder("mode", Kind::String)
            .enumeration(["heat", "cool"])
            .build()
            .unwrap();
        assert!(attr.validate(AttributeValue::from("heat")).is_ok());
        let result = attr.validate(AttributeValue::from("fan"));
        assert!(matches!(result, Err(ValidationError::NotAllowed { .. })));
    }

    #[test]
    fn should_render_numbers_as_text_for_string_kind() {
        let attr = Attribute::builder("label", Kind::String).build().unwrap();
        assert_eq!(
            attr.validate(AttributeValue::Int(7)).unwrap(),
            AttributeValue::from("7")
        );
    }

    #[test]
    fn should_reject_empty_code() {
        let result = Attribute::builder("", Kind::Boolean).build();
        assert!(matches!(result, Err(ValidationError::EmptyCode)));
    }

    #[test]
    fn should_default_to_both_roles() {
        assert_eq!(boolean().roles(), Roles::BOTH);
    }

    #[test]
    fn should_start_with_absent_values() {
        let attr = boolean();
        assert!(attr.input().is_none());
        assert!(attr.output().is_none());
        assert!(attr.value().is_none());
    }

    #[test]
    fn should_describe_purpose_and_constraints() {
        let description = brightness().describe();
        assert_eq!(description.code, "brightness");
        assert_eq!(description.kind, Kind::Integer);
        assert_eq!(description.constraints.maximum, Some(100.0));
        assert!(description.purpose.is_none());
    }
}
