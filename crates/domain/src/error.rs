//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`ThingError`]
//! via `#[from]` (or an explicit `From` impl for boxed adapter errors).

use crate::attribute::AttributeValue;

/// Top-level error for the thing engine and everything built on it.
#[derive(Debug, thiserror::Error)]
pub enum ThingError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("internal invariant violated")]
    Invariant(#[from] InvariantError),

    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A value or a definition was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("attribute `{code}` expects a number, got {value}")]
    NotANumber { code: String, value: AttributeValue },

    #[error("attribute `{code}` expects an integer, got {value}")]
    NotAnInteger { code: String, value: AttributeValue },

    #[error("attribute `{code}` expects a string, got {value}")]
    NotAString { code: String, value: AttributeValue },

    #[error("attribute `{code}` value {value} is below the minimum {minimum}")]
    BelowMinimum {
        code: String,
        value: AttributeValue,
        minimum: f64,
    },

    #[error("attribute `{code}` value {value} is above the maximum {maximum}")]
    AboveMaximum {
        code: String,
        value: AttributeValue,
        maximum: f64,
    },

    #[error("attribute `{code}` does not allow {value}")]
    NotAllowed { code: String, value: AttributeValue },

    #[error("model `{model}` rejected the update: {reason}")]
    Rejected { model: String, reason: String },

    #[error("code must not be empty")]
    EmptyCode,

    #[error("code `{0}` is declared more than once")]
    DuplicateCode(String),
}

/// A key, attribute or sub-entity could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} `{key}` not found")]
pub struct NotFoundError {
    pub kind: &'static str,
    pub key: String,
}

impl NotFoundError {
    #[must_use]
    pub fn attribute(key: impl Into<String>) -> Self {
        Self {
            kind: "attribute",
            key: key.into(),
        }
    }

    #[must_use]
    pub fn subentity(key: impl Into<String>) -> Self {
        Self {
            kind: "subentity",
            key: key.into(),
        }
    }
}

/// Something the engine guarantees could not happen did happen.
///
/// Returned rather than panicking so callers can log and carry on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invariant violated: {0}")]
pub struct InvariantError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_thing_error() {
        let err: ThingError = ValidationError::EmptyCode.into();
        assert!(matches!(
            err,
            ThingError::Validation(ValidationError::EmptyCode)
        ));
    }

    #[test]
    fn should_display_not_found_with_kind_and_key() {
        let err = NotFoundError::attribute(":brightness");
        assert_eq!(err.to_string(), "attribute `:brightness` not found");
    }

    #[test]
    fn should_display_range_violation() {
        let err = ValidationError::AboveMaximum {
            code: "brightness".to_string(),
            value: AttributeValue::Int(120),
            maximum: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "attribute `brightness` value 120 is above the maximum 100"
        );
    }
}
