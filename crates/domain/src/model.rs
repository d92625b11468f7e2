//! Model: declarative definition of a thing type.
//!
//! A [`ThingType`] is an immutable, shareable template assembled with
//! [`ThingTypeBuilder`]. Every [`ThingType::instantiate`] call produces a
//! [`Thing`] owning fresh copies of the attribute templates, so instances
//! never share mutable state with each other or with the template.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::attribute::{Attribute, AttributeBuilder, AttributeDescription, Changes};
use crate::error::ValidationError;
use crate::thing::{StateSnapshot, Thing};

/// Model-level validation hook run on every `update` batch.
///
/// Receives the batch (which it may rewrite) and the state before the
/// batch is applied. Returning an error rejects the whole batch.
pub type ModelValidator =
    Arc<dyn Fn(&mut Changes, &StateSnapshot) -> Result<(), ValidationError> + Send + Sync>;

/// Immutable thing type, cheap to clone.
#[derive(Clone)]
pub struct ThingType(Arc<Inner>);

struct Inner {
    code: String,
    name: Option<String>,
    description: Option<String>,
    help: Option<String>,
    attributes: Vec<Attribute>,
    subentities: Vec<(String, ThingType)>,
    validator: Option<ModelValidator>,
}

impl ThingType {
    /// Create a builder for a thing type with the given code.
    #[must_use]
    pub fn builder(code: impl Into<String>) -> ThingTypeBuilder {
        ThingTypeBuilder {
            code: code.into(),
            name: None,
            description: None,
            help: None,
            attributes: Vec::new(),
            subentities: Vec::new(),
            validator: None,
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.0.code
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.0.help.as_deref()
    }

    /// Attribute templates in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.0.attributes
    }

    pub(crate) fn validator(&self) -> Option<&ModelValidator> {
        self.0.validator.as_ref()
    }

    /// Produce a new, independent instance of this type.
    #[must_use]
    pub fn instantiate(&self) -> Thing {
        let subentities = self
            .0
            .subentities
            .iter()
            .map(|(code, child)| (code.clone(), child.instantiate()))
            .collect();
        Thing::new(self.clone(), self.0.attributes.clone(), subentities)
    }

    /// Structured description sufficient to rebuild this type remotely.
    #[must_use]
    pub fn describe(&self) -> ThingDescription {
        ThingDescription {
            code: self.0.code.clone(),
            name: self.0.name.clone(),
            description: self.0.description.clone(),
            help: self.0.help.clone(),
            attributes: self.0.attributes.iter().map(Attribute::describe).collect(),
            subentities: self
                .0
                .subentities
                .iter()
                .map(|(code, child)| SubentityDescription {
                    code: code.clone(),
                    thing: child.describe(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for ThingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThingType")
            .field("code", &self.0.code)
            .field("attributes", &self.0.attributes.len())
            .field("subentities", &self.0.subentities.len())
            .field("validator", &self.0.validator.is_some())
            .finish()
    }
}

/// Serialisable description of a [`ThingType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThingDescription {
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
    pub attributes: Vec<AttributeDescription>,
    pub subentities: Vec<SubentityDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubentityDescription {
    pub code: String,
    pub thing: ThingDescription,
}

/// Step-by-step builder for [`ThingType`].
pub struct ThingTypeBuilder {
    code: String,
    name: Option<String>,
    description: Option<String>,
    help: Option<String>,
    attributes: Vec<AttributeBuilder>,
    subentities: Vec<(String, ThingType)>,
    validator: Option<ModelValidator>,
}

impl ThingTypeBuilder {
    /// Append an attribute; declaration order is iteration order.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeBuilder) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub fn with_subentity(mut self, code: impl Into<String>, child: ThingType) -> Self {
        self.subentities.push((code.into(), child));
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&mut Changes, &StateSnapshot) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Consume the builder, validate, and return the [`ThingType`].
    ///
    /// A type without attributes is legal.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCode`] for an empty type, attribute
    /// or sub-entity code, and [`ValidationError::DuplicateCode`] when two
    /// attributes or two sub-entities share a code.
    pub fn build(self) -> Result<ThingType, ValidationError> {
        if self.code.is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        let mut attributes: Vec<Attribute> = Vec::with_capacity(self.attributes.len());
        for builder in self.attributes {
            let attribute = builder.build()?;
            if attributes.iter().any(|a| a.code() == attribute.code()) {
                return Err(ValidationError::DuplicateCode(attribute.code().to_string()));
            }
            attributes.push(attribute);
        }

        for (index, (code, _)) in self.subentities.iter().enumerate() {
            if code.is_empty() {
                return Err(ValidationError::EmptyCode);
            }
            if self.subentities[..index].iter().any(|(c, _)| c == code) {
                return Err(ValidationError::DuplicateCode(code.clone()));
            }
        }

        Ok(ThingType(Arc::new(Inner {
            code: self.code,
            name: self.name,
            description: self.description,
            help: self.help,
            attributes,
            subentities: self.subentities,
            validator: self.validator,
        })))
    }
}
