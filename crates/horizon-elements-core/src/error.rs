//! Error types for Horizon Elements.
//!
//! Two families exist. [`RegistrationError`] covers fatal configuration
//! mistakes found while a component class is defined; the class is not
//! registered. [`ElementError`] covers misuse of the instance API. Runtime
//! usage problems (bad selection index, missing tab content, values outside
//! a closed set) are logged as warnings and never surface as errors.

use crate::dom::{DomError, NodeId, SelectorError, TemplateError};
use crate::property::PropertyType;

/// A specialized Result type for instance operations.
pub type Result<T> = std::result::Result<T, ElementError>;

/// Fatal errors raised while registering a component class.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// A property declared a type outside String, Number and Boolean.
    #[error("property \"{property}\" on {tag} must have type String, Number, or Boolean (found {found})")]
    DisallowedType {
        tag: String,
        property: String,
        found: String,
    },

    /// A property name does not begin with a lower-case letter or an underscore.
    #[error(
        "property {tag}.{property} defined, but property names must begin with a lower-case letter or an underscore"
    )]
    InvalidPropertyName { tag: String, property: String },

    /// A literal default does not match the declared type.
    #[error("[{tag}] the default value `{value}` does not match the assigned type {expected} for the '{property}' property")]
    DefaultTypeMismatch {
        tag: String,
        property: String,
        expected: PropertyType,
        value: String,
    },

    /// A property names an observer that neither the class nor the base provides.
    #[error("property \"{property}\" on {tag} names an unknown observer \"{observer}\"")]
    UnknownObserver {
        tag: String,
        property: String,
        observer: String,
    },

    /// A property aliases a property that does not exist.
    #[error("property \"{property}\" on {tag} is an alias of unknown property \"{alias}\"")]
    UnknownAlias {
        tag: String,
        property: String,
        alias: String,
    },

    /// A cascade target is not a usable selector.
    #[error("property \"{property}\" on {tag} cascades to an invalid selector: {source}")]
    InvalidCascade {
        tag: String,
        property: String,
        #[source]
        source: SelectorError,
    },

    /// The tag is not a valid custom element name.
    #[error("\"{tag}\" is not a valid custom element name")]
    InvalidTagName { tag: String },

    /// The class template could not be parsed.
    #[error("template for {tag} could not be parsed: {source}")]
    Template {
        tag: String,
        #[source]
        source: TemplateError,
    },

    /// A declarative property schema could not be parsed.
    #[error("property schema for {tag} could not be parsed: {source}")]
    Schema {
        tag: String,
        #[source]
        source: toml::de::Error,
    },
}

impl RegistrationError {
    /// Create a disallowed-type error.
    pub fn disallowed_type(
        tag: impl Into<String>,
        property: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::DisallowedType {
            tag: tag.into(),
            property: property.into(),
            found: found.into(),
        }
    }

    /// Create an invalid-name error.
    pub fn invalid_property_name(tag: impl Into<String>, property: impl Into<String>) -> Self {
        Self::InvalidPropertyName {
            tag: tag.into(),
            property: property.into(),
        }
    }

    /// Create a default/type mismatch error.
    pub fn default_type_mismatch(
        tag: impl Into<String>,
        property: impl Into<String>,
        expected: PropertyType,
        value: impl Into<String>,
    ) -> Self {
        Self::DefaultTypeMismatch {
            tag: tag.into(),
            property: property.into(),
            expected,
            value: value.into(),
        }
    }

    /// The tag of the class whose registration failed.
    pub fn tag(&self) -> &str {
        match self {
            Self::DisallowedType { tag, .. }
            | Self::InvalidPropertyName { tag, .. }
            | Self::DefaultTypeMismatch { tag, .. }
            | Self::UnknownObserver { tag, .. }
            | Self::UnknownAlias { tag, .. }
            | Self::InvalidCascade { tag, .. }
            | Self::InvalidTagName { tag }
            | Self::Template { tag, .. }
            | Self::Schema { tag, .. } => tag,
        }
    }
}

/// Errors raised by the instance API.
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    /// The node is not an upgraded component.
    #[error("{node:?} is not an upgraded component")]
    NotAComponent { node: NodeId },

    /// The component has no property of that name.
    #[error("<{tag}> has no property \"{property}\"")]
    UnknownProperty { tag: String, property: String },

    /// The underlying tree operation failed.
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Log-and-continue for operations whose failure is a recoverable warning.
pub trait ResultExt<T> {
    /// Return the value, or log the error as a warning with `context` and
    /// return `None`.
    fn or_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn or_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                crate::elements_warn!(error = %err, "{context}");
                None
            }
        }
    }
}
