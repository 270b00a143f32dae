//! Declarative property tables loaded from TOML.
//!
//! ```toml
//! [[property]]
//! name = "vertical"
//! type = "Boolean"
//! default = false
//! cascade = "hl-tab, hl-tab-panel"
//! observer = "verticalChanged"
//!
//! [[property]]
//! name = "orientation"
//! attr = "aria-orientation"
//! values = ["horizontal", "vertical"]
//! default = "horizontal"
//! ```
//!
//! `type` is optional and defaults to `String`; any other name than
//! `String`, `Number` or `Boolean` fails registration. Defaults are checked
//! against the declared type when the class is registered.

use serde::Deserialize;

use super::{PropertyDefinition, PropertyType, PropertyValue, split_selectors};
use crate::error::RegistrationError;

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(default, rename = "property")]
    properties: Vec<PropertySchema>,
}

/// Cascade targets: a comma-separated string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CascadeTargets {
    One(String),
    Many(Vec<String>),
}

/// One `[[property]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySchema {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<toml::Value>,
    pub attr: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    pub observer: Option<String>,
    pub cascade: Option<CascadeTargets>,
    pub alias: Option<String>,
}

/// Resolve a declared type name. A missing type means `String`.
pub fn validate_type(
    tag: &str,
    property: &str,
    type_name: Option<&str>,
) -> Result<PropertyType, RegistrationError> {
    match type_name {
        None => Ok(PropertyType::String),
        Some(name) => PropertyType::from_name(name)
            .ok_or_else(|| RegistrationError::disallowed_type(tag, property, name)),
    }
}

fn default_value(
    tag: &str,
    property: &str,
    ty: PropertyType,
    value: toml::Value,
) -> Result<PropertyValue, RegistrationError> {
    match value {
        toml::Value::String(s) => Ok(PropertyValue::String(s)),
        toml::Value::Integer(i) => Ok(PropertyValue::Number(i as f64)),
        toml::Value::Float(f) => Ok(PropertyValue::Number(f)),
        toml::Value::Boolean(b) => Ok(PropertyValue::Boolean(b)),
        other => Err(RegistrationError::default_type_mismatch(
            tag,
            property,
            ty,
            other.to_string(),
        )),
    }
}

impl PropertySchema {
    /// Convert into a definition, validating the declared type.
    pub fn into_definition(self, tag: &str) -> Result<PropertyDefinition, RegistrationError> {
        let ty = validate_type(tag, &self.name, self.type_name.as_deref())?;
        let mut definition = PropertyDefinition::new(self.name, ty);
        if let Some(value) = self.default {
            let value = default_value(tag, &definition.name, ty, value)?;
            definition = definition.default(value);
        }
        definition.title = self.title;
        definition.description = self.description;
        definition.attr = self.attr;
        definition.values = self.values;
        definition.observer = self.observer;
        definition.alias = self.alias;
        definition.cascade = match self.cascade {
            Some(CascadeTargets::One(selectors)) => split_selectors(&selectors).collect(),
            Some(CascadeTargets::Many(selectors)) => selectors,
            None => Vec::new(),
        };
        Ok(definition)
    }
}

/// Parse a TOML property table for the class `tag`.
pub fn parse_properties(tag: &str, source: &str) -> Result<Vec<PropertyDefinition>, RegistrationError> {
    let document: SchemaDocument = toml::from_str(source).map_err(|source| RegistrationError::Schema {
        tag: tag.to_string(),
        source,
    })?;
    document
        .properties
        .into_iter()
        .map(|schema| schema.into_definition(tag))
        .collect()
}
