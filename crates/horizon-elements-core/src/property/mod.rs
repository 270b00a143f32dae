//! Declarative property definitions and attribute coercion.
//!
//! A component class describes its public state as a table of
//! [`PropertyDefinition`]s. Properties have no storage of their own: every
//! read parses the backing attribute with [`coerce_attribute`] and every
//! write goes through [`reflect_value`] back into the attribute.
//!
//! # Example
//!
//! ```
//! use horizon_elements_core::property::{
//!     coerce_attribute, PropertyDefinition, PropertyType, PropertyValue,
//! };
//!
//! let vertical = PropertyDefinition::boolean("vertical")
//!     .default(false)
//!     .cascade("hl-tab, hl-tab-panel");
//! assert_eq!(vertical.cascade, vec!["hl-tab", "hl-tab-panel"]);
//!
//! assert_eq!(
//!     coerce_attribute(PropertyType::Number, Some("NaN")).as_number().map(f64::is_nan),
//!     Some(true)
//! );
//! assert_eq!(coerce_attribute(PropertyType::Boolean, Some("")), PropertyValue::Boolean(true));
//! ```

pub mod naming;
pub mod schema;

use std::fmt;
use std::sync::Arc;

use crate::Host;
use crate::dom::NodeId;

/// The types a property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Number,
    Boolean,
}

impl PropertyType {
    /// Parse a declared type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Number" => Some(Self::Number),
            "Boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// The declared type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value of a property as seen through its accessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PropertyValue {
    /// No attribute (String and Number properties).
    #[default]
    Undefined,
    /// The attribute literally reads `null` (Number properties).
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    /// String payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric payload.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// ECMAScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
        }
    }

    /// The type of the payload, if any.
    pub fn value_type(&self) -> Option<PropertyType> {
        match self {
            Self::Undefined | Self::Null => None,
            Self::Boolean(_) => Some(PropertyType::Boolean),
            Self::Number(_) => Some(PropertyType::Number),
            Self::String(_) => Some(PropertyType::String),
        }
    }

    /// The string written to an attribute for this value.
    pub fn to_attribute_value(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_attribute_value())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

/// Computes a default from the instance it is being applied to.
pub type DefaultFn = Arc<dyn Fn(&Host, NodeId) -> PropertyValue + Send + Sync>;

/// A declared default.
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal; must match the declared type.
    Literal(PropertyValue),
    /// Evaluated per instance when defaults are applied; not type-checked.
    Computed(DefaultFn),
}

impl DefaultValue {
    /// Resolve the default for an instance.
    pub fn resolve(&self, host: &Host, node: NodeId) -> PropertyValue {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(f) => f(host, node),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// One declared property.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ty: PropertyType,
    pub default: Option<DefaultValue>,
    /// Explicit attribute name; otherwise derived from `name`.
    pub attr: Option<String>,
    /// Closed set of expected values; writes outside it only warn.
    pub values: Vec<String>,
    /// Name of the observer called on attribute change.
    pub observer: Option<String>,
    /// Selectors whose matches receive a copy of the attribute.
    pub cascade: Vec<String>,
    /// Property that mirrors writes to this one.
    pub alias: Option<String>,
}

impl PropertyDefinition {
    /// A property of the given type.
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            ty,
            default: None,
            attr: None,
            values: Vec::new(),
            observer: None,
            cascade: Vec::new(),
            alias: None,
        }
    }

    /// A String property.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::String)
    }

    /// A Number property.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Number)
    }

    /// A Boolean property.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::Boolean)
    }

    /// Literal default.
    pub fn default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default computed from the instance.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Host, NodeId) -> PropertyValue + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Arc::new(f)));
        self
    }

    /// Explicit attribute name.
    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    /// Closed set of expected values.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Observer name.
    pub fn observer(mut self, observer: impl Into<String>) -> Self {
        self.observer = Some(observer.into());
        self
    }

    /// Cascade targets as a comma-separated selector string.
    pub fn cascade(mut self, selectors: &str) -> Self {
        self.cascade.extend(split_selectors(selectors));
        self
    }

    /// Cascade targets as a list of selectors.
    pub fn cascade_to<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cascade.extend(selectors.into_iter().map(Into::into));
        self
    }

    /// Alias target.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Human readable title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Human readable description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether `value` is acceptable for the closed value set.
    ///
    /// Always true when no set is declared.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        self.values.is_empty() || self.values.contains(&value.to_attribute_value())
    }
}

pub(crate) fn split_selectors(selectors: &str) -> impl Iterator<Item = String> + '_ {
    selectors
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read a property value from its attribute.
///
/// - Number: absent → `Undefined`; `"null"` → `Null`; `"NaN"` → `NaN`;
///   otherwise numeric conversion.
/// - Boolean: presence → `true`, whatever the value.
/// - String: absent → `Undefined`; otherwise the raw value.
///
/// The literal string `"undefined"` reads back as `Undefined` for String and
/// Number properties.
pub fn coerce_attribute(ty: PropertyType, raw: Option<&str>) -> PropertyValue {
    match (ty, raw) {
        (PropertyType::Boolean, raw) => PropertyValue::Boolean(raw.is_some()),
        (_, None | Some("undefined")) => PropertyValue::Undefined,
        (PropertyType::Number, Some("null")) => PropertyValue::Null,
        (PropertyType::Number, Some("NaN")) => PropertyValue::Number(f64::NAN),
        (PropertyType::Number, Some(raw)) => PropertyValue::Number(parse_number(raw)),
        (PropertyType::String, Some(raw)) => PropertyValue::String(raw.to_string()),
    }
}

/// What a property write does to its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeWrite {
    Remove,
    Set(String),
}

/// Translate a property write into an attribute write.
///
/// `Null`, `Undefined`, and any falsy value of a Boolean property remove the
/// attribute. Boolean `true` on a Boolean property is the empty string.
/// Everything else is written as its string form.
pub fn reflect_value(ty: PropertyType, value: &PropertyValue) -> AttributeWrite {
    if value.is_nullish() || (ty == PropertyType::Boolean && !value.is_truthy()) {
        return AttributeWrite::Remove;
    }
    match (ty, value) {
        (PropertyType::Boolean, PropertyValue::Boolean(true)) => AttributeWrite::Set(String::new()),
        (_, value) => AttributeWrite::Set(value.to_attribute_value()),
    }
}

/// Numeric conversion of a string with ECMAScript `Number(string)` rules.
pub fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |v| v as f64);
        }
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// String form of a number as ECMAScript `Number::toString` prints it.
///
/// Uses the shortest round-tripping digits; exponent form below `1e-6`
/// and from `1e21` up.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }

    // `{:e}` gives the shortest digits as `d.ddde[-]x`.
    let scientific = format!("{n:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let e = point - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_matches_ecmascript() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(123456.789), "123456.789");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e22), "1.5e+22");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(-1.25e-9), "-1.25e-9");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_number_sentinels() {
        assert_eq!(coerce_attribute(PropertyType::Number, None), PropertyValue::Undefined);
        assert_eq!(coerce_attribute(PropertyType::Number, Some("null")), PropertyValue::Null);
        assert!(
            coerce_attribute(PropertyType::Number, Some("NaN"))
                .as_number()
                .is_some_and(f64::is_nan)
        );
        assert_eq!(coerce_attribute(PropertyType::Number, Some(" 12 ")), PropertyValue::Number(12.0));
        assert_eq!(coerce_attribute(PropertyType::Number, Some("")), PropertyValue::Number(0.0));
        assert!(
            coerce_attribute(PropertyType::Number, Some("twelve"))
                .as_number()
                .is_some_and(f64::is_nan)
        );
    }

    #[test]
    fn test_boolean_presence() {
        assert_eq!(coerce_attribute(PropertyType::Boolean, Some("")), true.into());
        assert_eq!(coerce_attribute(PropertyType::Boolean, Some("false")), true.into());
        assert_eq!(coerce_attribute(PropertyType::Boolean, None), false.into());
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(coerce_attribute(PropertyType::String, Some("dark")), "dark".into());
        assert_eq!(coerce_attribute(PropertyType::String, Some("")), "".into());
        assert_eq!(coerce_attribute(PropertyType::String, None), PropertyValue::Undefined);
        assert_eq!(coerce_attribute(PropertyType::String, Some("undefined")), PropertyValue::Undefined);
    }

    #[test]
    fn test_reflect_value() {
        use AttributeWrite::*;
        assert_eq!(reflect_value(PropertyType::Boolean, &true.into()), Set(String::new()));
        assert_eq!(reflect_value(PropertyType::Boolean, &false.into()), Remove);
        assert_eq!(reflect_value(PropertyType::Boolean, &PropertyValue::Null), Remove);
        assert_eq!(reflect_value(PropertyType::Boolean, &0.into()), Remove);
        assert_eq!(reflect_value(PropertyType::String, &PropertyValue::Undefined), Remove);
        assert_eq!(reflect_value(PropertyType::String, &"".into()), Set(String::new()));
        assert_eq!(reflect_value(PropertyType::Number, &0.into()), Set("0".into()));
        assert_eq!(reflect_value(PropertyType::Number, &(-1).into()), Set("-1".into()));
        assert_eq!(reflect_value(PropertyType::Number, &1.5.into()), Set("1.5".into()));
        assert_eq!(reflect_value(PropertyType::Number, &f64::NAN.into()), Set("NaN".into()));
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("0x1F"), 31.0);
        assert_eq!(parse_number("0b101"), 5.0);
        assert_eq!(parse_number("-2.5e1"), -25.0);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("1_000").is_nan());
        assert!(parse_number(".").is_nan());
    }

    #[test]
    fn test_builder_and_value_set() {
        let def = PropertyDefinition::string("orientation")
            .attr("aria-orientation")
            .values(["horizontal", "vertical"])
            .default("horizontal");
        assert_eq!(def.attr.as_deref(), Some("aria-orientation"));
        assert!(def.accepts(&"vertical".into()));
        assert!(!def.accepts(&"diagonal".into()));
        assert!(PropertyDefinition::string("free").accepts(&"anything".into()));

        let def = PropertyDefinition::boolean("vertical").cascade(" hl-tab ,hl-tab-panel,");
        assert_eq!(def.cascade, vec!["hl-tab", "hl-tab-panel"]);
    }
}
