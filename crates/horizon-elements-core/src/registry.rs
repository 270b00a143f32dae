//! Component classes and their property registries.
//!
//! A [`ComponentClass`] is the declarative description a widget author
//! writes: tag, markup, own properties, named observers, slots and
//! behavior. [`Host::define`](crate::Host::define) turns it into a
//! [`DefinedClass`], whose [`ComponentRegistry`] merges the class
//! properties with the shared base table, resolves every observer and alias
//! name to a typed entry, and derives the attribute maps and cascade table.
//! The registry is built once and shared read-only by every instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Host;
use crate::base;
use crate::dom::{NodeId, SelectorList, Template};
use crate::error::RegistrationError;
use crate::lifecycle::{ComponentBehavior, DefaultBehavior};
use crate::logging::targets;
use crate::property::{DefaultValue, PropertyDefinition, PropertyValue, naming, schema};

/// Callback run when an observed property changes: `(host, element, old, new)`.
pub type Observer = Arc<dyn Fn(&mut Host, NodeId, &PropertyValue, &PropertyValue) + Send + Sync>;

/// General purpose of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Container,
    Content,
    Combo,
}

impl ComponentType {
    /// Attribute value for the `type` property.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Content => "content",
            Self::Combo => "combo",
        }
    }
}

/// A slot a component exposes to its light DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDefinition {
    pub name: String,
    /// Named slots collect children by `slot` attribute; the default slot
    /// collects children without one.
    pub named: bool,
}

impl SlotDefinition {
    /// A named slot.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: true,
        }
    }

    /// The default slot, reported under `name`.
    pub fn default_slot(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            named: false,
        }
    }
}

/// The declarative description of a component class.
pub struct ComponentClass {
    tag: String,
    version: String,
    markup: String,
    properties: Vec<PropertyDefinition>,
    observers: HashMap<String, Observer>,
    slots: Vec<SlotDefinition>,
    component_type: Option<ComponentType>,
    delay_render: bool,
    behavior: Arc<dyn ComponentBehavior>,
}

impl ComponentClass {
    /// Start describing the class registered under `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            markup: String::new(),
            properties: Vec::new(),
            observers: HashMap::new(),
            slots: Vec::new(),
            component_type: None,
            delay_render: false,
            behavior: Arc::new(DefaultBehavior),
        }
    }

    /// Version reported on conflicting registrations.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Shadow markup.
    pub fn template(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    /// Add one property.
    pub fn property(mut self, definition: PropertyDefinition) -> Self {
        self.properties.push(definition);
        self
    }

    /// Add several properties.
    pub fn properties(mut self, definitions: impl IntoIterator<Item = PropertyDefinition>) -> Self {
        self.properties.extend(definitions);
        self
    }

    /// Add properties from a TOML table (see [`schema`]).
    pub fn properties_from_toml(self, source: &str) -> Result<Self, RegistrationError> {
        let definitions = schema::parse_properties(&self.tag, source)?;
        Ok(self.properties(definitions))
    }

    /// Register a named observer.
    pub fn observer<F>(mut self, name: impl Into<String>, observer: F) -> Self
    where
        F: Fn(&mut Host, NodeId, &PropertyValue, &PropertyValue) + Send + Sync + 'static,
    {
        self.observers.insert(name.into(), Arc::new(observer));
        self
    }

    /// Declare a slot.
    pub fn slot(mut self, slot: SlotDefinition) -> Self {
        self.slots.push(slot);
        self
    }

    /// Default for the `type` property of this class.
    pub fn component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = Some(component_type);
        self
    }

    /// Skip the render in the constructor; the behavior renders later.
    pub fn delay_render(mut self, delay: bool) -> Self {
        self.delay_render = delay;
        self
    }

    /// Lifecycle hooks.
    pub fn behavior(mut self, behavior: impl ComponentBehavior) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    /// The tag this class registers under.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The version set with [`version`](Self::version).
    pub fn declared_version(&self) -> &str {
        &self.version
    }

    pub(crate) fn build(self) -> Result<DefinedClass, RegistrationError> {
        if !is_valid_custom_element_name(&self.tag) {
            return Err(RegistrationError::InvalidTagName { tag: self.tag });
        }

        let template = Template::parse(&self.markup).map_err(|source| RegistrationError::Template {
            tag: self.tag.clone(),
            source,
        })?;

        // Base observers win over class observers of the same name.
        let mut observers = self.observers;
        observers.extend(base::observers());

        let registry = ComponentRegistry::build(
            &self.tag,
            self.properties,
            base::properties(),
            &observers,
            self.component_type,
        )?;

        Ok(DefinedClass {
            tag: self.tag,
            version: self.version,
            template,
            registry: Arc::new(registry),
            slots: self.slots,
            delay_render: self.delay_render,
            behavior: self.behavior,
        })
    }
}

/// Custom element names contain a hyphen and start with a lower-case letter.
pub fn is_valid_custom_element_name(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag.contains('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}

/// A registered component class.
pub struct DefinedClass {
    tag: String,
    version: String,
    template: Template,
    registry: Arc<ComponentRegistry>,
    slots: Vec<SlotDefinition>,
    delay_render: bool,
    behavior: Arc<dyn ComponentBehavior>,
}

impl DefinedClass {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn delays_render(&self) -> bool {
        self.delay_render
    }

    pub(crate) fn behavior(&self) -> Arc<dyn ComponentBehavior> {
        self.behavior.clone()
    }
}

impl fmt::Debug for DefinedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinedClass")
            .field("tag", &self.tag)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// A merged property with its resolved wiring.
pub struct RegisteredProperty {
    definition: PropertyDefinition,
    attr_name: String,
    observer: Option<Observer>,
    alias: Option<String>,
    cascade: Vec<SelectorList>,
}

impl RegisteredProperty {
    pub fn definition(&self) -> &PropertyDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The backing attribute.
    pub fn attr_name(&self) -> &str {
        &self.attr_name
    }

    pub fn observer(&self) -> Option<&Observer> {
        self.observer.as_ref()
    }

    /// Name of the aliased property; guaranteed to exist in the registry.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Parsed cascade targets.
    pub fn cascade(&self) -> &[SelectorList] {
        &self.cascade
    }

    /// Whether attribute changes on this property reach the changed callback.
    pub fn is_observed(&self) -> bool {
        self.observer.is_some() || !self.cascade.is_empty() || self.alias.is_some()
    }
}

impl fmt::Debug for RegisteredProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProperty")
            .field("definition", &self.definition)
            .field("attr_name", &self.attr_name)
            .field("observer", &self.observer.is_some())
            .field("alias", &self.alias)
            .finish()
    }
}

/// One row of the cascade table.
#[derive(Debug, Clone)]
pub struct CascadeTarget {
    /// The selector as declared.
    pub selector: String,
    pub selectors: SelectorList,
    /// Attributes copied to matches, in declaration order.
    pub attributes: Vec<String>,
}

/// Two properties mapping to the same attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeConflict {
    pub attribute: String,
    pub first: String,
    pub second: String,
}

/// Per-class merged property table with derived lookups.
#[derive(Debug)]
pub struct ComponentRegistry {
    tag: String,
    properties: Vec<RegisteredProperty>,
    by_name: HashMap<String, usize>,
    by_attr: HashMap<String, usize>,
    cascade: Vec<CascadeTarget>,
    observed: Vec<String>,
    conflicts: Vec<AttributeConflict>,
}

/// Merge in object-spread order: own keys first, base keys appended, and a
/// base definition replaces a same-named own definition in place.
fn merge(own: Vec<PropertyDefinition>, base: Vec<PropertyDefinition>) -> Vec<PropertyDefinition> {
    let mut merged: Vec<PropertyDefinition> = Vec::with_capacity(own.len() + base.len());
    for definition in own.into_iter().chain(base) {
        match merged.iter_mut().find(|d| d.name == definition.name) {
            Some(slot) => *slot = definition,
            None => merged.push(definition),
        }
    }
    merged
}

impl ComponentRegistry {
    /// Merge `own` with `base`, validate, and derive the lookup tables.
    pub fn build(
        tag: &str,
        own: Vec<PropertyDefinition>,
        base: Vec<PropertyDefinition>,
        observers: &HashMap<String, Observer>,
        component_type: Option<ComponentType>,
    ) -> Result<Self, RegistrationError> {
        let mut merged = merge(own, base);

        if let Some(component_type) = component_type
            && let Some(definition) = merged.iter_mut().find(|d| d.name == "type")
        {
            definition.default = Some(DefaultValue::Literal(component_type.as_str().into()));
        }

        for definition in &merged {
            validate(tag, definition)?;
        }

        let by_name: HashMap<String, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();

        let mut properties = Vec::with_capacity(merged.len());
        for definition in merged {
            let observer = match &definition.observer {
                Some(name) => Some(observers.get(name).cloned().ok_or_else(|| {
                    RegistrationError::UnknownObserver {
                        tag: tag.to_string(),
                        property: definition.name.clone(),
                        observer: name.clone(),
                    }
                })?),
                None => None,
            };

            if let Some(alias) = &definition.alias
                && !by_name.contains_key(alias)
            {
                return Err(RegistrationError::UnknownAlias {
                    tag: tag.to_string(),
                    property: definition.name.clone(),
                    alias: alias.clone(),
                });
            }

            let cascade = definition
                .cascade
                .iter()
                .map(|selector| {
                    SelectorList::parse(selector).map_err(|source| RegistrationError::InvalidCascade {
                        tag: tag.to_string(),
                        property: definition.name.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let attr_name = definition
                .attr
                .clone()
                .unwrap_or_else(|| naming::prop_to_attr(&definition.name));

            properties.push(RegisteredProperty {
                alias: definition.alias.clone(),
                definition,
                attr_name,
                observer,
                cascade,
            });
        }

        let mut by_attr: HashMap<String, usize> = HashMap::new();
        let mut conflicts = Vec::new();
        for (index, property) in properties.iter().enumerate() {
            if let Some(previous) = by_attr.insert(property.attr_name.clone(), index) {
                let conflict = AttributeConflict {
                    attribute: property.attr_name.clone(),
                    first: properties[previous].name().to_string(),
                    second: property.name().to_string(),
                };
                tracing::warn!(
                    target: targets::REGISTRY,
                    tag,
                    attribute = %conflict.attribute,
                    "properties \"{}\" and \"{}\" share one attribute",
                    conflict.first,
                    conflict.second
                );
                conflicts.push(conflict);
            }
        }

        let mut cascade: Vec<CascadeTarget> = Vec::new();
        for property in &properties {
            for (selector, selectors) in property.definition.cascade.iter().zip(&property.cascade) {
                match cascade.iter_mut().find(|t| t.selector == *selector) {
                    Some(target) => target.attributes.push(property.attr_name.clone()),
                    None => cascade.push(CascadeTarget {
                        selector: selector.clone(),
                        selectors: selectors.clone(),
                        attributes: vec![property.attr_name.clone()],
                    }),
                }
            }
        }

        let observed = properties
            .iter()
            .filter(|p| p.is_observed())
            .map(|p| p.attr_name.clone())
            .collect();

        tracing::debug!(
            target: targets::REGISTRY,
            tag,
            properties = properties.len(),
            cascade_targets = cascade.len(),
            "registry built"
        );

        Ok(Self {
            tag: tag.to_string(),
            properties,
            by_name,
            by_attr,
            cascade,
            observed,
            conflicts,
        })
    }

    /// The class tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Merged properties in merge order.
    pub fn properties(&self) -> impl Iterator<Item = &RegisteredProperty> {
        self.properties.iter()
    }

    /// Property by name.
    pub fn property(&self, name: &str) -> Option<&RegisteredProperty> {
        self.by_name.get(name).map(|i| &self.properties[*i])
    }

    /// Property backed by `attr`.
    pub fn property_for_attribute(&self, attr: &str) -> Option<&RegisteredProperty> {
        self.by_attr.get(attr).map(|i| &self.properties[*i])
    }

    /// Attribute name of a property.
    pub fn prop_to_attr(&self, name: &str) -> Option<&str> {
        self.property(name).map(RegisteredProperty::attr_name)
    }

    /// Property name of an attribute.
    pub fn attr_to_prop(&self, attr: &str) -> Option<&str> {
        self.property_for_attribute(attr).map(RegisteredProperty::name)
    }

    /// Selector → attributes table.
    pub fn cascade_targets(&self) -> &[CascadeTarget] {
        &self.cascade
    }

    /// Attributes whose changes reach the changed callback.
    pub fn observed_attributes(&self) -> &[String] {
        &self.observed
    }

    /// Whether `attr` is observed.
    pub fn is_observed(&self, attr: &str) -> bool {
        self.observed.iter().any(|a| a == attr)
    }

    /// Attribute-name collisions found while building.
    pub fn conflicts(&self) -> &[AttributeConflict] {
        &self.conflicts
    }
}

fn validate(tag: &str, definition: &PropertyDefinition) -> Result<(), RegistrationError> {
    if !naming::is_valid_property_name(&definition.name) {
        return Err(RegistrationError::invalid_property_name(tag, &definition.name));
    }
    if let Some(DefaultValue::Literal(value)) = &definition.default
        && !value.is_nullish()
        && value.value_type() != Some(definition.ty)
    {
        return Err(RegistrationError::default_type_mismatch(
            tag,
            &definition.name,
            definition.ty,
            value.to_attribute_value(),
        ));
    }
    Ok(())
}

static_assertions::assert_impl_all!(ComponentRegistry: Send, Sync);
static_assertions::assert_impl_all!(DefinedClass: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;

    fn build(own: Vec<PropertyDefinition>) -> Result<ComponentRegistry, RegistrationError> {
        let mut observers: HashMap<String, Observer> = HashMap::new();
        observers.insert("noop".into(), Arc::new(|_: &mut Host, _, _: &PropertyValue, _: &PropertyValue| {}));
        ComponentRegistry::build("x-widget", own, base::properties(), &observers, None)
    }

    #[test]
    fn test_base_wins_and_order_follows_spread() {
        let registry = build(vec![
            PropertyDefinition::string("first"),
            PropertyDefinition::number("on"),
            PropertyDefinition::string("last"),
        ])
        .unwrap();

        let names: Vec<&str> = registry.properties().map(RegisteredProperty::name).collect();
        assert_eq!(&names[..3], &["first", "on", "last"]);
        assert_eq!(registry.property("on").unwrap().definition().ty, PropertyType::String);
        assert!(names.contains(&"hlelement"));
    }

    #[test]
    fn test_attribute_maps() {
        let registry = build(vec![
            PropertyDefinition::number("selectedIndex"),
            PropertyDefinition::string("selected").attr("aria-selected"),
        ])
        .unwrap();

        assert_eq!(registry.prop_to_attr("selectedIndex"), Some("selected-index"));
        assert_eq!(registry.attr_to_prop("selected-index"), Some("selectedIndex"));
        assert_eq!(registry.attr_to_prop("aria-selected"), Some("selected"));
        assert_eq!(registry.prop_to_attr("_style"), Some("style"));
        assert_eq!(registry.attr_to_prop("hl-theme"), Some("oldTheme"));

        for property in registry.properties() {
            let attr = property.attr_name();
            assert_eq!(registry.attr_to_prop(attr), Some(property.name()));
        }
    }

    #[test]
    fn test_cascade_table_groups_attributes_by_selector() {
        let registry = build(vec![
            PropertyDefinition::boolean("vertical").cascade("x-item, x-panel"),
            PropertyDefinition::string("variant").cascade_to(["x-item"]),
        ])
        .unwrap();

        let targets = registry.cascade_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].selector, "x-item");
        assert_eq!(targets[0].attributes, vec!["vertical", "variant"]);
        assert_eq!(targets[1].attributes, vec!["vertical"]);
        assert!(registry.is_observed("vertical"));
        assert!(registry.is_observed("variant"));
    }

    #[test]
    fn test_observed_attributes_cover_observer_cascade_alias() {
        let registry = build(vec![
            PropertyDefinition::string("plain"),
            PropertyDefinition::string("watched").observer("noop"),
            PropertyDefinition::string("legacy").attr("x-legacy").alias("watched"),
        ])
        .unwrap();

        assert!(!registry.is_observed("plain"));
        assert!(registry.is_observed("watched"));
        assert!(registry.is_observed("x-legacy"));
        assert!(registry.is_observed("style"));
        assert!(registry.is_observed("hl-theme"));
    }

    #[test]
    fn test_fatal_validation() {
        assert!(matches!(
            build(vec![PropertyDefinition::string("Bad")]),
            Err(RegistrationError::InvalidPropertyName { .. })
        ));
        assert!(matches!(
            build(vec![PropertyDefinition::number("count").default("3")]),
            Err(RegistrationError::DefaultTypeMismatch { .. })
        ));
        assert!(matches!(
            build(vec![PropertyDefinition::string("x").observer("missing")]),
            Err(RegistrationError::UnknownObserver { .. })
        ));
        assert!(matches!(
            build(vec![PropertyDefinition::string("x").alias("missing")]),
            Err(RegistrationError::UnknownAlias { .. })
        ));
        assert!(matches!(
            build(vec![PropertyDefinition::string("x").cascade_to(["a:hover"])]),
            Err(RegistrationError::InvalidCascade { .. })
        ));
        assert!(
            build(vec![PropertyDefinition::number("count").default_with(|_, _| "3".into())]).is_ok()
        );
    }

    #[test]
    fn test_duplicate_attribute_is_reported_not_fatal() {
        let registry = build(vec![
            PropertyDefinition::string("one").attr("shared"),
            PropertyDefinition::string("two").attr("shared"),
        ])
        .unwrap();
        assert_eq!(
            registry.conflicts(),
            &[AttributeConflict {
                attribute: "shared".into(),
                first: "one".into(),
                second: "two".into(),
            }]
        );
        assert_eq!(registry.attr_to_prop("shared"), Some("two"));
    }

    #[test]
    fn test_component_type_default_is_per_class() {
        let observers = base::observers();
        let registry = ComponentRegistry::build(
            "x-box",
            Vec::new(),
            base::properties(),
            &observers,
            Some(ComponentType::Container),
        )
        .unwrap();
        assert!(matches!(
            &registry.property("type").unwrap().definition().default,
            Some(DefaultValue::Literal(PropertyValue::String(s))) if s == "container"
        ));
        assert!(base::properties().iter().all(|d| d.name != "type" || d.default.is_none()));
    }

    #[test]
    fn test_custom_element_names() {
        assert!(is_valid_custom_element_name("hl-tabs"));
        assert!(!is_valid_custom_element_name("tabs"));
        assert!(!is_valid_custom_element_name("Hl-tabs"));
        assert!(!is_valid_custom_element_name("-tabs"));
    }
}
