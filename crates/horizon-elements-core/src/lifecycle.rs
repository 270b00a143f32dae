//! Component lifecycle.
//!
//! Every upgraded element goes through the same phases:
//!
//! ```text
//! constructed → rendered → connected ⇄ disconnected
//! ```
//!
//! Construction assigns the mark id, records which accessors are live,
//! attaches the shadow root and renders unless the class delays it. Connecting
//! writes missing attribute defaults, registers the instance and arms its
//! watchers; disconnecting disarms them and unregisters it.
//!
//! Widgets customize the phases through [`ComponentBehavior`]. The default
//! `connected`/`disconnected` hooks run the base steps; overrides are
//! expected to call [`Host::base_connected`] / [`Host::base_disconnected`]
//! themselves.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::Host;
use crate::dom::{DomError, NodeId};
use crate::error::ResultExt;
use crate::host::{FAMILY_PREFIX, MutationRecord, NATIVE_PROPERTIES, UiEvent, WatcherKind, WatcherOptions};
use crate::logging::{PerfSpan, targets};
use crate::property::{PropertyValue, coerce_attribute};
use crate::registry::DefinedClass;

/// Per-class lifecycle hooks.
///
/// The registry is shared by every instance, so hooks receive the host and
/// the element instead of `self` state. Per-instance data lives in
/// [`Host::set_state`].
pub trait ComponentBehavior: Send + Sync + 'static {
    /// After construction and the first render.
    fn constructed(&self, _host: &mut Host, _el: NodeId) {}

    /// The element became connected.
    fn connected(&self, host: &mut Host, el: NodeId) {
        host.base_connected(el);
    }

    /// The element became disconnected.
    fn disconnected(&self, host: &mut Host, el: NodeId) {
        host.base_disconnected(el);
    }

    /// Records delivered to the element's [`WatcherKind::LightDom`] watcher.
    fn light_dom_changed(&self, _host: &mut Host, _el: NodeId, _records: &[MutationRecord]) {}

    /// A click or key press on the composed path through the element.
    fn handle_event(&self, _host: &mut Host, _el: NodeId, _event: &mut UiEvent) {}

    /// Session history moved while the element was a popstate listener.
    fn history_navigated(&self, _host: &mut Host, _el: NodeId) {}
}

/// Hooks that only run the base steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl ComponentBehavior for DefaultBehavior {}

/// Framework data of one upgraded element.
pub struct ComponentInstance {
    class: Arc<DefinedClass>,
    mark_id: String,
    render_count: u32,
    rendered: bool,
    connected: bool,
    /// A render cascade was dropped while disconnected.
    pub(crate) cascade_pending: bool,
    accessors: Vec<String>,
    pub(crate) state: Option<Box<dyn Any + Send>>,
}

impl ComponentInstance {
    pub fn class(&self) -> &Arc<DefinedClass> {
        &self.class
    }

    /// Identifier used for performance marks.
    pub fn mark_id(&self) -> &str {
        &self.mark_id
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> u32 {
        self.render_count
    }

    /// Properties that got an accessor; native names are not among them.
    pub fn accessors(&self) -> &[String] {
        &self.accessors
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("tag", &self.class.tag())
            .field("mark_id", &self.mark_id)
            .field("rendered", &self.rendered)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

fn mark_id(tag: &str, id: &str, random: impl FnOnce() -> String) -> String {
    if id.is_empty() {
        random().replacen(FAMILY_PREFIX, tag, 1)
    } else if id.starts_with("hl-") && !id.starts_with(tag) {
        id.replacen(FAMILY_PREFIX, tag, 1)
    } else {
        format!("{tag}-{id}")
    }
}

impl Host {
    pub(crate) fn construct(&mut self, el: NodeId, class: Arc<DefinedClass>) {
        let tag = class.tag().to_string();
        let id = self.document.id(el).to_string();
        let mark_id = mark_id(&tag, &id, || self.random_id());

        let registry = class.registry().clone();
        let mut accessors = Vec::new();
        for property in registry.properties() {
            let name = property.name();
            if NATIVE_PROPERTIES.contains(&name) {
                self.warn(
                    el,
                    format_args!("Property \"{name}\" on {tag} cannot be defined because the property name is reserved"),
                );
                continue;
            }
            accessors.push(name.to_string());
        }

        match self.document.attach_shadow(el) {
            Ok(_) | Err(DomError::ShadowRootExists(_)) => {}
            Err(err) => self.warn(el, format_args!("could not attach a shadow root: {err}")),
        }

        self.instances.insert(
            el,
            ComponentInstance {
                class: class.clone(),
                mark_id,
                render_count: 0,
                rendered: false,
                connected: false,
                cascade_pending: false,
                accessors,
                state: None,
            },
        );
        if !registry.cascade_targets().is_empty() {
            self.watchers.create(el, WatcherKind::Cascade);
        }
        self.log(el, "Constructed");

        if !class.delays_render() {
            self.render(el);
        }
        class.behavior().constructed(self, el);
    }

    /// Upgrade an element whose class is defined: construct it, replay its
    /// observed attributes, and run the connected callback when connected.
    pub(crate) fn upgrade(&mut self, el: NodeId) {
        if self.instances.contains_key(&el) {
            return;
        }
        let Some(class) = self
            .document
            .tag_name(el)
            .and_then(|tag| self.definitions.get(tag))
            .cloned()
        else {
            return;
        };
        self.construct(el, class.clone());

        let replay: Vec<(String, String)> = class
            .registry()
            .observed_attributes()
            .iter()
            .filter_map(|attr| {
                self.document
                    .get_attribute(el, attr)
                    .map(|value| (attr.clone(), value.to_string()))
            })
            .collect();
        for (attr, value) in replay {
            self.attribute_changed(el, &attr, None, Some(&value));
        }

        if self.document.is_connected(el) {
            self.connected_callback(el);
        }
    }

    /// Replace the shadow content with a fresh copy of the template, then
    /// cascade and update context.
    pub fn render(&mut self, el: NodeId) {
        let Some(instance) = self.instances.get(&el) else {
            return;
        };
        let class = instance.class.clone();
        let mark = instance.mark_id.clone();
        let first_render = instance.render_count < 1;
        let _span = self.config.track_performance.then(|| PerfSpan::new("render", &mark));

        let Some(shadow) = self.document.shadow_root(el) else {
            return;
        };
        self.clear_children(shadow);
        if let Err(err) = class.template().instantiate(&mut self.document, shadow) {
            self.warn(el, format_args!("template could not be instantiated: {err}"));
        }
        if self.document.is_connected(shadow) {
            self.connect_subtree(shadow);
        }
        self.log(el, "render");

        self.cascade_all(el);
        self.context_update(el);

        if self.config.track_performance {
            tracing::info!(target: targets::PERF, mark = %format!("{mark}-rendered"), "performance mark");
            if first_render {
                tracing::info!(
                    target: targets::PERF,
                    measure = %format!("{mark}-first-render"),
                    "performance measure"
                );
            }
        }

        if let Some(instance) = self.instances.get_mut(&el) {
            instance.render_count += 1;
            instance.rendered = true;
        }
        if self.watchers.exists(el, WatcherKind::Cascade) {
            self.watchers.arm(el, WatcherKind::Cascade, el, WatcherOptions::subtree_all());
        }
    }

    pub(crate) fn connected_callback(&mut self, el: NodeId) {
        let Some(instance) = self.instances.get_mut(&el) else {
            return;
        };
        if instance.connected {
            return;
        }
        instance.connected = true;
        let behavior = instance.class.behavior();
        behavior.connected(self, el);
    }

    pub(crate) fn disconnected_callback(&mut self, el: NodeId) {
        let Some(instance) = self.instances.get_mut(&el) else {
            return;
        };
        if !instance.connected {
            return;
        }
        instance.connected = false;
        let behavior = instance.class.behavior();
        behavior.disconnected(self, el);
    }

    /// Base connected steps: attribute defaults, instance lists, slot
    /// tracking and the cascade watcher.
    pub fn base_connected(&mut self, el: NodeId) {
        let Some(class) = self.class_of(el) else {
            return;
        };
        self.log(el, "connectedCallback");
        self.apply_defaults(el);

        if !self.all_instances.contains(&el) {
            self.all_instances.push(el);
        }
        let list = self.class_instances.entry(class.tag().to_string()).or_default();
        if !list.contains(&el) {
            list.push(el);
        }

        if !class.slots().is_empty() {
            self.watchers.create(el, WatcherKind::Slots);
            self.initialize_slots(el);
        }

        let rendered = self.instances.get(&el).is_some_and(ComponentInstance::is_rendered);
        if rendered && self.watchers.exists(el, WatcherKind::Cascade) {
            self.watchers.arm(el, WatcherKind::Cascade, el, WatcherOptions::subtree_all());
        }
        let cascade_pending = self
            .instances
            .get_mut(&el)
            .is_some_and(|instance| std::mem::take(&mut instance.cascade_pending));
        if cascade_pending {
            self.cascade_all(el);
        }
    }

    /// Base disconnected steps: disarm every watcher and leave the instance
    /// lists.
    pub fn base_disconnected(&mut self, el: NodeId) {
        self.log(el, "disconnectedCallback");
        self.watchers.disarm_all(el);
        self.all_instances.retain(|n| *n != el);
        if let Some(tag) = self.document.tag_name(el).map(str::to_string)
            && let Some(list) = self.class_instances.get_mut(&tag)
        {
            list.retain(|n| *n != el);
        }
    }

    /// Write every declared default whose attribute is absent.
    fn apply_defaults(&mut self, el: NodeId) {
        let Some(registry) = self.registry_of(el) else {
            return;
        };
        for property in registry.properties() {
            let Some(default) = &property.definition().default else {
                continue;
            };
            let attr = property.attr_name();
            if self.document.has_attribute(el, attr) {
                continue;
            }
            let value = default.resolve(self, el);
            let name = property.name();
            if NATIVE_PROPERTIES.contains(&name) {
                if let Some(result) = self.set_native_property(el, name, &value) {
                    result.or_warn("could not apply a default");
                }
            } else {
                self.assign_attribute(el, property, attr, &value)
                    .or_warn("could not apply a default");
            }
        }
    }

    /// The attribute-changed path: alias mirroring, then the observer with
    /// coerced values, then the cascade of this one attribute.
    pub(crate) fn attribute_changed(&mut self, el: NodeId, attr: &str, old: Option<&str>, new: Option<&str>) {
        let Some(registry) = self.registry_of(el) else {
            return;
        };
        let Some(property) = registry.property_for_attribute(attr) else {
            return;
        };
        tracing::trace!(target: targets::LIFECYCLE, ?el, attr, ?old, ?new, "attribute changed");

        if let Some(alias) = property.alias().and_then(|name| registry.property(name)) {
            let mirrored = self.document.get_attribute(el, alias.attr_name());
            if mirrored != new {
                let value = coerce_attribute(alias.definition().ty, new);
                self.set_property(el, alias.name(), value)
                    .or_warn("could not mirror an aliased property");
            }
        }

        if let Some(observer) = property.observer() {
            let ty = property.definition().ty;
            observer(self, el, &coerce_attribute(ty, old), &coerce_attribute(ty, new));
        }

        if !property.cascade().is_empty() {
            self.cascade_attribute(el, attr, property.cascade());
        }
    }

    /// Coerced value of a property, or `Undefined` when the element has no
    /// such property.
    pub fn property_or_undefined(&self, el: NodeId, name: &str) -> PropertyValue {
        self.property(el, name).unwrap_or(PropertyValue::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyDefinition;
    use crate::registry::ComponentClass;
    use parking_lot::Mutex;

    #[test]
    fn test_mark_id_rules() {
        assert_eq!(mark_id("hl-tabs", "", || "hl-abc".into()), "hl-tabs-abc");
        assert_eq!(mark_id("hl-tabs", "hl-xyz", || unreachable!()), "hl-tabs-xyz");
        assert_eq!(mark_id("hl-tabs", "hl-tabs-1", || unreachable!()), "hl-tabs-hl-tabs-1");
        assert_eq!(mark_id("hl-tabs", "demo", || unreachable!()), "hl-tabs-demo");
    }

    #[test]
    fn test_construct_renders_template_into_shadow() {
        let mut host = Host::new();
        host.define(ComponentClass::new("x-card").template("<div class=\"body\"><slot></slot></div>"))
            .unwrap();
        let el = host.create_element("x-card");
        let shadow = host.document().shadow_root(el).unwrap();
        assert_eq!(host.document().element_children(shadow).len(), 1);
        assert!(host.instance(el).unwrap().is_rendered());

        host.render(el);
        assert_eq!(host.document().element_children(shadow).len(), 1);
        assert_eq!(host.instance(el).unwrap().render_count(), 2);
    }

    #[test]
    fn test_delay_render() {
        let mut host = Host::new();
        host.define(ComponentClass::new("x-lazy").template("<p></p>").delay_render(true))
            .unwrap();
        let el = host.create_element("x-lazy");
        assert!(!host.instance(el).unwrap().is_rendered());
    }

    #[test]
    fn test_defaults_apply_on_connect_only_when_absent() {
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-defaults")
                .property(PropertyDefinition::string("size").default("m"))
                .property(PropertyDefinition::boolean("open").default(false)),
        )
        .unwrap();

        let el = host.create_element("x-defaults");
        assert_eq!(host.document().get_attribute(el, "size"), None);
        host.set_attribute(el, "size", "l").unwrap();

        let body = host.document().body();
        host.append_child(body, el).unwrap();
        assert_eq!(host.document().get_attribute(el, "size"), Some("l"));
        assert!(!host.document().has_attribute(el, "open"));
        assert_eq!(host.document().get_attribute(el, "hlelement"), Some(""));
        assert!(host.document().has_class(el, "HLElement"));
    }

    #[test]
    fn test_observer_receives_coerced_values_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-counter")
                .property(PropertyDefinition::number("count").observer("count_changed"))
                .observer("count_changed", move |_, _, old, new| {
                    log.lock().push((old.clone(), new.clone()));
                }),
        )
        .unwrap();
        let el = host.create_element("x-counter");
        host.set_property(el, "count", 1).unwrap();
        host.set_property(el, "count", PropertyValue::Null).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                (PropertyValue::Undefined, PropertyValue::Number(1.0)),
                (PropertyValue::Number(1.0), PropertyValue::Undefined),
            ]
        );
    }

    #[test]
    fn test_alias_mirrors_one_level() {
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-legacy")
                .property(PropertyDefinition::string("variant").observer("noop"))
                .property(PropertyDefinition::string("oldVariant").attr("x-variant").alias("variant"))
                .observer("noop", |_, _, _, _| {}),
        )
        .unwrap();
        let el = host.create_element("x-legacy");
        host.set_attribute(el, "x-variant", "earth").unwrap();
        assert_eq!(host.document().get_attribute(el, "variant"), Some("earth"));

        host.set_attribute(el, "variant", "wind").unwrap();
        assert_eq!(host.document().get_attribute(el, "x-variant"), Some("earth"));
    }

    #[test]
    fn test_upgrade_replays_observed_attributes_before_connect() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut host = Host::new();
        let el = host.create_element("x-replay");
        host.set_attribute(el, "mode", "fast").unwrap();
        let body = host.document().body();
        host.append_child(body, el).unwrap();

        host.define(
            ComponentClass::new("x-replay")
                .property(PropertyDefinition::string("mode").observer("mode_changed"))
                .observer("mode_changed", move |host: &mut Host, el, _, new| {
                    log.lock().push((new.clone(), host.is_connected_component(el)));
                }),
        )
        .unwrap();
        assert_eq!(*seen.lock(), vec![(PropertyValue::from("fast"), false)]);
        assert!(host.is_connected_component(el));
    }

    #[test]
    fn test_reserved_names_get_no_accessor() {
        let mut host = Host::new();
        host.define(ComponentClass::new("x-reserved").property(PropertyDefinition::string("title")))
            .unwrap();
        let el = host.create_element("x-reserved");
        let accessors = host.instance(el).unwrap().accessors();
        assert!(!accessors.iter().any(|a| a == "title"));
        assert!(accessors.iter().any(|a| a == "on"));
    }
}
