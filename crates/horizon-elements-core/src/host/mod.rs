//! The single-threaded element runtime.
//!
//! [`Host`] owns the document, the custom element registry, every component
//! instance, the mutation watchers, the microtask queue and the session
//! history. All component logic runs on the thread that owns the host and
//! takes `&mut Host`; nothing is shared across threads except the immutable
//! per-class registries.
//!
//! Tree and attribute changes made through the host (not through
//! [`Document`] directly) are what drive the component lifecycle: inserting
//! a subtree into the document connects and upgrades its components,
//! writing an observed attribute runs the attribute-changed path, and every
//! change is offered to the armed mutation watchers.
//!
//! # Example
//!
//! ```
//! use horizon_elements_core::{ComponentClass, Host, PropertyDefinition, PropertyValue};
//!
//! let mut host = Host::new();
//! host.define(
//!     ComponentClass::new("x-badge").property(PropertyDefinition::number("count").default(0)),
//! )
//! .unwrap();
//!
//! let badge = host.create_element("x-badge");
//! let body = host.document().body();
//! host.append_child(body, badge).unwrap();
//! host.run_until_idle();
//!
//! assert_eq!(host.document().get_attribute(badge, "count"), Some("0"));
//! host.set_property(badge, "count", 3).unwrap();
//! assert_eq!(host.property(badge, "count").unwrap(), PropertyValue::Number(3.0));
//! ```

mod custom_elements;
mod events;
mod history;
mod watcher;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use custom_elements::CustomElementRegistry;
pub use events::{CustomEvent, EventDetail, Key, KeyboardEvent, UiEvent, UiEventKind, composed_path};
pub use history::{DEFAULT_LOCATION, History, SearchParams};
pub use watcher::{MutationRecord, WatcherBatch, WatcherId, WatcherKind, WatcherOptions, WatcherSet};

use crate::Signal;
use crate::config::ElementsConfig;
use crate::dom::{Document, DomError, NodeId};
use crate::error::{ElementError, Result};
use crate::lifecycle::{ComponentBehavior, ComponentInstance};
use crate::logging::{ElementTreeDebug, TreeFormatOptions, targets};
use crate::property::{AttributeWrite, PropertyType, PropertyValue, coerce_attribute, reflect_value};
use crate::registry::{ComponentRegistry, DefinedClass, RegisteredProperty};
use crate::task::TaskQueue;

/// Prefix of every component tag of the family.
pub const FAMILY_PREFIX: &str = "hl";

/// Element properties owned by the platform. Declared properties with these
/// names get no accessor.
pub const NATIVE_PROPERTIES: &[&str] = &[
    "id",
    "hidden",
    "title",
    "slot",
    "lang",
    "dir",
    "className",
    "tabIndex",
    "innerHTML",
    "textContent",
    "style",
    "children",
    "attributes",
    "tagName",
];

/// Upper bound on microtasks run by one [`Host::run_until_idle`].
const MAX_MICROTASKS_PER_DRAIN: usize = 100_000;

/// The element runtime.
pub struct Host {
    pub(crate) config: ElementsConfig,
    pub(crate) document: Document,
    pub(crate) definitions: CustomElementRegistry,
    pub(crate) instances: HashMap<NodeId, ComponentInstance>,
    pub(crate) all_instances: Vec<NodeId>,
    pub(crate) class_instances: HashMap<String, Vec<NodeId>>,
    pub(crate) watchers: WatcherSet,
    pub(crate) microtasks: TaskQueue<Host>,
    delivery_scheduled: bool,
    pub(crate) history: History,
    pub(crate) popstate_listeners: Vec<NodeId>,
    pub(crate) focused: Option<NodeId>,
    pub(crate) events: Arc<Signal<CustomEvent>>,
    rng: StdRng,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .field("definitions", &self.definitions)
            .field("instances", &self.instances.len())
            .field("watchers", &self.watchers.len())
            .field("pending_microtasks", &self.microtasks.pending_count())
            .field("location", &self.history.location().as_str())
            .finish()
    }
}

impl Host {
    /// A runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ElementsConfig::default())
    }

    /// A runtime with `config`.
    pub fn with_config(config: ElementsConfig) -> Self {
        Self {
            config,
            document: Document::new(),
            definitions: CustomElementRegistry::new(),
            instances: HashMap::new(),
            all_instances: Vec::new(),
            class_instances: HashMap::new(),
            watchers: WatcherSet::new(),
            microtasks: TaskQueue::new(),
            delivery_scheduled: false,
            history: History::default(),
            popstate_listeners: Vec::new(),
            focused: None,
            events: Arc::new(Signal::new()),
            rng: StdRng::from_entropy(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ElementsConfig {
        &self.config
    }

    /// The element tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutation watchers.
    pub fn watchers(&self) -> &WatcherSet {
        &self.watchers
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    /// Whether `node` is an upgraded component.
    pub fn is_component(&self, node: NodeId) -> bool {
        self.instances.contains_key(&node)
    }

    /// Whether `node` is an upgraded component in its connected phase.
    pub fn is_connected_component(&self, node: NodeId) -> bool {
        self.instances.get(&node).is_some_and(ComponentInstance::is_connected)
    }

    /// Instance data of a component.
    pub fn instance(&self, node: NodeId) -> Option<&ComponentInstance> {
        self.instances.get(&node)
    }

    /// Class of a component.
    pub fn class_of(&self, node: NodeId) -> Option<Arc<DefinedClass>> {
        self.instances.get(&node).map(|i| i.class().clone())
    }

    /// Property registry of a component.
    pub fn registry_of(&self, node: NodeId) -> Option<Arc<ComponentRegistry>> {
        self.instances.get(&node).map(|i| i.class().registry().clone())
    }

    pub(crate) fn behavior_of(&self, node: NodeId) -> Option<Arc<dyn ComponentBehavior>> {
        self.instances.get(&node).map(|i| i.class().behavior())
    }

    /// Every connected instance, in connection order.
    pub fn all_instances(&self) -> &[NodeId] {
        &self.all_instances
    }

    /// Connected instances of one class, in connection order.
    pub fn instances_of(&self, tag: &str) -> &[NodeId] {
        self.class_instances.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Component-specific state attached to `el`.
    pub fn state<T: Any>(&self, el: NodeId) -> Option<&T> {
        self.instances.get(&el)?.state.as_ref()?.downcast_ref()
    }

    /// Mutable component-specific state.
    pub fn state_mut<T: Any>(&mut self, el: NodeId) -> Option<&mut T> {
        self.instances.get_mut(&el)?.state.as_mut()?.downcast_mut()
    }

    /// Attach component-specific state to `el`, replacing any previous one.
    pub fn set_state<T: Any + Send>(&mut self, el: NodeId, state: T) {
        if let Some(instance) = self.instances.get_mut(&el) {
            instance.state = Some(Box::new(state));
        }
    }

    // -------------------------------------------------------------------------
    // Tree mutation
    // -------------------------------------------------------------------------

    /// Create an element; defined tags are constructed immediately.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let el = self.document.create_element(tag);
        if let Some(class) = self.definitions.get(&tag.to_ascii_lowercase()).cloned() {
            self.construct(el, class);
        }
        el
    }

    /// Create a text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.document.create_text(text)
    }

    /// Append `child` to `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> std::result::Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> std::result::Result<(), DomError> {
        let was_connected = self.document.is_connected(child);
        let old_parent = self.document.parent(child);
        self.document.insert_before(parent, child, reference)?;

        if let Some(old_parent) = old_parent {
            self.record(MutationRecord::ChildList {
                target: old_parent,
                added: Vec::new(),
                removed: vec![child],
            });
        }
        if was_connected {
            self.disconnect_subtree(child);
        }
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        if self.document.is_connected(child) {
            self.connect_subtree(child);
        }
        Ok(())
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> std::result::Result<(), DomError> {
        let was_connected = self.document.is_connected(child);
        self.document.remove_child(parent, child)?;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
        if was_connected {
            self.disconnect_subtree(child);
        }
        Ok(())
    }

    /// Detach `node` from its parent, if any.
    pub fn remove(&mut self, node: NodeId) -> std::result::Result<(), DomError> {
        match self.document.parent(node) {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Remove every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let was_connected = self.document.is_connected(node);
        let removed = self.document.clear_children(node);
        if removed.is_empty() {
            return;
        }
        self.record(MutationRecord::ChildList {
            target: node,
            added: Vec::new(),
            removed: removed.clone(),
        });
        if was_connected {
            for child in removed {
                self.disconnect_subtree(child);
            }
        }
    }

    /// Replace the children of `node` with a single text node (none for an
    /// empty string).
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> std::result::Result<(), DomError> {
        let was_connected = self.document.is_connected(node);
        let removed = self.document.clear_children(node);
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.document.create_text(text);
            self.document.append_child(node, text_node)?;
            added.push(text_node);
        }
        if added.is_empty() && removed.is_empty() {
            return Ok(());
        }
        self.record(MutationRecord::ChildList {
            target: node,
            added,
            removed: removed.clone(),
        });
        if was_connected {
            for child in removed {
                self.disconnect_subtree(child);
            }
        }
        Ok(())
    }

    /// Replace the data of a text node.
    pub fn set_text(&mut self, text_node: NodeId, text: &str) -> std::result::Result<(), DomError> {
        self.document.set_text(text_node, text)?;
        self.record(MutationRecord::CharacterData { target: text_node });
        Ok(())
    }

    /// Set an attribute. Observed attributes of components run the
    /// attribute-changed path, even when the value does not change.
    pub fn set_attribute(&mut self, el: NodeId, name: &str, value: &str) -> std::result::Result<(), DomError> {
        let old = self.document.set_attribute(el, name, value)?;
        self.record(MutationRecord::Attributes {
            target: el,
            name: name.to_string(),
            old_value: old.clone(),
        });
        self.notify_attribute_changed(el, name, old.as_deref(), Some(value));
        Ok(())
    }

    /// Remove an attribute. Removing an absent attribute does nothing.
    pub fn remove_attribute(&mut self, el: NodeId, name: &str) -> std::result::Result<(), DomError> {
        let Some(old) = self.document.remove_attribute(el, name)? else {
            return Ok(());
        };
        self.record(MutationRecord::Attributes {
            target: el,
            name: name.to_string(),
            old_value: Some(old.clone()),
        });
        self.notify_attribute_changed(el, name, Some(&old), None);
        Ok(())
    }

    /// Add a class to the `class` attribute.
    pub fn add_class(&mut self, el: NodeId, class: &str) -> std::result::Result<(), DomError> {
        if self.document.has_class(el, class) {
            return Ok(());
        }
        let value = match self.document.get_attribute(el, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attribute(el, "class", &value)
    }

    fn notify_attribute_changed(&mut self, el: NodeId, name: &str, old: Option<&str>, new: Option<&str>) {
        let observed = self
            .instances
            .get(&el)
            .is_some_and(|i| i.class().registry().is_observed(name));
        if observed {
            self.attribute_changed(el, name, old, new);
        }
    }

    pub(crate) fn connect_subtree(&mut self, node: NodeId) {
        for n in self.document.shadow_including_inclusive_descendants(node) {
            if !self.document.is_element(n) || !self.document.is_connected(n) {
                continue;
            }
            if self.instances.contains_key(&n) {
                self.connected_callback(n);
            } else if self
                .document
                .tag_name(n)
                .is_some_and(|tag| self.definitions.is_defined(tag))
            {
                self.upgrade(n);
            }
        }
    }

    pub(crate) fn disconnect_subtree(&mut self, node: NodeId) {
        for n in self.document.shadow_including_inclusive_descendants(node) {
            if self.instances.contains_key(&n) {
                self.disconnected_callback(n);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Read a property through its accessor.
    ///
    /// Names reserved by the platform use native reflection instead of the
    /// declared definition.
    pub fn property(&self, el: NodeId, name: &str) -> Result<PropertyValue> {
        let registry = self.registry_of(el).ok_or(ElementError::NotAComponent { node: el })?;
        if NATIVE_PROPERTIES.contains(&name) {
            return self.native_property(el, name).ok_or_else(|| unknown(&registry, name));
        }
        let property = registry.property(name).ok_or_else(|| unknown(&registry, name))?;
        let raw = self.document.get_attribute(el, property.attr_name());
        Ok(coerce_attribute(property.definition().ty, raw))
    }

    /// Write a property through its accessor; the backing attribute is
    /// updated and the attribute-changed path runs.
    pub fn set_property(&mut self, el: NodeId, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let value = value.into();
        let registry = self.registry_of(el).ok_or(ElementError::NotAComponent { node: el })?;
        if NATIVE_PROPERTIES.contains(&name) {
            return match self.set_native_property(el, name, &value) {
                Some(result) => Ok(result?),
                None => Err(unknown(&registry, name)),
            };
        }
        let property = registry.property(name).ok_or_else(|| unknown(&registry, name))?;
        self.assign_attribute(el, property, property.attr_name(), &value)?;
        Ok(())
    }

    /// The string value of a property, if it has a non-empty one.
    pub fn string_property(&self, el: NodeId, name: &str) -> Option<String> {
        match self.property(el, name) {
            Ok(PropertyValue::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub(crate) fn assign_attribute(
        &mut self,
        el: NodeId,
        property: &RegisteredProperty,
        attr: &str,
        value: &PropertyValue,
    ) -> std::result::Result<(), DomError> {
        let definition = property.definition();
        match reflect_value(definition.ty, value) {
            AttributeWrite::Remove => self.remove_attribute(el, attr),
            AttributeWrite::Set(text) => {
                let is_bare_boolean =
                    definition.ty == PropertyType::Boolean && matches!(value, PropertyValue::Boolean(_));
                if !is_bare_boolean && !definition.accepts(value) {
                    self.warn(
                        el,
                        format_args!(
                            "{text} is not a valid value for {attr}. Please provide one of the following values: {}",
                            definition.values.join(", ")
                        ),
                    );
                }
                self.set_attribute(el, attr, &text)
            }
        }
    }

    fn native_property(&self, el: NodeId, name: &str) -> Option<PropertyValue> {
        let doc = &self.document;
        let string = |attr: &str| PropertyValue::String(doc.get_attribute(el, attr).unwrap_or_default().to_string());
        Some(match name {
            "hidden" => PropertyValue::Boolean(doc.has_attribute(el, "hidden")),
            "id" | "title" | "slot" | "lang" | "dir" => string(name),
            "className" => string("class"),
            "tabIndex" => PropertyValue::Number(
                doc.get_attribute(el, "tabindex")
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(-1.0),
            ),
            _ => return None,
        })
    }

    pub(crate) fn set_native_property(
        &mut self,
        el: NodeId,
        name: &str,
        value: &PropertyValue,
    ) -> Option<std::result::Result<(), DomError>> {
        let attr = match name {
            "hidden" => {
                return Some(if value.is_truthy() {
                    self.set_attribute(el, "hidden", "")
                } else {
                    self.remove_attribute(el, "hidden")
                });
            }
            "id" | "title" | "slot" | "lang" | "dir" => name,
            "className" => "class",
            "tabIndex" => "tabindex",
            _ => return None,
        };
        Some(self.set_attribute(el, attr, &value.to_attribute_value()))
    }

    // -------------------------------------------------------------------------
    // Microtasks and mutation delivery
    // -------------------------------------------------------------------------

    /// Queue a microtask.
    pub fn queue_microtask<F>(&mut self, task: F)
    where
        F: FnOnce(&mut Host) + Send + 'static,
    {
        self.microtasks.post(task);
    }

    /// Whether microtasks are pending.
    pub fn has_pending_microtasks(&self) -> bool {
        self.microtasks.has_pending()
    }

    /// Run microtasks (including mutation delivery) until none are left.
    pub fn run_until_idle(&mut self) {
        let mut ran = 0usize;
        while let Some(task) = self.microtasks.pop() {
            task(self);
            ran += 1;
            if ran >= MAX_MICROTASKS_PER_DRAIN {
                crate::elements_error!(
                    ran,
                    pending = self.microtasks.pending_count(),
                    "microtask queue did not settle; stopping this drain"
                );
                break;
            }
        }
    }

    fn record(&mut self, record: MutationRecord) {
        if self.watchers.record(&self.document, &record) && !self.delivery_scheduled {
            self.delivery_scheduled = true;
            self.microtasks.post(Host::deliver_mutations);
        }
    }

    fn deliver_mutations(&mut self) {
        self.delivery_scheduled = false;
        for batch in self.watchers.take_batches() {
            if !self.watchers.is_armed(batch.owner, batch.kind) || !self.is_component(batch.owner) {
                continue;
            }
            tracing::trace!(
                target: targets::DOM,
                owner = ?batch.owner,
                kind = ?batch.kind,
                records = batch.records.len(),
                "delivering mutations"
            );
            match batch.kind {
                WatcherKind::Cascade => self.cascade_mutations(batch.owner, &batch.records),
                WatcherKind::Slots => self.initialize_slots(batch.owner),
                WatcherKind::LightDom => {
                    if let Some(behavior) = self.behavior_of(batch.owner) {
                        behavior.light_dom_changed(self, batch.owner, &batch.records);
                    }
                }
            }
        }
    }

    /// Disarm the watcher of `kind` on `el`, run `f`, and re-arm it with the
    /// same options if it was armed.
    pub fn with_watcher_paused<R>(&mut self, el: NodeId, kind: WatcherKind, f: impl FnOnce(&mut Host) -> R) -> R {
        let previous = self.watchers.disarm(el, kind);
        let result = f(self);
        if let Some(options) = previous {
            self.watchers.arm(el, kind, el, options);
        }
        result
    }

    /// Create (if needed) and arm a watcher of `kind` observing `el`.
    pub fn observe(&mut self, el: NodeId, kind: WatcherKind, options: WatcherOptions) {
        self.watchers.create(el, kind);
        self.watchers.arm(el, kind, el, options);
    }

    /// Disarm the watcher of `kind` on `el`.
    pub fn unobserve(&mut self, el: NodeId, kind: WatcherKind) {
        self.watchers.disarm(el, kind);
    }

    // -------------------------------------------------------------------------
    // Identity and logging
    // -------------------------------------------------------------------------

    /// A fresh id: the family prefix, a hyphen and nine base-36 characters.
    pub fn random_id(&mut self) -> String {
        const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let suffix: String = (0..9)
            .map(|_| DIGITS[self.rng.gen_range(0..DIGITS.len())] as char)
            .collect();
        format!("{FAMILY_PREFIX}-{suffix}")
    }

    /// `[tag#id]` label used in messages about `el`.
    pub fn label(&self, el: NodeId) -> String {
        let tag = self.document.tag_name(el).unwrap_or("#node");
        match self.document.id(el) {
            "" => format!("[{tag}]"),
            id => format!("[{tag}#{id}]"),
        }
    }

    /// Debug message about `el`, emitted only with `debug_log` on.
    pub fn log(&self, el: NodeId, message: impl fmt::Display) {
        if self.config.debug_log {
            tracing::debug!(target: targets::LIFECYCLE, "{} {}", self.label(el), message);
        }
    }

    /// Debug message without an element, emitted only with `debug_log` on.
    pub fn log_global(&self, message: impl fmt::Display) {
        if self.config.debug_log {
            crate::elements_debug!("{message}");
        }
    }

    /// Compact tree dump of `el` and its descendants.
    pub fn debug_tree(&self, el: NodeId) -> String {
        ElementTreeDebug::with_options(TreeFormatOptions::minimal()).format_subtree(&self.document, el)
    }

    /// Warning about `el`; always emitted.
    pub fn warn(&self, el: NodeId, message: impl fmt::Display) {
        crate::elements_warn!("{} {}", self.label(el), message);
    }
}

fn unknown(registry: &ComponentRegistry, name: &str) -> ElementError {
    ElementError::UnknownProperty {
        tag: registry.tag().to_string(),
        property: name.to_string(),
    }
}
