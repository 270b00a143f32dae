//! Attribute cascade.
//!
//! Properties declared with cascade selectors copy their attribute to every
//! matching element below the component, in its light tree and in its
//! shadow tree. Three entry points exist:
//!
//! - a single attribute after it changed ([`Host::cascade_attribute`]),
//! - every cascading attribute after a render, deferred until the family
//!   components named by the selectors are defined ([`Host::cascade_all`]),
//! - nodes added under the component, reported by its cascade watcher.
//!
//! The latter two run with the cascade watcher paused so that the copies do
//! not feed back into it.

use crate::Host;
use crate::dom::{NodeId, SelectorList};
use crate::error::ResultExt;
use crate::host::{FAMILY_PREFIX, MutationRecord, WatcherKind};
use crate::logging::targets;

impl Host {
    /// Copy `attr` of `el` to everything matching `selectors` in its light
    /// and shadow trees.
    pub fn cascade_attribute(&mut self, el: NodeId, attr: &str, selectors: &[SelectorList]) {
        for selector in selectors {
            for recipient in self.cascade_recipients(el, selector) {
                self.copy_attribute(el, attr, recipient);
            }
        }
    }

    /// Cascade every cascading attribute once the family components the
    /// selectors name are defined.
    pub fn cascade_all(&mut self, el: NodeId) {
        let Some(registry) = self.registry_of(el) else {
            return;
        };
        if registry.cascade_targets().is_empty() {
            return;
        }
        let family_prefix = format!("{FAMILY_PREFIX}-");
        let tags: Vec<String> = registry
            .cascade_targets()
            .iter()
            .flat_map(|target| target.selectors.type_names())
            .filter(|tag| tag.starts_with(&family_prefix))
            .map(str::to_string)
            .collect();

        self.when_defined(tags, move |host| {
            if !host.is_connected_component(el) {
                if let Some(instance) = host.instances.get_mut(&el) {
                    instance.cascade_pending = true;
                }
                return;
            }
            host.with_watcher_paused(el, WatcherKind::Cascade, |host| {
                for target in registry.cascade_targets() {
                    for attr in &target.attributes {
                        host.cascade_attribute(el, attr, std::slice::from_ref(&target.selectors));
                    }
                }
            });
        });
    }

    /// Cascade to nodes added under `el`, matching each added node against
    /// the cascade table.
    pub(crate) fn cascade_mutations(&mut self, el: NodeId, records: &[MutationRecord]) {
        let added: Vec<NodeId> = records
            .iter()
            .flat_map(MutationRecord::added_nodes)
            .copied()
            .filter(|n| self.document.is_element(*n))
            .collect();
        if added.is_empty() {
            return;
        }
        self.cascade_to_nodes(el, &added);
    }

    /// Copy the cascading attributes of `el` to those of `nodes` that match a
    /// cascade selector.
    pub fn cascade_to_nodes(&mut self, el: NodeId, nodes: &[NodeId]) {
        let Some(registry) = self.registry_of(el) else {
            return;
        };
        self.with_watcher_paused(el, WatcherKind::Cascade, |host| {
            for &node in nodes {
                for target in registry.cascade_targets() {
                    if !host.document.matches(node, &target.selectors) {
                        continue;
                    }
                    for attr in &target.attributes {
                        host.copy_attribute(el, attr, node);
                    }
                }
            }
        });
    }

    fn cascade_recipients(&self, el: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        let mut recipients = self.document.query_selector_all(el, selectors);
        if let Some(shadow) = self.document.shadow_root(el) {
            recipients.extend(self.document.query_selector_all(shadow, selectors));
        }
        recipients
    }

    /// Mirror `attr` of `from` onto `to`: set when present, removed when
    /// absent.
    fn copy_attribute(&mut self, from: NodeId, attr: &str, to: NodeId) {
        let value = self.document.get_attribute(from, attr).map(str::to_string);
        tracing::trace!(target: targets::CASCADE, ?from, ?to, attr, ?value, "copy attribute");
        let result = match value {
            Some(value) => self.set_attribute(to, attr, &value),
            None => self.remove_attribute(to, attr),
        };
        result.or_warn("could not cascade an attribute");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyDefinition;
    use crate::registry::ComponentClass;

    fn setup() -> (Host, NodeId) {
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-frame")
                .template("<section><span class=\"mirror\"></span></section>")
                .property(PropertyDefinition::string("tone").cascade(".mirror, .item")),
        )
        .unwrap();
        let frame = host.create_element("x-frame");
        let body = host.document().body();
        host.append_child(body, frame).unwrap();
        host.run_until_idle();
        (host, frame)
    }

    #[test]
    fn test_change_copies_to_light_and_shadow() {
        let (mut host, frame) = setup();
        let item = host.create_element("div");
        host.set_attribute(item, "class", "item").unwrap();
        host.append_child(frame, item).unwrap();

        host.set_attribute(frame, "tone", "warm").unwrap();
        let shadow = host.document().shadow_root(frame).unwrap();
        let section = host.document().first_element_child(shadow).unwrap();
        let mirror = host.document().first_element_child(section).unwrap();
        assert_eq!(host.document().get_attribute(item, "tone"), Some("warm"));
        assert_eq!(host.document().get_attribute(mirror, "tone"), Some("warm"));

        host.remove_attribute(frame, "tone").unwrap();
        assert!(!host.document().has_attribute(item, "tone"));
        assert!(!host.document().has_attribute(mirror, "tone"));
    }

    #[test]
    fn test_added_nodes_are_cascaded_after_delivery() {
        let (mut host, frame) = setup();
        host.set_attribute(frame, "tone", "cool").unwrap();

        let late = host.create_element("p");
        host.set_attribute(late, "class", "item").unwrap();
        host.append_child(frame, late).unwrap();
        assert!(!host.document().has_attribute(late, "tone"));

        host.run_until_idle();
        assert_eq!(host.document().get_attribute(late, "tone"), Some("cool"));
        assert!(host.watchers().is_armed(frame, WatcherKind::Cascade));
    }

    #[test]
    fn test_render_cascade_waits_for_family_definitions() {
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-host")
                .property(PropertyDefinition::string("tone").default("calm").cascade("hl-leaf")),
        )
        .unwrap();
        let el = host.create_element("x-host");
        assert_eq!(host.custom_elements().pending_waiters(), 1);

        let leaf = host.create_element("hl-leaf");
        host.append_child(el, leaf).unwrap();
        let body = host.document().body();
        host.append_child(body, el).unwrap();
        host.run_until_idle();
        assert_eq!(host.document().get_attribute(leaf, "tone"), Some("calm"));

        host.unobserve(el, WatcherKind::Cascade);
        host.remove_attribute(leaf, "tone").unwrap();
        host.define(ComponentClass::new("hl-leaf")).unwrap();
        assert!(!host.document().has_attribute(leaf, "tone"));

        host.run_until_idle();
        assert_eq!(host.custom_elements().pending_waiters(), 0);
        assert!(!host.watchers().is_armed(el, WatcherKind::Cascade));
        assert_eq!(host.document().get_attribute(leaf, "tone"), Some("calm"));
    }

    #[test]
    fn test_render_cascade_skips_disconnected_until_connected() {
        let mut host = Host::new();
        host.define(
            ComponentClass::new("x-host")
                .property(PropertyDefinition::string("tone").cascade("hl-leaf")),
        )
        .unwrap();
        host.define(ComponentClass::new("hl-leaf")).unwrap();

        let el = host.create_element("x-host");
        host.unobserve(el, WatcherKind::Cascade);
        host.set_attribute(el, "tone", "calm").unwrap();
        let leaf = host.create_element("hl-leaf");
        host.append_child(el, leaf).unwrap();
        host.run_until_idle();
        assert!(!host.document().has_attribute(leaf, "tone"));
        assert!(host.instance(el).is_some_and(|i| i.cascade_pending));

        let body = host.document().body();
        host.append_child(body, el).unwrap();
        host.run_until_idle();
        assert_eq!(host.document().get_attribute(leaf, "tone"), Some("calm"));
        assert!(host.instance(el).is_some_and(|i| !i.cascade_pending));
    }
}
