//! Context propagation.
//!
//! A component's `on` value describes the background it sits on. When it
//! changes, the component pushes it to the family components nested
//! directly below it, in its light tree and in its shadow tree. Each of
//! those recomputes its own value from, in priority order, its `context`
//! attribute, the inherited `--context` (or legacy `--theme`) custom
//! property, and the pushed value. Nothing happens when the result equals
//! the current `on`, which is what stops the `on` observer from cycling.

use crate::Host;
use crate::base::UPGRADE_MARKER;
use crate::dom::{Document, InlineStyle, NodeId, computed_custom_property};
use crate::error::ResultExt;
use crate::host::FAMILY_PREFIX;
use crate::logging::targets;
use crate::property::PropertyValue;

fn is_family_element(doc: &Document, node: NodeId) -> bool {
    doc.tag_name(node)
        .and_then(|tag| tag.strip_prefix(FAMILY_PREFIX))
        .is_some_and(|rest| rest.starts_with('-'))
}

/// Nearest inclusive element ancestor carrying the upgrade marker. The walk
/// stops at a shadow root.
fn closest_upgraded(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node).filter(|n| doc.is_element(*n));
    while let Some(n) = current {
        if doc.has_attribute(n, UPGRADE_MARKER) {
            return Some(n);
        }
        current = doc.parent_element(n);
    }
    None
}

impl Host {
    /// Family components whose nearest upgraded ancestor is `el`, light tree
    /// first, then the shadow tree.
    pub fn nested_components(&self, el: NodeId) -> Vec<NodeId> {
        let doc = &self.document;
        let mut nested: Vec<NodeId> = doc
            .descendants(el)
            .into_iter()
            .filter(|n| is_family_element(doc, *n))
            .filter(|n| {
                doc.parent_element(*n)
                    .is_some_and(|parent| closest_upgraded(doc, parent) == Some(el))
            })
            .collect();

        if let Some(shadow) = doc.shadow_root(el) {
            for node in doc.descendants(shadow) {
                if !is_family_element(doc, node) || nested.contains(&node) {
                    continue;
                }
                let Some(parent) = doc.parent_element(node) else {
                    // Top-level shadow children belong to the shadow host.
                    nested.push(node);
                    continue;
                };
                let owner = closest_upgraded(doc, parent).or_else(|| doc.shadow_host(doc.root_node(node)));
                if owner == Some(el) {
                    nested.push(node);
                }
            }
        }
        nested
    }

    /// Push the current `on` of `el` to its nested components.
    pub fn context_update(&mut self, el: NodeId) {
        let nested = self.nested_components(el);
        if nested.is_empty() {
            return;
        }
        let on = self.string_property(el, "on");
        for child in nested {
            if !self.is_component(child) {
                continue;
            }
            self.log(
                el,
                format_args!("Update context of {}", self.document.tag_name(child).unwrap_or_default()),
            );
            self.reset_context(child, on.as_deref());
        }
    }

    /// Recompute the `on` value of `el`: the `context` attribute, then the
    /// inherited context variable, then `fallback`.
    pub fn reset_context(&mut self, el: NodeId, fallback: Option<&str>) {
        let value = self
            .string_property(el, "context")
            .or_else(|| self.context_variable(el))
            .or_else(|| fallback.filter(|f| !f.is_empty()).map(str::to_string));
        let on = self.string_property(el, "on");
        if on == value {
            return;
        }
        tracing::debug!(
            target: targets::CONTEXT,
            element = %self.label(el),
            from = on.as_deref().unwrap_or("null"),
            to = value.as_deref().unwrap_or("null"),
            "resetting context"
        );
        let value = value.map_or(PropertyValue::Undefined, PropertyValue::String);
        self.set_property(el, "on", value).or_warn("could not reset the context");
    }

    /// The inherited `--context` value, falling back to `--theme`.
    pub fn context_variable(&self, el: NodeId) -> Option<String> {
        self.css_variable(el, "context").or_else(|| self.css_variable(el, "theme"))
    }

    /// Computed value of the custom property `--{name}` on `el`.
    pub fn css_variable(&self, el: NodeId, name: &str) -> Option<String> {
        computed_custom_property(&self.document, el, name)
    }

    /// Declare `--{name}: {value}` in the inline style of `el`.
    pub fn set_css_variable(&mut self, el: NodeId, name: &str, value: &str) {
        let mut style = InlineStyle::parse(self.document.get_attribute(el, "style").unwrap_or_default());
        style.set(&format!("--{name}"), value);
        self.set_attribute(el, "style", &style.to_string())
            .or_warn("could not write the inline style");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentClass;

    fn host() -> Host {
        let mut host = Host::new();
        host.define(ComponentClass::new("hl-outer").template("<div><hl-inner id=\"shadow-child\"></hl-inner></div>"))
            .unwrap();
        host.define(ComponentClass::new("hl-inner")).unwrap();
        host
    }

    #[test]
    fn test_context_reaches_light_and_shadow_children() {
        let mut host = host();
        let outer = host.create_element("hl-outer");
        let wrapper = host.create_element("div");
        let inner = host.create_element("hl-inner");
        host.append_child(wrapper, inner).unwrap();
        host.append_child(outer, wrapper).unwrap();
        let body = host.document().body();
        host.append_child(body, outer).unwrap();
        host.run_until_idle();

        host.set_property(outer, "context", "dark").unwrap();
        assert_eq!(host.string_property(outer, "on").as_deref(), Some("dark"));
        assert_eq!(host.string_property(inner, "on").as_deref(), Some("dark"));

        let shadow = host.document().shadow_root(outer).unwrap();
        let shadow_child = host.document().find_by_id(shadow, "shadow-child").unwrap();
        assert_eq!(host.string_property(shadow_child, "on").as_deref(), Some("dark"));
    }

    #[test]
    fn test_explicit_context_wins_over_pushed_value() {
        let mut host = host();
        let outer = host.create_element("hl-outer");
        let inner = host.create_element("hl-inner");
        host.append_child(outer, inner).unwrap();
        let body = host.document().body();
        host.append_child(body, outer).unwrap();
        host.set_property(inner, "context", "light").unwrap();

        host.set_property(outer, "context", "saturated").unwrap();
        assert_eq!(host.string_property(inner, "on").as_deref(), Some("light"));
    }

    #[test]
    fn test_inline_style_sets_on() {
        let mut host = host();
        let inner = host.create_element("hl-inner");
        let body = host.document().body();
        host.append_child(body, inner).unwrap();
        host.set_attribute(inner, "style", "--context: saturated").unwrap();
        assert_eq!(host.string_property(inner, "on").as_deref(), Some("saturated"));
        assert_eq!(host.context_variable(inner).as_deref(), Some("saturated"));
    }

    #[test]
    fn test_context_keeps_author_declarations() {
        let mut host = host();
        let inner = host.create_element("hl-inner");
        let body = host.document().body();
        host.append_child(body, inner).unwrap();
        host.set_attribute(
            inner,
            "style",
            "background-image: url('data:image/png;base64,AAAA'); color: red",
        )
        .unwrap();

        host.set_property(inner, "context", "dark").unwrap();
        assert_eq!(
            host.document().get_attribute(inner, "style"),
            Some("background-image: url('data:image/png;base64,AAAA'); color: red; --context: dark;")
        );
        assert_eq!(host.string_property(inner, "on").as_deref(), Some("dark"));
    }

    #[test]
    fn test_legacy_theme_variable() {
        let mut host = Host::new();
        let div = host.create_element("div");
        host.set_attribute(div, "style", "--theme: dark").unwrap();
        assert_eq!(host.context_variable(div).as_deref(), Some("dark"));
    }

    #[test]
    fn test_grandchildren_are_left_to_their_parent() {
        let mut host = host();
        let outer = host.create_element("hl-outer");
        let middle = host.create_element("hl-inner");
        let leaf = host.create_element("hl-inner");
        host.append_child(middle, leaf).unwrap();
        host.append_child(outer, middle).unwrap();
        let body = host.document().body();
        host.append_child(body, outer).unwrap();

        let nested = host.nested_components(outer);
        assert!(nested.contains(&middle));
        assert!(!nested.contains(&leaf));
    }
}
