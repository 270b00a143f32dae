//! `hl-tab`: the clickable heading of one tab/panel pair.
//!
//! The light DOM heading is copied into the shadow `#tab` element whenever
//! the tab's content changes, so the tab always renders a single heading of
//! the author's level.

use horizon_elements_core::{
    ComponentBehavior, ComponentClass, ComponentType, Host, MutationRecord, NodeId, PropertyDefinition,
    PropertyValue, WatcherKind, WatcherOptions,
};

use super::{VERSION, ensure_id, log, old_id_changed, set_if_changed, warn};

/// Tag of the tab element.
pub const TAB_TAG: &str = "hl-tab";

const TEMPLATE: &str = r#"<span id="tab"></span>"#;
const DEFAULT_HEADING: &str = "h3";

/// The `hl-tab` class.
pub fn tab_class() -> ComponentClass {
    ComponentClass::new(TAB_TAG)
        .version(VERSION)
        .template(TEMPLATE)
        .component_type(ComponentType::Content)
        .properties([
            PropertyDefinition::string("selected")
                .title("Selected tab")
                .attr("aria-selected")
                .default("false")
                .values(["true", "false"])
                .observer("selected_changed"),
            PropertyDefinition::string("controls").title("Connected panel").attr("aria-controls"),
            PropertyDefinition::string("role").default("tab"),
            PropertyDefinition::number("tabindex").default(-1),
            PropertyDefinition::string("variant").title("Variant").values(["wind", "earth"]),
            PropertyDefinition::string("oldId").attr("hl-id").observer("old_id_changed"),
        ])
        .observer("selected_changed", selected_changed)
        .observer("old_id_changed", old_id_changed)
        .behavior(TabBehavior)
}

/// Selected tabs are reachable with the tab key; the others are not.
fn selected_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, new: &PropertyValue) {
    let tabindex = if new.as_str() == Some("true") { 0 } else { -1 };
    if let Err(err) = host.set_property(el, "tabindex", tabindex) {
        warn(host, el, format_args!("could not update tabindex: {err}"));
    }
}

struct TabBehavior;

impl ComponentBehavior for TabBehavior {
    fn connected(&self, host: &mut Host, el: NodeId) {
        host.base_connected(el);
        if host.has_light_dom(el) {
            init(host, el);
        }
        host.observe(
            el,
            WatcherKind::LightDom,
            WatcherOptions::subtree_child_list().with_character_data(),
        );
    }

    fn light_dom_changed(&self, host: &mut Host, el: NodeId, _records: &[MutationRecord]) {
        init(host, el);
    }
}

fn init(host: &mut Host, el: NodeId) {
    set_if_changed(host, el, "role", "tab");
    set_tab_content(host, el);
    ensure_id(host, el);
}

/// The light DOM element carrying the heading, if the content has one.
fn tab_element(host: &Host, el: NodeId) -> Option<NodeId> {
    let doc = host.document();
    if doc.children(el).is_empty() {
        warn(host, el, "No tab content provided");
        return None;
    }
    let first = doc.first_element_child(el)?;
    let tag = doc.tag_name(first).unwrap_or_default().to_ascii_lowercase();
    if is_heading(&tag) {
        Some(first)
    } else {
        warn(host, el, "Tab heading should contain at least 1 heading tag for correct semantics.");
        None
    }
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Copy the label into the shadow `#tab` element as a heading.
fn set_tab_content(host: &mut Host, el: NodeId) {
    let heading = tab_element(host, el);
    let source = heading.unwrap_or(el);
    let label = collapse_whitespace(&host.document().text_content(source));
    if label.is_empty() {
        warn(host, el, "There does not appear to be any content in the tab region.");
        return;
    }

    let semantics = heading
        .and_then(|h| host.document().tag_name(h))
        .map_or_else(|| DEFAULT_HEADING.to_string(), str::to_ascii_lowercase);

    let Some(item) = host
        .document()
        .shadow_root(el)
        .and_then(|shadow| host.document().find_by_id(shadow, "tab"))
    else {
        return;
    };
    host.clear_children(item);
    let shadow_heading = host.create_element(&semantics);
    let result = host
        .set_text_content(shadow_heading, &label)
        .and_then(|()| host.append_child(item, shadow_heading));
    match result {
        Ok(()) => log(host, el, format_args!("Tab label: {label}")),
        Err(err) => warn(host, el, format_args!("could not render the tab label: {err}")),
    }
}
