//! `hl-tab-panel`: the content shown for the tab before it.

use horizon_elements_core::{
    ComponentBehavior, ComponentClass, ComponentType, Host, MutationRecord, NodeId, PropertyDefinition,
    WatcherKind, WatcherOptions,
};

use super::{VERSION, ensure_id, old_id_changed, set_if_changed, warn};

/// Tag of the panel element.
pub const PANEL_TAG: &str = "hl-tab-panel";

const TEMPLATE: &str = r#"<div tabindex="-1" role="tabpanel"><div class="container"><slot></slot></div></div>"#;

/// The `hl-tab-panel` class.
pub fn panel_class() -> ComponentClass {
    ComponentClass::new(PANEL_TAG)
        .version(VERSION)
        .template(TEMPLATE)
        .component_type(ComponentType::Container)
        .properties([
            PropertyDefinition::boolean("selected")
                .title("Selected tab")
                .attr("aria-selected")
                .default(false),
            PropertyDefinition::boolean("hidden").title("Visibility").default(false),
            PropertyDefinition::string("role").default("tabpanel"),
            PropertyDefinition::number("tabindex").default(0),
            PropertyDefinition::string("labelledby").attr("aria-labelledby"),
            PropertyDefinition::string("variant").title("Variant").values(["wind", "earth"]),
            PropertyDefinition::string("oldId").attr("hl-id").observer("old_id_changed"),
        ])
        .observer("old_id_changed", old_id_changed)
        .behavior(PanelBehavior)
}

struct PanelBehavior;

impl ComponentBehavior for PanelBehavior {
    fn connected(&self, host: &mut Host, el: NodeId) {
        host.base_connected(el);
        if host.has_light_dom(el) {
            init(host, el);
        }
        host.observe(el, WatcherKind::LightDom, WatcherOptions::subtree_child_list());
    }

    fn light_dom_changed(&self, host: &mut Host, el: NodeId, _records: &[MutationRecord]) {
        init(host, el);
    }
}

fn init(host: &mut Host, el: NodeId) {
    ensure_id(host, el);
    set_if_changed(host, el, "role", "tabpanel");

    let doc = host.document();
    let owner_selected = doc
        .previous_element_sibling(el)
        .map(|prev| doc.get_attribute(prev, "aria-selected") == Some("true"));
    if owner_selected == Some(false)
        && let Err(err) = host.set_property(el, "hidden", true)
    {
        warn(host, el, format_args!("could not hide the panel: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabs::tab_class;

    fn setup() -> (Host, NodeId) {
        let mut host = Host::new();
        host.define(tab_class()).unwrap();
        host.define(panel_class()).unwrap();
        let container = host.create_element("div");
        let body = host.document().body();
        host.append_child(body, container).unwrap();
        (host, container)
    }

    fn pair(host: &mut Host, container: NodeId, selected: &str) -> (NodeId, NodeId) {
        let tab = host.create_element("hl-tab");
        host.set_text_content(tab, "Tab").unwrap();
        host.set_attribute(tab, "aria-selected", selected).unwrap();
        let panel = host.create_element(PANEL_TAG);
        host.set_text_content(panel, "Panel").unwrap();
        host.append_child(container, tab).unwrap();
        host.append_child(container, panel).unwrap();
        host.run_until_idle();
        (tab, panel)
    }

    #[test]
    fn test_panel_after_unselected_tab_is_hidden() {
        let (mut host, container) = setup();
        let (_, panel) = pair(&mut host, container, "false");
        assert!(host.document().has_attribute(panel, "hidden"));
        assert_eq!(host.document().get_attribute(panel, "role"), Some("tabpanel"));
        assert_eq!(host.document().get_attribute(panel, "tabindex"), Some("0"));
        assert!(host.document().id(panel).starts_with("hl-"));
    }

    #[test]
    fn test_panel_after_selected_tab_stays_visible() {
        let (mut host, container) = setup();
        let (_, panel) = pair(&mut host, container, "true");
        assert!(!host.document().has_attribute(panel, "hidden"));
    }

    #[test]
    fn test_existing_id_is_kept() {
        let (mut host, container) = setup();
        let panel = host.create_element(PANEL_TAG);
        host.set_attribute(panel, "id", "details").unwrap();
        host.set_text_content(panel, "Panel").unwrap();
        host.append_child(container, panel).unwrap();
        assert_eq!(host.document().id(panel), "details");
        assert!(!host.document().has_attribute(panel, "hidden"));
    }
}
