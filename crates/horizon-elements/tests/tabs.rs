//! Integration tests for the tab set selection state machine.

use std::sync::Arc;

use horizon_elements::tabs::{HIDDEN_TAB_EVENT, SHOWN_TAB_EVENT, Tabs};
use horizon_elements::{ElementsConfig, EventDetail, Host, Key, KeyboardEvent, NodeId, define_all};
use parking_lot::Mutex;

type EventLog = Arc<Mutex<Vec<(String, NodeId)>>>;

struct Fixture {
    host: Host,
    tabs: Tabs,
    tab_nodes: Vec<NodeId>,
    panels: Vec<NodeId>,
    events: EventLog,
}

impl Fixture {
    fn el(&self) -> NodeId {
        self.tabs.element()
    }

    fn selected(&self) -> Option<usize> {
        self.tabs.selected_index(&self.host)
    }

    fn take_events(&self) -> Vec<(String, NodeId)> {
        std::mem::take(&mut *self.events.lock())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("horizon_elements=debug,horizon_elements_core=warn")
        .try_init();
}

/// Build a tab set with `count` tab/panel pairs. Tabs get ids `panel-1`,
/// `panel-2`, ...; `attrs` are set on the tab set before it is connected.
fn build(mut host: Host, count: usize, attrs: &[(&str, &str)]) -> Fixture {
    init_logging();
    define_all(&mut host).unwrap();

    let set = host.create_element("hl-tabs");
    for (name, value) in attrs {
        host.set_attribute(set, name, value).unwrap();
    }
    let mut tab_nodes = Vec::new();
    let mut panels = Vec::new();
    for i in 1..=count {
        let tab = host.create_element("hl-tab");
        host.set_attribute(tab, "id", &format!("panel-{i}")).unwrap();
        host.set_attribute(tab, "slot", "tab").unwrap();
        let heading = host.create_element("h2");
        host.set_text_content(heading, &format!("Tab {i}")).unwrap();
        host.append_child(tab, heading).unwrap();

        let panel = host.create_element("hl-tab-panel");
        host.set_attribute(panel, "slot", "panel").unwrap();
        host.set_text_content(panel, &format!("Content {i}")).unwrap();

        host.append_child(set, tab).unwrap();
        host.append_child(set, panel).unwrap();
        tab_nodes.push(tab);
        panels.push(panel);
    }

    let events: EventLog = Arc::default();
    let sink = events.clone();
    host.events().connect(move |event| {
        if let EventDetail::Tab(tab) = event.detail {
            sink.lock().push((event.name.clone(), tab));
        }
    });

    let body = host.document().body();
    host.append_child(body, set).unwrap();
    host.run_until_idle();

    let tabs = Tabs::from_element(&host, set).unwrap();
    Fixture {
        host,
        tabs,
        tab_nodes,
        panels,
        events,
    }
}

fn assert_selection(fx: &Fixture, index: usize) {
    let doc = fx.host.document();
    let selected: Vec<usize> = fx
        .tab_nodes
        .iter()
        .enumerate()
        .filter(|(_, tab)| doc.get_attribute(**tab, "aria-selected") == Some("true"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(selected, vec![index]);

    for (i, panel) in fx.panels.iter().enumerate() {
        assert_eq!(doc.has_attribute(*panel, "hidden"), i != index, "panel {i}");
    }
    assert_eq!(fx.selected(), Some(index));
    assert_eq!(doc.get_attribute(fx.el(), "selected-index"), Some(index.to_string().as_str()));
}

#[test]
fn test_initial_selection_and_links() {
    let fx = build(Host::new(), 3, &[]);
    assert_selection(&fx, 0);

    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(fx.el(), "role"), Some("tablist"));
    assert_eq!(doc.get_attribute(fx.el(), "aria-orientation"), Some("horizontal"));
    for (tab, panel) in fx.tab_nodes.iter().zip(&fx.panels) {
        let panel_id = doc.id(*panel);
        assert!(!panel_id.is_empty());
        assert_eq!(doc.get_attribute(*tab, "aria-controls"), Some(panel_id));
        assert_eq!(doc.get_attribute(*panel, "aria-labelledby"), Some(doc.id(*tab)));
        assert_eq!(doc.get_attribute(*tab, "variant"), Some("wind"));
    }

    assert_eq!(fx.take_events(), vec![(SHOWN_TAB_EVENT.to_string(), fx.tab_nodes[0])]);
}

#[test]
fn test_every_selection_keeps_one_pair_visible() {
    let mut fx = build(Host::new(), 4, &[]);
    for index in [2, 0, 3, 1, 1] {
        assert_eq!(fx.tabs.select_index(&mut fx.host, index), Some(fx.tab_nodes[index]));
        assert_selection(&fx, index);
    }
    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(fx.tab_nodes[1], "tabindex"), Some("0"));
    assert_eq!(doc.get_attribute(fx.tab_nodes[0], "tabindex"), Some("-1"));
}

#[test]
fn test_reselecting_emits_nothing() {
    let mut fx = build(Host::new(), 3, &[]);
    fx.take_events();

    fx.tabs.select_index(&mut fx.host, 1);
    assert_eq!(
        fx.take_events(),
        vec![
            (HIDDEN_TAB_EVENT.to_string(), fx.tab_nodes[0]),
            (SHOWN_TAB_EVENT.to_string(), fx.tab_nodes[1]),
        ]
    );

    fx.tabs.select_index(&mut fx.host, 1);
    fx.host.run_until_idle();
    assert!(fx.take_events().is_empty());
    assert_selection(&fx, 1);
}

#[test]
fn test_keyboard_wraps_and_focuses() {
    let mut fx = build(Host::new(), 3, &[]);

    let event = fx.host.key_down(fx.tab_nodes[0], KeyboardEvent::new(Key::Left));
    assert!(event.is_default_prevented());
    assert_selection(&fx, 2);
    assert_eq!(fx.host.focused(), Some(fx.tab_nodes[2]));

    fx.host.key_down(fx.tab_nodes[2], KeyboardEvent::new(Key::Right));
    assert_selection(&fx, 0);
    assert_eq!(fx.host.focused(), Some(fx.tab_nodes[0]));

    fx.host.key_down(fx.tab_nodes[0], KeyboardEvent::new(Key::End));
    assert_selection(&fx, 2);
    fx.host.key_down(fx.tab_nodes[2], KeyboardEvent::new(Key::Home));
    assert_selection(&fx, 0);
    fx.host.key_down(fx.tab_nodes[0], KeyboardEvent::new(Key::Down));
    assert_selection(&fx, 1);
    fx.host.key_down(fx.tab_nodes[1], KeyboardEvent::new(Key::Up));
    assert_selection(&fx, 0);
}

#[test]
fn test_alt_chords_and_other_keys_are_ignored() {
    let mut fx = build(Host::new(), 3, &[]);

    let event = fx.host.key_down(fx.tab_nodes[0], KeyboardEvent::new(Key::Right).with_alt());
    assert!(!event.is_default_prevented());
    assert_selection(&fx, 0);

    let event = fx.host.key_down(fx.tab_nodes[0], KeyboardEvent::new(Key::from_key_code(13)));
    assert!(!event.is_default_prevented());
    assert_selection(&fx, 0);

    // Keys pressed inside a panel are not tab navigation.
    let event = fx.host.key_down(fx.panels[0], KeyboardEvent::new(Key::Right));
    assert!(!event.is_default_prevented());
    assert_selection(&fx, 0);
}

#[test]
fn test_click_selects_without_focus() {
    let mut fx = build(Host::new(), 3, &[]);

    fx.host.click(fx.tab_nodes[2]);
    assert_selection(&fx, 2);
    assert_eq!(fx.host.focused(), None);

    let heading = fx.host.document().first_element_child(fx.tab_nodes[1]).unwrap();
    fx.host.click(heading);
    assert_selection(&fx, 1);

    fx.host.click(fx.panels[0]);
    assert_selection(&fx, 1);
}

#[test]
fn test_out_of_range_index_keeps_selection() {
    let mut fx = build(Host::new(), 3, &[]);
    fx.tabs.select_index(&mut fx.host, 1);
    fx.take_events();

    assert_eq!(fx.tabs.select_index(&mut fx.host, 7), None);
    assert_selection(&fx, 1);
    assert!(fx.take_events().is_empty());
}

#[test]
fn test_tab_without_panel_keeps_selection() {
    let mut fx = build(Host::new(), 2, &[]);
    let orphan = fx.host.create_element("hl-tab");
    fx.host.set_text_content(orphan, "Orphan").unwrap();
    fx.host.append_child(fx.el(), orphan).unwrap();
    fx.host.run_until_idle();
    assert_selection(&fx, 0);
    fx.take_events();

    assert_eq!(fx.tabs.select_index(&mut fx.host, 2), None);
    assert_selection(&fx, 0);
    assert_eq!(
        fx.host.document().get_attribute(orphan, "aria-selected"),
        Some("false")
    );
    assert!(fx.take_events().is_empty());
}

#[test]
fn test_moved_panel_unpairs_its_tab() {
    let mut fx = build(Host::new(), 2, &[]);
    let (first_tab, second_tab) = (fx.tab_nodes[0], fx.tab_nodes[1]);
    let (first_panel, second_panel) = (fx.panels[0], fx.panels[1]);
    let el = fx.el();
    fx.host.append_child(el, first_panel).unwrap();
    fx.host.run_until_idle();

    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(first_tab, "aria-controls"), None);
    assert_eq!(doc.get_attribute(first_panel, "aria-labelledby"), None);
    assert_eq!(doc.get_attribute(second_tab, "aria-controls"), Some(doc.id(second_panel)));
    assert!(doc.has_attribute(first_panel, "hidden"));
    fx.take_events();

    assert_eq!(fx.tabs.select_index(&mut fx.host, 0), None);
    assert!(fx.host.document().has_attribute(first_panel, "hidden"));
    assert!(fx.take_events().is_empty());

    assert_eq!(fx.tabs.select_index(&mut fx.host, 1), Some(second_tab));
    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(first_tab, "aria-selected"), Some("false"));
    assert!(!doc.has_attribute(second_panel, "hidden"));
    assert!(doc.has_attribute(first_panel, "hidden"));
}

#[test]
fn test_select_by_element() {
    let mut fx = build(Host::new(), 3, &[]);
    assert_eq!(fx.tabs.select(&mut fx.host, fx.tab_nodes[2]), Some(fx.tab_nodes[2]));
    assert_selection(&fx, 2);

    assert_eq!(fx.tabs.select(&mut fx.host, fx.panels[0]), None);
    assert_selection(&fx, 2);
}

#[test]
fn test_selected_index_attribute_drives_selection() {
    let mut fx = build(Host::new(), 3, &[]);
    fx.host.set_attribute(fx.el(), "selected-index", "2").unwrap();
    assert_eq!(fx.selected(), Some(0));
    fx.host.run_until_idle();
    assert_selection(&fx, 2);
}

#[test]
fn test_initial_selected_index_attribute() {
    let fx = build(Host::new(), 3, &[("selected-index", "1")]);
    assert_selection(&fx, 1);
    assert_eq!(fx.take_events(), vec![(SHOWN_TAB_EVENT.to_string(), fx.tab_nodes[1])]);
}

#[test]
fn test_requests_for_disconnected_sets_are_dropped() {
    let mut fx = build(Host::new(), 3, &[]);
    fx.take_events();
    let el = fx.el();
    fx.host.set_attribute(el, "selected-index", "2").unwrap();
    fx.host.remove(el).unwrap();
    fx.host.run_until_idle();
    assert_eq!(fx.selected(), Some(0));
    assert!(fx.take_events().is_empty());
}

#[test]
fn test_selection_is_written_to_the_url() {
    let mut fx = build(Host::new(), 3, &[("id", "demo"), ("tab-history", "")]);
    assert_eq!(fx.host.history().len(), 1);

    fx.host.click(fx.tab_nodes[1]);
    assert_selection(&fx, 1);
    assert_eq!(fx.host.history().len(), 2);
    assert_eq!(fx.host.search_params().get("demo"), Some("panel-2"));
    assert!(fx.host.location().query().unwrap_or_default().contains("demo=panel-2"));

    // Reselecting does not add an entry.
    fx.host.click(fx.tab_nodes[1]);
    assert_eq!(fx.host.history().len(), 2);
}

#[test]
fn test_url_selects_on_load_without_history_write() {
    let mut host = Host::new();
    host.navigate("https://example.com/page?demo=panel-2").unwrap();
    let fx = build(host, 3, &[("id", "demo"), ("tab-history", "")]);

    assert_selection(&fx, 1);
    assert_eq!(fx.host.history().len(), 1);
    assert_eq!(fx.host.location().as_str(), "https://example.com/page?demo=panel-2");
    assert_eq!(fx.host.focused(), None);
}

#[test]
fn test_deprecated_url_key_is_read() {
    let mut host = Host::new();
    host.navigate("https://example.com/?hl-demo=panel-3").unwrap();
    let fx = build(host, 3, &[("id", "demo")]);
    assert_selection(&fx, 2);

    let mut host = Host::new();
    host.navigate("https://example.com/?hl-demo=panel-3&demo=panel-2").unwrap();
    let fx = build(host, 3, &[("id", "demo")]);
    assert_selection(&fx, 1);
}

#[test]
fn test_back_and_forward_follow_the_url() {
    let mut fx = build(Host::new(), 3, &[("id", "demo"), ("tab-history", "")]);
    fx.host.click(fx.tab_nodes[1]);
    fx.host.click(fx.tab_nodes[2]);
    assert_eq!(fx.host.history().len(), 3);

    assert!(fx.host.back());
    assert_selection(&fx, 1);
    assert_eq!(fx.host.history().len(), 3);

    assert!(fx.host.forward());
    assert_selection(&fx, 2);

    // The first entry has no key for this set; the selection stays.
    fx.host.back();
    fx.host.back();
    assert_selection(&fx, 1);
    assert_eq!(fx.host.history().len(), 3);
}

#[test]
fn test_tab_history_toggles_popstate_listener() {
    let mut fx = build(Host::new(), 2, &[("id", "demo")]);
    assert!(!fx.host.has_popstate_listener(fx.el()));

    fx.host.set_property(fx.el(), "tabHistory", true).unwrap();
    assert!(fx.host.has_popstate_listener(fx.el()));
    fx.host.set_property(fx.el(), "tabHistory", false).unwrap();
    assert!(!fx.host.has_popstate_listener(fx.el()));

    fx.host.set_attribute(fx.el(), "hl-tab-history", "").unwrap();
    assert!(fx.host.document().has_attribute(fx.el(), "tab-history"));
    assert!(fx.host.has_popstate_listener(fx.el()));

    fx.host.remove(fx.el()).unwrap();
    assert!(!fx.host.has_popstate_listener(fx.el()));
}

#[test]
fn test_history_can_be_disabled() {
    let host = Host::with_config(ElementsConfig::default().with_history(false));
    let mut fx = build(host, 3, &[("id", "demo"), ("tab-history", "")]);
    fx.host.click(fx.tab_nodes[2]);
    assert_selection(&fx, 2);
    assert_eq!(fx.host.history().len(), 1);
}

#[test]
fn test_vertical_cascades_and_sets_orientation() {
    let mut fx = build(Host::new(), 2, &[]);
    fx.host.set_property(fx.el(), "vertical", true).unwrap();

    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(fx.el(), "aria-orientation"), Some("vertical"));
    for node in fx.tab_nodes.iter().chain(&fx.panels) {
        assert!(doc.has_attribute(*node, "vertical"));
    }

    fx.host.set_attribute(fx.el(), "hl-variant", "earth").unwrap();
    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(fx.el(), "variant"), Some("earth"));
    assert_eq!(doc.get_attribute(fx.tab_nodes[0], "variant"), Some("earth"));
}

#[test]
fn test_added_pairs_are_linked() {
    let mut fx = build(Host::new(), 2, &[]);
    let tab = fx.host.create_element("hl-tab");
    fx.host.set_text_content(tab, "Late").unwrap();
    let panel = fx.host.create_element("hl-tab-panel");
    fx.host.set_text_content(panel, "Late content").unwrap();
    fx.host.append_child(fx.el(), tab).unwrap();
    fx.host.append_child(fx.el(), panel).unwrap();
    fx.host.run_until_idle();

    let doc = fx.host.document();
    assert_eq!(doc.get_attribute(tab, "aria-controls"), Some(doc.id(panel)));
    assert!(doc.has_attribute(panel, "hidden"));
    assert_eq!(doc.get_attribute(tab, "variant"), Some("wind"));

    fx.host.click(tab);
    assert_eq!(fx.selected(), Some(2));
    assert!(!fx.host.document().has_attribute(panel, "hidden"));
}

#[test]
fn test_reset_clears_the_selection() {
    let mut fx = build(Host::new(), 2, &[]);
    fx.tabs.reset(&mut fx.host);
    assert_eq!(fx.tabs.selected(&fx.host), None);
    let doc = fx.host.document();
    for (tab, panel) in fx.tab_nodes.iter().zip(&fx.panels) {
        assert_eq!(doc.get_attribute(*tab, "aria-selected"), Some("false"));
        assert!(doc.has_attribute(*panel, "hidden"));
    }

    fx.tabs.select_index(&mut fx.host, 1);
    assert_selection(&fx, 1);
}

#[test]
fn test_defining_later_upgrades_existing_markup() {
    init_logging();
    let mut host = Host::new();
    let set = host.create_element("hl-tabs");
    let tab = host.create_element("hl-tab");
    host.set_text_content(tab, "Only").unwrap();
    let panel = host.create_element("hl-tab-panel");
    host.set_text_content(panel, "Only content").unwrap();
    host.append_child(set, tab).unwrap();
    host.append_child(set, panel).unwrap();
    let body = host.document().body();
    host.append_child(body, set).unwrap();
    host.run_until_idle();
    assert!(!host.is_component(set));

    define_all(&mut host).unwrap();
    host.run_until_idle();
    let tabs = Tabs::from_element(&host, set).unwrap();
    assert_eq!(tabs.selected(&host), Some(tab));
    assert_eq!(host.document().get_attribute(tab, "aria-selected"), Some("true"));
    assert!(!host.document().has_attribute(panel, "hidden"));
}
