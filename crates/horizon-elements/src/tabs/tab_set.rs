//! `hl-tabs` and its selection state machine.
//!
//! The selection of a tab set is held in a [`TabSet`] attached to the
//! element. [`Tabs::select_index`] is the only transition; every other input
//! is translated to an index first:
//!
//! | input                      | cause                                 |
//! |----------------------------|---------------------------------------|
//! | `selected-index` attribute | [`SelectionCause::Programmatic`]      |
//! | click on a tab             | [`SelectionCause::Click`]             |
//! | arrow, Home and End keys   | [`SelectionCause::Keyboard`]          |
//! | query string on load       | [`SelectionCause::Url`]               |
//! | back/forward navigation    | [`SelectionCause::HistoryNavigation`] |
//!
//! Inputs are queued until `hl-tab` and `hl-tab-panel` are defined and are
//! dropped if the tab set was disconnected in the meantime.

use horizon_elements_core::{
    ComponentBehavior, ComponentClass, ComponentType, EventDetail, Host, Key, MutationRecord, NodeId,
    PropertyDefinition, PropertyValue, SlotDefinition, UiEvent, UiEventKind, WatcherKind, WatcherOptions,
};
use static_assertions::assert_impl_all;

use super::panel::PANEL_TAG;
use super::tab::TAB_TAG;
use super::{VERSION, children_with_tag, ensure_id, log, old_id_changed, set_if_changed, warn};

/// Tag of the tab set element.
pub const TABS_TAG: &str = "hl-tabs";
/// Emitted with the previously selected tab when the selection moves away.
pub const HIDDEN_TAB_EVENT: &str = "hl-tabs:hidden-tab";
/// Emitted with the newly selected tab.
pub const SHOWN_TAB_EVENT: &str = "hl-tabs:shown-tab";

/// Deprecated prefix of the URL key, read but never written.
const DEPRECATED_URL_PREFIX: &str = "hl-";

const TEMPLATE: &str = concat!(
    r#"<div class="tabs"><div class="tabs-prefix"></div><slot name="tab"></slot>"#,
    r#"<div class="tabs-suffix"></div></div>"#,
    r#"<div class="panels"><slot name="panel"></slot></div>"#,
);

/// What triggered a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionCause {
    /// API call or a `selected-index` write.
    Programmatic,
    /// Click on a tab.
    Click,
    /// Arrow, Home or End key on a tab.
    Keyboard,
    /// The query string of the page when the tab set initialized.
    Url,
    /// Back/forward navigation.
    HistoryNavigation,
}

impl SelectionCause {
    /// Whether the new tab takes focus.
    pub fn requests_focus(self) -> bool {
        matches!(self, Self::Keyboard)
    }

    /// Whether the transition may push a history entry. Transitions read
    /// from the URL never write it back.
    pub fn writes_history(self) -> bool {
        !matches!(self, Self::Url | Self::HistoryNavigation)
    }
}

/// Selection state of one tab set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabSet {
    selected: Option<NodeId>,
    linked: bool,
}

impl TabSet {
    /// The selected tab.
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Whether tabs and panels are linked for the current children.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Index reached by pressing `key` among `count` tabs while `current`
    /// is selected. Previous/next wrap around; keys without a meaning give
    /// `None`.
    pub fn navigate(count: usize, current: Option<usize>, key: Key) -> Option<usize> {
        if count == 0 {
            return None;
        }
        match key {
            Key::Left | Key::Up => Some(current.map_or(count - 1, |i| (i + count - 1) % count)),
            Key::Right | Key::Down => Some(current.map_or(0, |i| (i + 1) % count)),
            Key::Home => Some(0),
            Key::End => Some(count - 1),
            Key::Other(_) => None,
        }
    }
}

assert_impl_all!(TabSet: Send, Sync);

/// The `hl-tabs` class.
pub fn tabs_class() -> ComponentClass {
    let cascade = format!("{TAB_TAG}, {PANEL_TAG}");
    ComponentClass::new(TABS_TAG)
        .version(VERSION)
        .template(TEMPLATE)
        .component_type(ComponentType::Combo)
        .properties([
            PropertyDefinition::boolean("vertical")
                .title("Vertical orientation")
                .default(false)
                .cascade(&cascade)
                .observer("vertical_changed"),
            PropertyDefinition::string("orientation")
                .title("Orientation")
                .attr("aria-orientation")
                .default("horizontal")
                .values(["horizontal", "vertical"]),
            // No default: the first selection comes from initialization.
            PropertyDefinition::number("selectedIndex")
                .title("Index of the selected tab")
                .observer("selected_index_changed"),
            PropertyDefinition::string("tabAlign").title("Tab alignment").values(["center"]),
            PropertyDefinition::string("controls").attr("aria-controls"),
            PropertyDefinition::string("variant")
                .title("Variant")
                .values(["wind", "earth"])
                .default("wind")
                .cascade(&cascade),
            PropertyDefinition::boolean("tabHistory")
                .title("Tab History")
                .default(false)
                .observer("tab_history_changed"),
            PropertyDefinition::string("role").default("tablist"),
            PropertyDefinition::string("oldVariant").attr("hl-variant").alias("variant"),
            PropertyDefinition::boolean("oldTabHistory")
                .attr("hl-tab-history")
                .alias("tabHistory"),
            PropertyDefinition::string("oldId").attr("hl-id").observer("old_id_changed"),
        ])
        .observer("vertical_changed", vertical_changed)
        .observer("selected_index_changed", selected_index_changed)
        .observer("tab_history_changed", tab_history_changed)
        .observer("old_id_changed", old_id_changed)
        .slot(SlotDefinition::named("tab"))
        .slot(SlotDefinition::named("panel"))
        .behavior(TabsBehavior)
}

fn vertical_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, new: &PropertyValue) {
    let orientation = if new.is_truthy() { "vertical" } else { "horizontal" };
    set_if_changed(host, el, "orientation", orientation);
}

fn selected_index_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, new: &PropertyValue) {
    let tabs = Tabs(el);
    match new {
        PropertyValue::Undefined | PropertyValue::Null => {}
        PropertyValue::Number(n) if n.is_finite() && *n >= 0.0 => {
            let index = n.trunc() as usize;
            if tabs.selected_index(host) != Some(index) {
                tabs.request_index(host, index, SelectionCause::Programmatic);
            }
        }
        other => warn(host, el, format_args!("tab {} does not exist", other.to_attribute_value())),
    }
}

fn tab_history_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, new: &PropertyValue) {
    if new.is_truthy() {
        host.add_popstate_listener(el);
    } else {
        host.remove_popstate_listener(el);
    }
}

struct TabsBehavior;

impl ComponentBehavior for TabsBehavior {
    fn constructed(&self, host: &mut Host, el: NodeId) {
        host.set_state(el, TabSet::default());
    }

    fn connected(&self, host: &mut Host, el: NodeId) {
        host.base_connected(el);
        if host.property_or_undefined(el, "tabHistory").is_truthy() {
            host.add_popstate_listener(el);
        }
        host.when_defined([TAB_TAG, PANEL_TAG], move |host| {
            if !host.is_connected_component(el) {
                return;
            }
            if host.has_light_dom(el) {
                Tabs(el).init(host);
            }
            host.observe(el, WatcherKind::LightDom, WatcherOptions::subtree_child_list());
        });
    }

    fn disconnected(&self, host: &mut Host, el: NodeId) {
        host.base_disconnected(el);
        host.remove_popstate_listener(el);
    }

    fn light_dom_changed(&self, host: &mut Host, el: NodeId, records: &[MutationRecord]) {
        log(host, el, format_args!("{} light DOM change(s)", records.len()));
        host.when_defined([TAB_TAG, PANEL_TAG], move |host| {
            if host.is_connected_component(el) {
                Tabs(el).init(host);
            }
        });
    }

    fn handle_event(&self, host: &mut Host, el: NodeId, event: &mut UiEvent) {
        let tabs = Tabs(el);
        let target = event.target_for(host.document(), el);
        let all = tabs.tabs(host);

        match *event.kind() {
            UiEventKind::Click => {
                let clicked = all
                    .iter()
                    .position(|tab| host.document().is_inclusive_ancestor(*tab, target));
                if let Some(index) = clicked {
                    tabs.request_index(host, index, SelectionCause::Click);
                }
            }
            UiEventKind::KeyDown(press) => {
                if !all.contains(&target) || press.alt {
                    return;
                }
                let Some(index) = TabSet::navigate(all.len(), tabs.selected_index(host), press.key) else {
                    return;
                };
                event.prevent_default();
                tabs.request_index(host, index, SelectionCause::Keyboard);
            }
        }
    }

    fn history_navigated(&self, host: &mut Host, el: NodeId) {
        let tabs = Tabs(el);
        if let Some(index) = tabs.index_from_url(host) {
            tabs.request_index(host, index, SelectionCause::HistoryNavigation);
        }
    }
}

/// Handle to an `hl-tabs` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tabs(NodeId);

assert_impl_all!(Tabs: Send, Sync, Copy);

impl Tabs {
    /// The handle for `el` if it is an `hl-tabs` element.
    pub fn from_element(host: &Host, el: NodeId) -> Option<Self> {
        (host.document().tag_name(el) == Some(TABS_TAG)).then_some(Self(el))
    }

    /// The tab set element.
    pub fn element(self) -> NodeId {
        self.0
    }

    /// Child tabs, in document order.
    pub fn tabs(self, host: &Host) -> Vec<NodeId> {
        children_with_tag(host, self.0, TAB_TAG)
    }

    /// Child panels, in document order.
    pub fn panels(self, host: &Host) -> Vec<NodeId> {
        children_with_tag(host, self.0, PANEL_TAG)
    }

    /// The selected tab.
    pub fn selected(self, host: &Host) -> Option<NodeId> {
        host.state::<TabSet>(self.0).and_then(TabSet::selected)
    }

    /// Index of the selected tab.
    pub fn selected_index(self, host: &Host) -> Option<usize> {
        let selected = self.selected(host)?;
        self.tabs(host).iter().position(|tab| *tab == selected)
    }

    /// The panel `tab` controls.
    pub fn panel_for_tab(self, host: &Host, tab: NodeId) -> Option<NodeId> {
        let controls = host.document().get_attribute(tab, "aria-controls")?;
        host.document().find_by_id(self.0, controls)
    }

    /// Select the tab at `index`.
    ///
    /// An index without a tab is a warning and leaves the selection as it
    /// was, as does a tab without a panel. Selecting the selected tab again
    /// emits nothing.
    pub fn select_index(self, host: &mut Host, index: usize) -> Option<NodeId> {
        self.link_panels(host);
        self.transition(host, index, SelectionCause::Programmatic)
    }

    /// Select `tab`, which must be one of this set's `hl-tab` children.
    pub fn select(self, host: &mut Host, tab: NodeId) -> Option<NodeId> {
        if host.document().tag_name(tab) != Some(TAB_TAG) {
            warn(host, self.0, format_args!("the tab must be a {TAB_TAG} element"));
            return None;
        }
        let doc = host.document();
        let id = doc.id(tab);
        let index = self
            .tabs(host)
            .iter()
            .position(|candidate| *candidate == tab || (!id.is_empty() && doc.id(*candidate) == id));
        match index {
            Some(index) => self.select_index(host, index),
            None => {
                warn(host, self.0, format_args!("{} is not a tab of this set", host.label(tab)));
                None
            }
        }
    }

    /// Deselect every tab and hide every panel.
    pub fn reset(self, host: &mut Host) {
        for tab in self.tabs(host) {
            set_if_changed(host, tab, "selected", "false");
        }
        for panel in self.panels(host) {
            set_hidden(host, panel, true);
        }
        if let Some(state) = host.state_mut::<TabSet>(self.0) {
            state.selected = None;
        }
    }

    /// Queue a selection until the tab classes are defined.
    fn request_index(self, host: &mut Host, index: usize, cause: SelectionCause) {
        let el = self.0;
        host.when_defined([TAB_TAG, PANEL_TAG], move |host| {
            if !host.is_connected_component(el) {
                return;
            }
            let tabs = Tabs(el);
            tabs.link_panels(host);
            tabs.transition(host, index, cause);
        });
    }

    /// Relink the children and pick the initial selection: the URL first,
    /// then `selected-index`, then the current selection, then the first
    /// tab.
    fn init(self, host: &mut Host) {
        let el = self.0;
        if let Some(state) = host.state_mut::<TabSet>(el) {
            state.linked = false;
        }
        self.link_panels(host);
        set_if_changed(host, el, "role", "tablist");

        let (index, cause) = self
            .index_from_url(host)
            .map(|index| (index, SelectionCause::Url))
            .or_else(|| requested_index(host, el).map(|index| (index, SelectionCause::Programmatic)))
            .or_else(|| self.selected_index(host).map(|index| (index, SelectionCause::Programmatic)))
            .unwrap_or((0, SelectionCause::Programmatic));
        self.transition(host, index, cause);

        if self.selected_index(host).is_none() && index != 0 {
            self.transition(host, 0, SelectionCause::Programmatic);
        }
        if host.config().debug_log {
            log(host, el, format_args!("initialized\n{}", host.debug_tree(el)));
        }
    }

    /// Point every tab at the panel after it and back.
    fn link_panels(self, host: &mut Host) {
        let el = self.0;
        if host.state::<TabSet>(el).is_some_and(TabSet::is_linked) {
            return;
        }
        for tab in self.tabs(host) {
            let panel = host
                .document()
                .next_element_sibling(tab)
                .filter(|next| host.document().tag_name(*next) == Some(PANEL_TAG));
            let Some(panel) = panel else {
                warn(host, el, format_args!("{} is not a sibling of a <{PANEL_TAG}>", host.label(tab)));
                unlink(host, tab, "controls");
                continue;
            };
            ensure_id(host, tab);
            ensure_id(host, panel);
            let tab_id = host.document().id(tab).to_string();
            let panel_id = host.document().id(panel).to_string();
            set_if_changed(host, tab, "controls", &panel_id);
            set_if_changed(host, panel, "labelledby", &tab_id);
        }
        for panel in self.panels(host) {
            let owner = host.document().previous_element_sibling(panel);
            if !owner.is_some_and(|prev| host.document().tag_name(prev) == Some(TAB_TAG)) {
                unlink(host, panel, "labelledby");
            }
        }
        if let Some(state) = host.state_mut::<TabSet>(el) {
            state.linked = true;
        }
        log(host, el, "Tabs linked to panels");
    }

    /// The single selection transition.
    fn transition(self, host: &mut Host, index: usize, cause: SelectionCause) -> Option<NodeId> {
        let el = self.0;
        let tabs = self.tabs(host);
        let Some(&tab) = tabs.get(index) else {
            if !tabs.is_empty() {
                warn(host, el, format_args!("tab {index} does not exist"));
            }
            return None;
        };
        let Some(panel) = self.panel_for_tab(host, tab) else {
            warn(host, el, format_args!("No panel was found for the selected tab {}", host.label(tab)));
            return None;
        };

        let previous = self.selected(host);
        let changed = previous != Some(tab);
        if changed && previous.is_some() && cause.writes_history() {
            self.push_history(host, tab);
        }

        for other in tabs {
            let selected = if other == tab { "true" } else { "false" };
            set_if_changed(host, other, "selected", selected);
        }
        for other in self.panels(host) {
            set_hidden(host, other, other != panel);
        }
        if let Some(state) = host.state_mut::<TabSet>(el) {
            state.selected = Some(tab);
        }
        self.mirror_index(host, index);

        if changed {
            log(host, el, format_args!("Selected tab {index} ({cause:?})"));
            if let Some(previous) = previous {
                host.emit_event(el, HIDDEN_TAB_EVENT, EventDetail::Tab(previous));
            }
            if cause.requests_focus() {
                host.focus(tab);
            }
            host.emit_event(el, SHOWN_TAB_EVENT, EventDetail::Tab(tab));
        }
        Some(tab)
    }

    fn mirror_index(self, host: &mut Host, index: usize) {
        let current = host.property_or_undefined(self.0, "selectedIndex");
        if current.as_number() == Some(index as f64) {
            return;
        }
        if let Err(err) = host.set_property(self.0, "selectedIndex", index) {
            warn(host, self.0, format_args!("could not mirror the selected index: {err}"));
        }
    }

    /// Record the selection of `tab` in the query string, keyed by this
    /// set's id.
    fn push_history(self, host: &mut Host, tab: NodeId) {
        if !host.supports_history() || !host.property_or_undefined(self.0, "tabHistory").is_truthy() {
            return;
        }
        let id = host.document().id(self.0).to_string();
        if id.is_empty() {
            log(host, self.0, "Tab history needs an id on the tab set");
            return;
        }
        let mut params = host.search_params();
        params.set(&id, host.document().id(tab));
        let url = params.apply_to(host.location());
        host.push_state(url);
    }

    /// Index of the tab the query string names for this set, if any.
    fn index_from_url(self, host: &Host) -> Option<usize> {
        if !host.supports_history() {
            return None;
        }
        let doc = host.document();
        let id = doc.id(self.0);
        if id.is_empty() {
            return None;
        }
        let params = host.search_params();
        let legacy_key = format!("{DEPRECATED_URL_PREFIX}{id}");
        let wanted = params
            .get(id)
            .filter(|value| !value.is_empty())
            .or_else(|| params.get(&legacy_key).filter(|value| !value.is_empty()))?;
        self.tabs(host).iter().position(|tab| doc.id(*tab) == wanted)
    }
}

/// Index requested through the `selected-index` attribute.
fn requested_index(host: &Host, el: NodeId) -> Option<usize> {
    match host.property_or_undefined(el, "selectedIndex") {
        PropertyValue::Number(n) if n.is_finite() && n >= 0.0 => Some(n.trunc() as usize),
        _ => None,
    }
}

/// Drop a stale ARIA reference left by an earlier pairing.
fn unlink(host: &mut Host, el: NodeId, name: &str) {
    if host.string_property(el, name).is_none() {
        return;
    }
    if let Err(err) = host.set_property(el, name, PropertyValue::Undefined) {
        warn(host, el, format_args!("could not clear {name}: {err}"));
    }
}

fn set_hidden(host: &mut Host, panel: NodeId, hidden: bool) {
    if host.document().has_attribute(panel, "hidden") == hidden {
        return;
    }
    if let Err(err) = host.set_property(panel, "hidden", hidden) {
        warn(host, panel, format_args!("could not update visibility: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_wraps() {
        assert_eq!(TabSet::navigate(3, Some(0), Key::Left), Some(2));
        assert_eq!(TabSet::navigate(3, Some(0), Key::Up), Some(2));
        assert_eq!(TabSet::navigate(3, Some(2), Key::Right), Some(0));
        assert_eq!(TabSet::navigate(3, Some(1), Key::Down), Some(2));
        assert_eq!(TabSet::navigate(3, Some(1), Key::Home), Some(0));
        assert_eq!(TabSet::navigate(3, Some(1), Key::End), Some(2));
    }

    #[test]
    fn test_navigation_without_selection() {
        assert_eq!(TabSet::navigate(4, None, Key::Right), Some(0));
        assert_eq!(TabSet::navigate(4, None, Key::Left), Some(3));
        assert_eq!(TabSet::navigate(0, None, Key::Home), None);
        assert_eq!(TabSet::navigate(4, Some(1), Key::Other(13)), None);
    }

    #[test]
    fn test_cause_flags() {
        assert!(SelectionCause::Keyboard.requests_focus());
        assert!(!SelectionCause::Click.requests_focus());
        assert!(!SelectionCause::Programmatic.requests_focus());
        assert!(SelectionCause::Click.writes_history());
        assert!(!SelectionCause::Url.writes_history());
        assert!(!SelectionCause::HistoryNavigation.writes_history());
    }

    #[test]
    fn test_class_registers_with_cascade_and_slots() {
        let mut host = Host::new();
        let defined = host.define(tabs_class()).unwrap();
        let registry = defined.registry();
        assert_eq!(registry.prop_to_attr("selectedIndex"), Some("selected-index"));
        assert_eq!(registry.prop_to_attr("orientation"), Some("aria-orientation"));
        assert!(registry.is_observed("hl-tab-history"));
        let targets = registry.cascade_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].selector, TAB_TAG);
        assert_eq!(targets[1].attributes, vec!["vertical", "variant"]);
        assert_eq!(defined.slots().len(), 2);
    }
}
