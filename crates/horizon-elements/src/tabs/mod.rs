//! Tabbed interface: `hl-tabs`, `hl-tab` and `hl-tab-panel`.
//!
//! A tab set is written as alternating tab/panel children:
//!
//! ```text
//! <hl-tabs id="demo">
//!   <hl-tab slot="tab"><h2>One</h2></hl-tab>
//!   <hl-tab-panel slot="panel">First panel</hl-tab-panel>
//!   <hl-tab slot="tab"><h2>Two</h2></hl-tab>
//!   <hl-tab-panel slot="panel">Second panel</hl-tab-panel>
//! </hl-tabs>
//! ```
//!
//! Each tab is linked to the panel that follows it through `aria-controls`
//! and `aria-labelledby`. Exactly one pair is selected at a time; the
//! selection is driven by clicks, arrow keys, the `selected-index`
//! attribute, the page URL and session history, all funneled through
//! [`Tabs::select_index`].

mod panel;
mod tab;
mod tab_set;

use std::fmt;

use horizon_elements_core::logging::targets;
use horizon_elements_core::{Host, NodeId, PropertyValue, RegistrationError};

pub use panel::{PANEL_TAG, panel_class};
pub use tab::{TAB_TAG, tab_class};
pub use tab_set::{HIDDEN_TAB_EVENT, SHOWN_TAB_EVENT, SelectionCause, TABS_TAG, TabSet, Tabs, tabs_class};

/// Version reported by the tab classes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Register `hl-tab`, `hl-tab-panel` and `hl-tabs`.
pub fn define(host: &mut Host) -> Result<(), RegistrationError> {
    host.define(tab_class())?;
    host.define(panel_class())?;
    host.define(tabs_class())?;
    Ok(())
}

/// Element children of `el` with the given tag, in document order.
fn children_with_tag(host: &Host, el: NodeId, tag: &str) -> Vec<NodeId> {
    let doc = host.document();
    doc.element_children(el)
        .into_iter()
        .filter(|child| doc.tag_name(*child) == Some(tag))
        .collect()
}

/// Give `el` a generated id when it has none.
fn ensure_id(host: &mut Host, el: NodeId) {
    if !host.document().id(el).is_empty() {
        return;
    }
    let id = host.random_id();
    if let Err(err) = host.set_attribute(el, "id", &id) {
        warn(host, el, format_args!("could not assign an id: {err}"));
    }
}

/// Write a string property unless it already holds `value`.
fn set_if_changed(host: &mut Host, el: NodeId, name: &str, value: &str) {
    if host.string_property(el, name).as_deref() == Some(value) {
        return;
    }
    if let Err(err) = host.set_property(el, name, value) {
        warn(host, el, format_args!("could not set {name}: {err}"));
    }
}

/// Adopt the deprecated `hl-id` attribute as the element id.
fn old_id_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, new: &PropertyValue) {
    if !host.document().id(el).is_empty() {
        return;
    }
    if let Some(id) = new.as_str().filter(|id| !id.is_empty()) {
        let id = id.to_string();
        if let Err(err) = host.set_attribute(el, "id", &id) {
            warn(host, el, format_args!("could not adopt {id} as id: {err}"));
        }
    }
}

fn log(host: &Host, el: NodeId, message: impl fmt::Display) {
    if host.config().debug_log {
        tracing::debug!(target: targets::TABS, "{} {}", host.label(el), message);
    }
}

fn warn(host: &Host, el: NodeId, message: impl fmt::Display) {
    tracing::warn!(target: targets::TABS, "{} {}", host.label(el), message);
}
