//! Slot bookkeeping.
//!
//! Components that declare slots get a `has_<slot>` attribute for every
//! slot that currently has light DOM content. The attributes are refreshed
//! on connect and whenever the slots watcher sees the component's children
//! change.

use crate::Host;
use crate::dom::NodeId;
use crate::error::ResultExt;
use crate::host::{WatcherKind, WatcherOptions};

impl Host {
    /// Whether a child of `el` is assigned to the slot `name`.
    ///
    /// An empty name is a usage mistake: a warning is logged and the answer
    /// is `false`.
    pub fn has_slot(&self, el: NodeId, name: &str) -> bool {
        if name.is_empty() {
            self.warn(el, "Please provide at least one slot name for which to search.");
            return false;
        }
        !self.get_slot(el, Some(name)).is_empty()
    }

    /// Children of `el` assigned to the slot `name`, or, for `None`, the
    /// children without a `slot` attribute.
    pub fn get_slot(&self, el: NodeId, name: Option<&str>) -> Vec<NodeId> {
        let doc = &self.document;
        doc.element_children(el)
            .into_iter()
            .filter(|child| match name {
                Some(name) => doc.get_attribute(*child, "slot") == Some(name),
                None => !doc.has_attribute(*child, "slot"),
            })
            .collect()
    }

    /// Whether `el` has element children or non-whitespace text.
    pub fn has_light_dom(&self, el: NodeId) -> bool {
        !self.document.element_children(el).is_empty() || !self.document.text_content(el).trim().is_empty()
    }

    /// Refresh the `has_<slot>` attributes of `el`.
    pub fn initialize_slots(&mut self, el: NodeId) {
        let Some(class) = self.class_of(el) else {
            return;
        };
        if class.slots().is_empty() {
            return;
        }
        self.log(el, "Validate slots...");
        self.unobserve(el, WatcherKind::Slots);

        let tag = class.tag();
        for slot in class.slots() {
            let filled = if slot.named {
                !self.get_slot(el, Some(&format!("{tag}--{}", slot.name))).is_empty()
                    || !self.get_slot(el, Some(&slot.name)).is_empty()
            } else {
                !self.get_slot(el, None).is_empty()
            };
            let attr = format!("has_{}", slot.name);
            let result = if filled {
                self.set_attribute(el, &attr, "")
            } else {
                self.remove_attribute(el, &attr)
            };
            result.or_warn("could not update a slot attribute");
        }

        self.log(el, "Slots validated.");
        if self.watchers.exists(el, WatcherKind::Slots) {
            self.watchers.arm(el, WatcherKind::Slots, el, WatcherOptions::child_list());
        }
    }
}
