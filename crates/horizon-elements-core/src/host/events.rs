//! Custom events and UI input.
//!
//! Components publish [`CustomEvent`]s through [`Host::emit_event`]; they are
//! delivered to everything connected to [`Host::events`]. User input
//! ([`Host::click`], [`Host::key_down`]) is dispatched as a [`UiEvent`] to
//! every upgraded, connected component on the composed path of the target,
//! innermost first, after which the microtask queue is drained.

use std::sync::Arc;

use super::Host;
use crate::Signal;
use crate::dom::{Document, NodeId};

/// Payload of a custom event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventDetail {
    #[default]
    None,
    /// The affected tab.
    Tab(NodeId),
}

/// A custom event emitted by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEvent {
    pub name: String,
    pub target: NodeId,
    pub detail: EventDetail,
    pub bubbles: bool,
    pub composed: bool,
    pub cancelable: bool,
    /// Composed propagation path, target first.
    pub path: Vec<NodeId>,
}

/// Keys the components react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
    Home,
    End,
    /// Any other legacy key code.
    Other(u32),
}

impl Key {
    /// Map a legacy `keyCode`.
    pub fn from_key_code(code: u32) -> Self {
        match code {
            37 => Self::Left,
            38 => Self::Up,
            39 => Self::Right,
            40 => Self::Down,
            36 => Self::Home,
            35 => Self::End,
            other => Self::Other(other),
        }
    }

    /// The legacy `keyCode`.
    pub fn key_code(self) -> u32 {
        match self {
            Self::Left => 37,
            Self::Up => 38,
            Self::Right => 39,
            Self::Down => 40,
            Self::Home => 36,
            Self::End => 35,
            Self::Other(code) => code,
        }
    }
}

/// A key press with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyboardEvent {
    /// A press of `key` without modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            alt: false,
            ctrl: false,
            shift: false,
            meta: false,
        }
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEventKind {
    Click,
    KeyDown(KeyboardEvent),
}

/// A user input event being dispatched.
#[derive(Debug, Clone)]
pub struct UiEvent {
    kind: UiEventKind,
    target: NodeId,
    default_prevented: bool,
}

impl UiEvent {
    pub fn new(kind: UiEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            default_prevented: false,
        }
    }

    pub fn kind(&self) -> &UiEventKind {
        &self.kind
    }

    /// The original (innermost) target.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The target as seen from `listener`: nodes in shadow trees that do not
    /// contain `listener` are replaced by their hosts.
    pub fn target_for(&self, doc: &Document, listener: NodeId) -> NodeId {
        retarget(doc, self.target, listener)
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Composed propagation path of `node`: the node, its ancestors, and the
/// hosts of every shadow root crossed.
pub fn composed_path(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        path.push(n);
        current = doc.composed_parent(n);
    }
    path
}

fn retarget(doc: &Document, target: NodeId, listener: NodeId) -> NodeId {
    let mut current = target;
    loop {
        let root = doc.root_node(current);
        let Some(host) = doc.shadow_host(root) else {
            return current;
        };
        if tree_contains(doc, root, listener) {
            return current;
        }
        current = host;
    }
}

/// Whether `listener` is in the tree rooted at `root`, or in a shadow tree
/// nested below it.
fn tree_contains(doc: &Document, root: NodeId, listener: NodeId) -> bool {
    let mut node = listener;
    loop {
        let r = doc.root_node(node);
        if r == root {
            return true;
        }
        match doc.shadow_host(r) {
            Some(host) => node = host,
            None => return false,
        }
    }
}

impl Host {
    /// Signal carrying every emitted custom event.
    pub fn events(&self) -> &Arc<Signal<CustomEvent>> {
        &self.events
    }

    /// Emit a bubbling, composed, non-cancelable custom event from `el`.
    pub fn emit_event(&mut self, el: NodeId, name: &str, detail: EventDetail) {
        self.emit_event_with(el, name, detail, true, true, false);
    }

    /// Emit a custom event with explicit flags.
    pub fn emit_event_with(
        &mut self,
        el: NodeId,
        name: &str,
        detail: EventDetail,
        bubbles: bool,
        composed: bool,
        cancelable: bool,
    ) {
        match detail {
            EventDetail::None => self.log(el, format_args!("Custom event: {name}")),
            detail => self.log(el, format_args!("Custom event: {name} {detail:?}")),
        }
        let event = CustomEvent {
            name: name.to_string(),
            target: el,
            detail,
            bubbles,
            composed,
            cancelable,
            path: composed_path(&self.document, el),
        };
        self.events.emit(event);
    }

    /// Click on `target`.
    pub fn click(&mut self, target: NodeId) -> UiEvent {
        self.dispatch_ui_event(UiEvent::new(UiEventKind::Click, target))
    }

    /// Key press on `target`.
    pub fn key_down(&mut self, target: NodeId, event: KeyboardEvent) -> UiEvent {
        self.dispatch_ui_event(UiEvent::new(UiEventKind::KeyDown(event), target))
    }

    /// Deliver `event` along the composed path of its target, then drain the
    /// microtask queue.
    pub fn dispatch_ui_event(&mut self, mut event: UiEvent) -> UiEvent {
        for node in composed_path(&self.document, event.target()) {
            if !self.is_connected_component(node) {
                continue;
            }
            if let Some(behavior) = self.behavior_of(node) {
                behavior.handle_event(self, node, &mut event);
            }
        }
        self.run_until_idle();
        event
    }

    /// Focus `el`.
    pub fn focus(&mut self, el: NodeId) {
        self.focused = Some(el);
    }

    /// The focused node.
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }
}
