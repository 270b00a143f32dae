//! Mutation watchers.
//!
//! A watcher observes one node (optionally its light subtree) on behalf of a
//! component instance. Matching mutations are queued as [`MutationRecord`]s
//! and delivered in one batch per watcher from a single microtask. A
//! disarmed watcher records nothing and drops whatever was pending.

use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

use crate::dom::{Document, NodeId};

new_key_type! {
    /// Identifies a watcher.
    pub struct WatcherId;
}

/// What a watcher is for. Each instance owns at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    /// Re-cascades attributes to newly added nodes.
    Cascade,
    /// Keeps `has_<slot>` attributes current.
    Slots,
    /// Component-specific light DOM observation.
    LightDom,
}

/// Which mutations a watcher records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatcherOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// Also observe light-tree descendants of the target.
    pub subtree: bool,
}

impl WatcherOptions {
    /// Child list changes of the target only.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    /// Child list and attribute changes across the subtree.
    pub fn subtree_all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: false,
            subtree: true,
        }
    }

    /// Child list changes across the subtree.
    pub fn subtree_child_list() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Self::default()
        }
    }

    /// Builder-style toggle for character data.
    pub fn with_character_data(mut self) -> Self {
        self.character_data = true;
        self
    }
}

/// One observed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
    CharacterData {
        target: NodeId,
    },
}

impl MutationRecord {
    /// The node the mutation happened on.
    pub fn target(&self) -> NodeId {
        match self {
            Self::ChildList { target, .. }
            | Self::Attributes { target, .. }
            | Self::CharacterData { target } => *target,
        }
    }

    /// Nodes added by a child list mutation.
    pub fn added_nodes(&self) -> &[NodeId] {
        match self {
            Self::ChildList { added, .. } => added,
            _ => &[],
        }
    }

    fn is_observed_by(&self, options: &WatcherOptions) -> bool {
        match self {
            Self::ChildList { .. } => options.child_list,
            Self::Attributes { .. } => options.attributes,
            Self::CharacterData { .. } => options.character_data,
        }
    }
}

#[derive(Debug)]
struct Watcher {
    owner: NodeId,
    kind: WatcherKind,
    target: NodeId,
    options: Option<WatcherOptions>,
    pending: Vec<MutationRecord>,
    order: u64,
}

/// All watchers of a host.
#[derive(Debug, Default)]
pub struct WatcherSet {
    watchers: SlotMap<WatcherId, Watcher>,
    by_owner: HashMap<(NodeId, WatcherKind), WatcherId>,
    next_order: u64,
}

/// A batch ready for delivery.
#[derive(Debug)]
pub struct WatcherBatch {
    pub owner: NodeId,
    pub kind: WatcherKind,
    pub records: Vec<MutationRecord>,
}

impl WatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return) the disarmed watcher of `kind` for `owner`.
    pub fn create(&mut self, owner: NodeId, kind: WatcherKind) -> WatcherId {
        if let Some(id) = self.by_owner.get(&(owner, kind)) {
            return *id;
        }
        let order = self.next_order;
        self.next_order += 1;
        let id = self.watchers.insert(Watcher {
            owner,
            kind,
            target: owner,
            options: None,
            pending: Vec::new(),
            order,
        });
        self.by_owner.insert((owner, kind), id);
        id
    }

    /// Whether `owner` has a watcher of `kind`.
    pub fn exists(&self, owner: NodeId, kind: WatcherKind) -> bool {
        self.by_owner.contains_key(&(owner, kind))
    }

    /// Start observing `target`. Re-arming replaces the options.
    pub fn arm(&mut self, owner: NodeId, kind: WatcherKind, target: NodeId, options: WatcherOptions) -> bool {
        let Some(watcher) = self.get_mut(owner, kind) else {
            return false;
        };
        watcher.target = target;
        watcher.options = Some(options);
        true
    }

    /// Stop observing and drop pending records. Returns the options it was
    /// armed with.
    pub fn disarm(&mut self, owner: NodeId, kind: WatcherKind) -> Option<WatcherOptions> {
        let watcher = self.get_mut(owner, kind)?;
        watcher.pending.clear();
        watcher.options.take()
    }

    /// Disarm every watcher of `owner`.
    pub fn disarm_all(&mut self, owner: NodeId) {
        for watcher in self.watchers.values_mut().filter(|w| w.owner == owner) {
            watcher.pending.clear();
            watcher.options = None;
        }
    }

    /// Current options of an armed watcher.
    pub fn options(&self, owner: NodeId, kind: WatcherKind) -> Option<WatcherOptions> {
        self.by_owner
            .get(&(owner, kind))
            .and_then(|id| self.watchers.get(*id))
            .and_then(|w| w.options)
    }

    /// Whether the watcher is armed.
    pub fn is_armed(&self, owner: NodeId, kind: WatcherKind) -> bool {
        self.options(owner, kind).is_some()
    }

    /// Remove every watcher of `owner`.
    pub fn remove_owner(&mut self, owner: NodeId) {
        self.watchers.retain(|_, w| w.owner != owner);
        self.by_owner.retain(|(o, _), _| *o != owner);
    }

    /// Queue `record` on every armed watcher that observes it. Returns
    /// whether anything was queued.
    pub fn record(&mut self, doc: &Document, record: &MutationRecord) -> bool {
        let node = record.target();
        let mut queued = false;
        for watcher in self.watchers.values_mut() {
            let Some(options) = &watcher.options else {
                continue;
            };
            if !record.is_observed_by(options) {
                continue;
            }
            let in_scope = node == watcher.target
                || (options.subtree && is_light_ancestor(doc, watcher.target, node));
            if in_scope {
                watcher.pending.push(record.clone());
                queued = true;
            }
        }
        queued
    }

    /// Take every pending batch, oldest watcher first.
    pub fn take_batches(&mut self) -> Vec<WatcherBatch> {
        let mut ready: Vec<(u64, WatcherBatch)> = self
            .watchers
            .values_mut()
            .filter(|w| !w.pending.is_empty())
            .map(|w| {
                (
                    w.order,
                    WatcherBatch {
                        owner: w.owner,
                        kind: w.kind,
                        records: std::mem::take(&mut w.pending),
                    },
                )
            })
            .collect();
        ready.sort_by_key(|(order, _)| *order);
        ready.into_iter().map(|(_, batch)| batch).collect()
    }

    /// Number of watchers.
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Whether there are no watchers.
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    fn get_mut(&mut self, owner: NodeId, kind: WatcherKind) -> Option<&mut Watcher> {
        let id = *self.by_owner.get(&(owner, kind))?;
        self.watchers.get_mut(id)
    }
}

/// Whether `ancestor` is a strict light-tree ancestor of `node`. Shadow
/// roots have no parent, so the walk never leaves a shadow tree.
fn is_light_ancestor(doc: &Document, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = doc.parent(node);
    while let Some(n) = current {
        if n == ancestor {
            return true;
        }
        current = doc.parent(n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let owner = doc.create_element("x-owner");
        let child = doc.create_element("div");
        doc.append_child(doc.body(), owner).unwrap();
        doc.append_child(owner, child).unwrap();
        let shadow = doc.attach_shadow(owner).unwrap();
        let inner = doc.create_element("span");
        doc.append_child(shadow, inner).unwrap();
        (doc, owner, child, inner)
    }

    fn attr(target: NodeId) -> MutationRecord {
        MutationRecord::Attributes {
            target,
            name: "x".into(),
            old_value: None,
        }
    }

    #[test]
    fn test_disarmed_watcher_records_nothing() {
        let (doc, owner, child, _) = tree();
        let mut set = WatcherSet::new();
        set.create(owner, WatcherKind::Cascade);
        assert!(!set.record(&doc, &attr(child)));
        assert!(set.take_batches().is_empty());
    }

    #[test]
    fn test_subtree_scope_stops_at_shadow_root() {
        let (doc, owner, child, inner) = tree();
        let mut set = WatcherSet::new();
        set.create(owner, WatcherKind::Cascade);
        set.arm(owner, WatcherKind::Cascade, owner, WatcherOptions::subtree_all());

        assert!(set.record(&doc, &attr(child)));
        assert!(!set.record(&doc, &attr(inner)));

        let batches = set.take_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records.len(), 1);
    }

    #[test]
    fn test_options_filter_record_types() {
        let (doc, owner, child, _) = tree();
        let mut set = WatcherSet::new();
        set.create(owner, WatcherKind::Slots);
        set.arm(owner, WatcherKind::Slots, owner, WatcherOptions::child_list());

        assert!(!set.record(&doc, &attr(owner)));
        let grandchild = MutationRecord::ChildList {
            target: child,
            added: vec![],
            removed: vec![],
        };
        assert!(!set.record(&doc, &grandchild));
        let direct = MutationRecord::ChildList {
            target: owner,
            added: vec![child],
            removed: vec![],
        };
        assert!(set.record(&doc, &direct));
    }

    #[test]
    fn test_disarm_drops_pending() {
        let (doc, owner, _, _) = tree();
        let mut set = WatcherSet::new();
        set.create(owner, WatcherKind::LightDom);
        set.arm(owner, WatcherKind::LightDom, owner, WatcherOptions::subtree_all());
        set.record(&doc, &attr(owner));

        let options = set.disarm(owner, WatcherKind::LightDom);
        assert_eq!(options, Some(WatcherOptions::subtree_all()));
        assert!(set.take_batches().is_empty());
        assert!(!set.is_armed(owner, WatcherKind::LightDom));
    }

    #[test]
    fn test_batches_are_delivered_in_creation_order() {
        let (doc, owner, _, _) = tree();
        let mut set = WatcherSet::new();
        for kind in [WatcherKind::LightDom, WatcherKind::Cascade] {
            set.create(owner, kind);
            set.arm(owner, kind, owner, WatcherOptions::subtree_all());
        }
        set.record(&doc, &attr(owner));
        let kinds: Vec<WatcherKind> = set.take_batches().into_iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![WatcherKind::LightDom, WatcherKind::Cascade]);
    }
}
