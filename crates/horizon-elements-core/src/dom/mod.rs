//! In-memory element tree.
//!
//! [`Document`] is an arena of nodes addressed by [`NodeId`]. It models the
//! parts of a browser document the component framework depends on: ordered
//! attributes, open shadow roots, light-tree queries that never cross a
//! shadow boundary, and connectedness through shadow hosts.
//!
//! The document itself does no notification. All mutations that components
//! must observe go through [`Host`](crate::Host), which wraps these
//! primitives with attribute-changed callbacks and mutation records.

mod selector;
mod style;
mod template;

use slotmap::{SlotMap, new_key_type};

pub use selector::{
    AttributeSelector, Combinator, Selector, SelectorError, SelectorList, SelectorPart, TypeSelector,
};
pub use style::{InlineStyle, computed_custom_property};
pub use template::{Template, TemplateError, TemplateNode};

new_key_type! {
    /// Identifies a node in a [`Document`].
    pub struct NodeId;
}

/// Errors from tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node was never created or has been dropped.
    #[error("node {0:?} does not exist")]
    MissingNode(NodeId),
    /// The operation needs an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// The node is not a child of the given parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    /// The insertion would put a node inside itself.
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// The node cannot have children or cannot be inserted.
    #[error("node {0:?} cannot take part in this insertion")]
    InvalidInsertion(NodeId),
    /// The element already hosts a shadow root.
    #[error("{0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),
}

/// A single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element payload.
#[derive(Debug, Clone)]
pub struct ElementData {
    tag: String,
    attributes: Vec<Attribute>,
    shadow_root: Option<NodeId>,
}

impl ElementData {
    /// Lower-case tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    ShadowRoot { host: NodeId },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// The element tree.
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty `body`.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Document));
        let body = nodes.insert(Node::new(NodeKind::Element(ElementData {
            tag: "body".to_string(),
            attributes: Vec::new(),
            shadow_root: None,
        })));
        nodes[body].parent = Some(root);
        nodes[root].children.push(body);
        Self { nodes, root, body }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `body` element.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Whether `node` exists.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Create a detached element. The tag is lower-cased.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            shadow_root: None,
        })))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.into())))
    }

    /// The node payload.
    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node).map(|n| &n.kind)
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(node) {
            Some(Node {
                kind: NodeKind::Element(data),
                ..
            }) => Ok(data),
            Some(_) => Err(DomError::NotAnElement(node)),
            None => Err(DomError::MissingNode(node)),
        }
    }

    /// Whether `node` is an element.
    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Whether `node` is a text node.
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Text(_)))
    }

    /// Lower-case tag name of an element.
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Parent node (element, shadow root, or document).
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Parent node if it is an element.
    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|p| self.is_element(*p))
    }

    /// Child nodes in order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children in order.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// First element child.
    pub fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    fn sibling_index(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(node)?;
        let index = self.children(parent).iter().position(|c| *c == node)?;
        Some((parent, index))
    }

    /// Next sibling that is an element.
    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(node)?;
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Previous sibling that is an element.
    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_index(node)?;
        self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Whether `ancestor` is `node` or one of its light-tree ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Insert `child` into `parent` before `reference` (append when `None`).
    ///
    /// The child is detached from its previous parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.contains(parent) {
            return Err(DomError::MissingNode(parent));
        }
        if !self.contains(child) {
            return Err(DomError::MissingNode(child));
        }
        if self.is_text(parent) {
            return Err(DomError::InvalidInsertion(parent));
        }
        if matches!(
            self.kind(child),
            Some(NodeKind::Document | NodeKind::ShadowRoot { .. })
        ) {
            return Err(DomError::InvalidInsertion(child));
        }
        if self.is_shadow_including_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }

        self.detach(child);
        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(self.children(parent).len()),
            None => self.children(parent).len(),
        };
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach `node` from its parent. Returns the former parent.
    pub fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        self.nodes[parent].children.retain(|c| *c != node);
        self.nodes[node].parent = None;
        Some(parent)
    }

    /// Remove every child of `node`. Returns the removed children.
    pub fn clear_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let Some(n) = self.nodes.get_mut(node) else {
            return Vec::new();
        };
        let removed = std::mem::take(&mut n.children);
        for child in &removed {
            self.nodes[*child].parent = None;
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Shadow roots
    // -------------------------------------------------------------------------

    /// Attach an open shadow root to `host`.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        if self.element_mut(host)?.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let shadow = self.nodes.insert(Node::new(NodeKind::ShadowRoot { host }));
        self.element_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    /// Shadow root hosted by `node`.
    pub fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|e| e.shadow_root)
    }

    /// Host of a shadow root.
    pub fn shadow_host(&self, node: NodeId) -> Option<NodeId> {
        match self.kind(node) {
            Some(NodeKind::ShadowRoot { host }) => Some(*host),
            _ => None,
        }
    }

    /// Topmost light-tree ancestor of `node` (a document, a shadow root, or a
    /// detached subtree root).
    pub fn root_node(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Parent across shadow boundaries: a shadow root's parent is its host.
    pub fn composed_parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).or_else(|| self.shadow_host(node))
    }

    fn is_shadow_including_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.composed_parent(n);
        }
        false
    }

    /// Whether `node` is in the document, possibly through shadow hosts.
    pub fn is_connected(&self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        let mut current = node;
        loop {
            let root = self.root_node(current);
            if root == self.root {
                return true;
            }
            match self.shadow_host(root) {
                Some(host) => current = host,
                None => return false,
            }
        }
    }

    /// Light-tree descendants of `node` in tree order (excluding `node`).
    ///
    /// Shadow roots are never entered.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// `node` and everything below it, shadow trees included, in
    /// shadow-including tree order.
    pub fn shadow_including_inclusive_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
            if let Some(shadow) = self.shadow_root(current) {
                stack.push(shadow);
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// Attributes of an element in insertion order.
    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        self.element(node)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Attribute value.
    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attribute(name))
    }

    /// Whether the attribute is present.
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Set an attribute. Returns the previous value.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, DomError> {
        let element = self.element_mut(node)?;
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attribute) => Ok(Some(std::mem::replace(
                &mut attribute.value,
                value.to_string(),
            ))),
            None => {
                element.attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
                Ok(None)
            }
        }
    }

    /// Remove an attribute. Returns the previous value (`None` if absent).
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let element = self.element_mut(node)?;
        match element.attributes.iter().position(|a| a.name == name) {
            Some(index) => Ok(Some(element.attributes.remove(index).value)),
            None => Ok(None),
        }
    }

    /// The `id` attribute, or an empty string.
    pub fn id(&self, node: NodeId) -> &str {
        self.get_attribute(node, "id").unwrap_or("")
    }

    /// Whether the `class` attribute contains `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get_attribute(node, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// Concatenated light-tree text of `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(node)
                .into_iter()
                .filter_map(|n| match self.kind(n) {
                    Some(NodeKind::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replace the text of a text node.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        match self.nodes.get_mut(node) {
            Some(Node {
                kind: NodeKind::Text(current),
                ..
            }) => {
                *current = text.into();
                Ok(())
            }
            Some(_) => Err(DomError::InvalidInsertion(node)),
            None => Err(DomError::MissingNode(node)),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether an element matches any selector of the list.
    pub fn matches(&self, node: NodeId, selectors: &SelectorList) -> bool {
        self.is_element(node) && selectors.matches(self, node)
    }

    /// Element descendants of `scope` matching `selectors`, in tree order.
    ///
    /// `scope` may be an element, a shadow root, or the document.
    pub fn query_selector_all(&self, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.matches(*n, selectors))
            .collect()
    }

    /// First element descendant of `scope` matching `selectors`.
    pub fn query_selector(&self, scope: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.matches(*n, selectors))
    }

    /// Nearest inclusive element ancestor matching `selectors`.
    ///
    /// The walk stops at a shadow root or the document.
    pub fn closest(&self, node: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        let mut current = Some(node).filter(|n| self.is_element(*n));
        while let Some(n) = current {
            if self.matches(n, selectors) {
                return Some(n);
            }
            current = self.parent_element(n);
        }
        None
    }

    /// First element descendant of `scope` whose id is `id`.
    pub fn find_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(scope)
            .into_iter()
            .find(|n| self.get_attribute(*n, "id") == Some(id))
    }
}
