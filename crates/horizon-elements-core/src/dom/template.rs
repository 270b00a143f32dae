//! Markup templates.
//!
//! A component class supplies its shadow markup as a string. It is parsed
//! once, at class definition, into a [`Template`] and instantiated into the
//! shadow root on every render. Instantiation only creates nodes, so
//! rendering twice yields the same tree.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Attribute, Document, DomError, NodeId};

/// Template parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The markup is not well formed.
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    /// A closing tag without a matching opening tag.
    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),
    /// The markup ended inside an element.
    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<TemplateNode>,
    },
    Text(String),
}

/// A parsed markup template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<TemplateNode>,
}

fn syntax_error(reader: &Reader<&[u8]>, message: impl ToString) -> TemplateError {
    TemplateError::Syntax {
        position: u64::try_from(reader.buffer_position()).unwrap_or_default(),
        message: message.to_string(),
    }
}

fn read_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<(String, Vec<Attribute>), TemplateError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| syntax_error(reader, e))?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).to_ascii_lowercase();
        let value = attribute
            .unescape_value()
            .map_err(|e| syntax_error(reader, e))?
            .into_owned();
        attributes.push(Attribute { name, value });
    }
    Ok((tag, attributes))
}

impl Template {
    /// Parse markup. Several top-level nodes are allowed.
    pub fn parse(markup: &str) -> Result<Self, TemplateError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(true);

        // Open elements: (tag, attributes, children collected so far).
        let mut stack: Vec<(String, Vec<Attribute>, Vec<TemplateNode>)> = Vec::new();
        let mut roots: Vec<TemplateNode> = Vec::new();

        fn push(
            stack: &mut [(String, Vec<Attribute>, Vec<TemplateNode>)],
            roots: &mut Vec<TemplateNode>,
            node: TemplateNode,
        ) {
            match stack.last_mut() {
                Some((_, _, children)) => children.push(node),
                None => roots.push(node),
            }
        }

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let (tag, attributes) = read_start(&reader, &start)?;
                    stack.push((tag, attributes, Vec::new()));
                }
                Ok(Event::Empty(start)) => {
                    let (tag, attributes) = read_start(&reader, &start)?;
                    push(
                        &mut stack,
                        &mut roots,
                        TemplateNode::Element {
                            tag,
                            attributes,
                            children: Vec::new(),
                        },
                    );
                }
                Ok(Event::End(end)) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                    let Some((tag, attributes, children)) = stack.pop() else {
                        return Err(TemplateError::UnexpectedClose(name));
                    };
                    if tag != name {
                        return Err(TemplateError::UnexpectedClose(name));
                    }
                    push(
                        &mut stack,
                        &mut roots,
                        TemplateNode::Element {
                            tag,
                            attributes,
                            children,
                        },
                    );
                }
                Ok(Event::Text(text)) => {
                    let content = text.unescape().map_err(|e| syntax_error(&reader, e))?;
                    if !content.is_empty() {
                        push(&mut stack, &mut roots, TemplateNode::Text(content.into_owned()));
                    }
                }
                Ok(Event::CData(cdata)) => {
                    let content = String::from_utf8_lossy(&cdata).into_owned();
                    push(&mut stack, &mut roots, TemplateNode::Text(content));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(syntax_error(&reader, e)),
            }
        }

        if let Some((tag, _, _)) = stack.pop() {
            return Err(TemplateError::Unclosed(tag));
        }
        Ok(Self { nodes: roots })
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Whether the template produces nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a fresh copy of the template under `parent`.
    ///
    /// Returns the created top-level nodes.
    pub fn instantiate(&self, doc: &mut Document, parent: NodeId) -> Result<Vec<NodeId>, DomError> {
        let mut created = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            created.push(instantiate_node(node, doc, parent)?);
        }
        Ok(created)
    }
}

fn instantiate_node(node: &TemplateNode, doc: &mut Document, parent: NodeId) -> Result<NodeId, DomError> {
    match node {
        TemplateNode::Text(text) => {
            let id = doc.create_text(text.clone());
            doc.append_child(parent, id)?;
            Ok(id)
        }
        TemplateNode::Element {
            tag,
            attributes,
            children,
        } => {
            let id = doc.create_element(tag);
            for attribute in attributes {
                doc.set_attribute(id, &attribute.name, &attribute.value)?;
            }
            doc.append_child(parent, id)?;
            for child in children {
                instantiate_node(child, doc, id)?;
            }
            Ok(id)
        }
    }
}
