//! Selector parsing and matching.
//!
//! Supports what cascade targets and component queries need: type (`tag`,
//! `*`), `#id`, `.class`, `[attr]` and `[attr=value]` simple selectors,
//! compound selectors, the descendant (whitespace) and child (`>`)
//! combinators, and comma-separated lists.

use std::fmt;

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};

use super::{Document, NodeId};

/// Selector parsing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

impl SelectorError {
    fn new(selector: &str, message: impl Into<String>) -> Self {
        Self {
            selector: selector.to_string(),
            message: message.into(),
        }
    }
}

/// A comma-separated list of selectors; matches when any member matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

/// A complex selector: compound parts joined by combinators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    /// Compound parts, left to right.
    pub parts: Vec<SelectorPart>,
    /// Combinators between parts (length = parts.len() - 1).
    pub combinators: Vec<Combinator>,
}

/// A compound selector (e.g. `hl-tab.active[aria-selected=true]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelectorPart {
    pub type_selector: Option<TypeSelector>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
}

/// Type selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSelector {
    /// `*`
    Universal,
    /// A lower-case tag name.
    Type(String),
}

/// `[name]` or `[name=value]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    pub name: String,
    pub value: Option<String>,
}

/// Combinator between compound parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Whitespace: any ancestor.
    Descendant,
    /// `>`: the parent.
    Child,
}

impl SelectorList {
    /// Parse a comma-separated selector list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut css = ParserInput::new(input);
        let mut parser = Parser::new(&mut css);
        let selectors = parser
            .parse_comma_separated(parse_selector)
            .map_err(|err| SelectorError::new(input, describe(err)))?;
        Ok(Self { selectors })
    }

    /// Members of the list.
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Tag names of members that are a bare type selector.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().filter_map(|s| match s.parts.as_slice() {
            [SelectorPart {
                type_selector: Some(TypeSelector::Type(tag)),
                id: None,
                classes,
                attributes,
            }] if classes.is_empty() && attributes.is_empty() => Some(tag.as_str()),
            _ => None,
        })
    }

    pub(crate) fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

impl Selector {
    /// Match right to left, backtracking over descendant combinators.
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self.parts.len() {
            0 => false,
            n => self.matches_from(doc, n - 1, node),
        }
    }

    fn matches_from(&self, doc: &Document, index: usize, node: NodeId) -> bool {
        if !self.parts[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_from(doc, index - 1, parent)),
            Combinator::Descendant => {
                let mut ancestor = doc.parent_element(node);
                while let Some(candidate) = ancestor {
                    if self.matches_from(doc, index - 1, candidate) {
                        return true;
                    }
                    ancestor = doc.parent_element(candidate);
                }
                false
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                match self.combinators[i - 1] {
                    Combinator::Descendant => write!(f, " ")?,
                    Combinator::Child => write!(f, " > ")?,
                }
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

fn fail<'i>(parser: &Parser<'i, '_>, message: impl Into<String>) -> ParseError<'i, String> {
    parser.new_custom_error(message.into())
}

fn describe(err: ParseError<'_, String>) -> String {
    match err.kind {
        ParseErrorKind::Custom(message) => message,
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "unexpected end of input".to_string(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("unexpected token {token:?}")
        }
        ParseErrorKind::Basic(_) => "invalid selector syntax".to_string(),
    }
}

impl SelectorPart {
    fn is_empty(&self) -> bool {
        self.type_selector.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

/// One member of a selector list. Whitespace is significant, so tokens are
/// read with `next_including_whitespace`.
fn parse_selector<'i>(parser: &mut Parser<'i, '_>) -> Result<Selector, ParseError<'i, String>> {
    let mut parts = Vec::new();
    let mut combinators = Vec::new();
    let mut current = SelectorPart::default();
    let mut pending: Option<Combinator> = None;

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                    pending = Some(Combinator::Descendant);
                }
                continue;
            }
            Token::Delim('>') => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                if parts.is_empty() {
                    return Err(fail(parser, "combinator without a left-hand side"));
                }
                if pending == Some(Combinator::Child) {
                    return Err(fail(parser, "unexpected '>'"));
                }
                pending = Some(Combinator::Child);
                continue;
            }
            _ => {}
        }

        if current.is_empty() && !parts.is_empty() {
            match pending.take() {
                Some(combinator) => combinators.push(combinator),
                None => return Err(fail(parser, "missing combinator")),
            }
        }

        match token {
            Token::Ident(name) => {
                if !current.is_empty() {
                    return Err(fail(parser, format!("type selector '{}' must come first", &*name)));
                }
                current.type_selector = Some(TypeSelector::Type(name.to_ascii_lowercase()));
            }
            Token::Delim('*') => {
                if !current.is_empty() {
                    return Err(fail(parser, "'*' must come first"));
                }
                current.type_selector = Some(TypeSelector::Universal);
            }
            Token::IDHash(id) => {
                if current.id.is_some() {
                    return Err(fail(parser, "more than one id in a compound selector"));
                }
                current.id = Some(id.to_string());
            }
            Token::Hash(id) => return Err(fail(parser, format!("'#{}' is not a valid id selector", &*id))),
            Token::Delim('.') => match parser.next_including_whitespace().cloned() {
                Ok(Token::Ident(class)) => current.classes.push(class.to_string()),
                _ => return Err(fail(parser, "expected a name after '.'")),
            },
            Token::SquareBracketBlock => {
                let attribute = parser.parse_nested_block(parse_attribute)?;
                current.attributes.push(attribute);
            }
            Token::Colon => return Err(fail(parser, "pseudo-classes are not supported")),
            other => return Err(fail(parser, format!("unsupported token {other:?}"))),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    } else if pending == Some(Combinator::Child) {
        return Err(fail(parser, "dangling combinator"));
    }
    if parts.is_empty() {
        return Err(fail(parser, "empty selector in list"));
    }
    Ok(Selector { parts, combinators })
}

/// Contents of `[...]`: `name` or `name=value`, the value an ident or a string.
fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> Result<AttributeSelector, ParseError<'i, String>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    if parser.is_exhausted() {
        return Ok(AttributeSelector { name, value: None });
    }
    if !matches!(parser.next()?.clone(), Token::Delim('=')) {
        return Err(fail(parser, "only [attr] and [attr=value] are supported"));
    }
    let value = match parser.next()?.clone() {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        _ => return Err(fail(parser, "expected an attribute value")),
    };
    parser.expect_exhausted()?;
    Ok(AttributeSelector {
        name,
        value: Some(value),
    })
}

impl SelectorPart {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };

        if let Some(TypeSelector::Type(name)) = &self.type_selector
            && name != tag
        {
            return false;
        }

        if let Some(id) = &self.id
            && doc.get_attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }

        if !self.classes.iter().all(|class| doc.has_class(node, class)) {
            return false;
        }

        self.attributes.iter().all(|attribute| {
            match (doc.get_attribute(node, &attribute.name), &attribute.value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected.as_str(),
                (None, _) => false,
            }
        })
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_selector {
            Some(TypeSelector::Universal) => write!(f, "*")?,
            Some(TypeSelector::Type(t)) => write!(f, "{t}")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attribute in &self.attributes {
            match &attribute.value {
                Some(value) => write!(f, "[{}=\"{}\"]", attribute.name, value)?,
                None => write!(f, "[{}]", attribute.name)?,
            }
        }
        Ok(())
    }
}
