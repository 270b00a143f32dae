//! Inline `style` attribute handling and custom-property lookup.

use std::fmt;

use cssparser::{Delimiter, ParseError, Parser, ParserInput};

use super::{Document, NodeId};

/// Parsed declarations of a `style` attribute.
///
/// Custom property names (`--x`) keep their case; other names are
/// lower-cased. Later declarations of the same name replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

impl InlineStyle {
    /// Parse `name: value; name: value`.
    ///
    /// Declarations are split on top-level semicolons only, so strings,
    /// `url(...)` and other blocks keep their contents. Declarations
    /// without a name and colon are dropped.
    pub fn parse(text: &str) -> Self {
        let mut style = Self::default();
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }
            let declaration = parser.parse_until_after(Delimiter::Semicolon, parse_declaration);
            if let Ok((name, value)) = declaration {
                style.set(&name, &value);
            }
        }
        style
    }

    /// Value of a declaration.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = normalize_name(name);
        self.declarations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace a declaration.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = normalize_name(name);
        match self.declarations.iter_mut().find(|(n, _)| *n == name) {
            Some((_, current)) => *current = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    /// Remove a declaration. Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        let before = self.declarations.len();
        self.declarations.retain(|(n, _)| *n != name);
        before != self.declarations.len()
    }

    /// Whether there are no declarations.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{name}: {value};")?;
        }
        Ok(())
    }
}

fn parse_declaration<'i>(parser: &mut Parser<'i, '_>) -> Result<(String, String), ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_string();
    parser.expect_colon()?;
    parser.skip_whitespace();
    let start = parser.position();
    while parser.next_including_whitespace_and_comments().is_ok() {}
    Ok((name, parser.slice_from(start).trim().to_string()))
}

/// Computed value of the custom property `--{name}` on `node`.
///
/// Custom properties inherit: the nearest element on the shadow-including
/// ancestor chain that declares the property inline wins. Empty values
/// count as unset.
pub fn computed_custom_property(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    let property = format!("--{name}");
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(text) = doc.get_attribute(n, "style") {
            let style = InlineStyle::parse(text);
            if let Some(value) = style.get(&property) {
                let value = value.trim().trim_matches('"').trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        current = doc.composed_parent(n);
    }
    None
}
