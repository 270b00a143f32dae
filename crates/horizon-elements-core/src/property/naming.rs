//! Property name ↔ attribute name conversion.
//!
//! Property names are camel-case identifiers (`selectedIndex`); attribute
//! names are kebab-case (`selected-index`). Explicit `attr` overrides are
//! resolved by the registry, not here.

/// Derive an attribute name from a property name.
///
/// Strips one leading underscore, lower-cases an upper-case initial, then
/// replaces every remaining upper-case letter with `-` and its lower-case
/// form.
pub fn prop_to_attr(name: &str) -> String {
    let name = name.strip_prefix('_').unwrap_or(name);
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive a property name from an attribute name: `-x` becomes `X`.
pub fn attr_to_prop(attr: &str) -> String {
    let mut out = String::with_capacity(attr.len());
    let mut chars = attr.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '-' && next.is_ascii_alphabetic() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Property names must begin with a lower-case ASCII letter or an underscore.
pub fn is_valid_property_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
}
