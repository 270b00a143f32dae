//! The property table and observers every component inherits.
//!
//! | property    | attribute   | role                                          |
//! |-------------|-------------|-----------------------------------------------|
//! | `hlelement` | `hlelement` | upgrade marker, adds the `HLElement` class    |
//! | `on`        | `on`        | effective visual context                      |
//! | `context`   | `context`   | explicit context override                     |
//! | `oldTheme`  | `hl-theme`  | deprecated alias of `context`                 |
//! | `_style`    | `style`     | inline style, scanned for context variables   |
//! | `type`      | `type`      | component type, defaulted per class           |

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::Host;
use crate::dom::NodeId;
use crate::error::ResultExt;
use crate::property::{PropertyDefinition, PropertyValue};
use crate::registry::Observer;

/// Name of the upgrade-marker property and attribute.
pub const UPGRADE_MARKER: &str = "hlelement";
/// Class added to upgraded elements.
pub const UPGRADED_CLASS: &str = "HLElement";
/// Values of the context properties.
pub const CONTEXT_VALUES: [&str; 3] = ["light", "dark", "saturated"];

const UPGRADE_OBSERVER: &str = "upgrade_marker_changed";
const ON_OBSERVER: &str = "on_changed";
const CONTEXT_OBSERVER: &str = "context_changed";
const INLINE_STYLE_OBSERVER: &str = "inline_style_changed";

static CONTEXT_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)--[\w|-]*(?:context|theme):\s*(?:"*(light|dark|saturated)"*)"#)
        .expect("context declaration pattern is valid")
});

/// The shared base property table.
pub fn properties() -> Vec<PropertyDefinition> {
    vec![
        PropertyDefinition::boolean(UPGRADE_MARKER)
            .title("Upgraded flag")
            .default(true)
            .observer(UPGRADE_OBSERVER),
        PropertyDefinition::string("on")
            .title("Context")
            .description("Describes the visual context (backgrounds).")
            .values(CONTEXT_VALUES)
            .default_with(|host, el| {
                host.context_variable(el)
                    .map_or(PropertyValue::Undefined, PropertyValue::String)
            })
            .observer(ON_OBSERVER),
        PropertyDefinition::string("context")
            .title("Context hook")
            .description("Lets you override the system-set context.")
            .values(CONTEXT_VALUES)
            .observer(CONTEXT_OBSERVER),
        PropertyDefinition::string("oldTheme")
            .attr("hl-theme")
            .values(CONTEXT_VALUES)
            .alias("context"),
        PropertyDefinition::string("_style")
            .title("Custom styles")
            .attr("style")
            .observer(INLINE_STYLE_OBSERVER),
        PropertyDefinition::string("type")
            .title("Component type")
            .values(["container", "content", "combo"]),
    ]
}

/// Observers referenced by [`properties`].
pub fn observers() -> HashMap<String, Observer> {
    let table: [(&str, Observer); 4] = [
        (UPGRADE_OBSERVER, Arc::new(upgrade_marker_changed)),
        (ON_OBSERVER, Arc::new(on_changed)),
        (CONTEXT_OBSERVER, Arc::new(context_changed)),
        (INLINE_STYLE_OBSERVER, Arc::new(inline_style_changed)),
    ];
    table.into_iter().map(|(name, f)| (name.to_string(), f)).collect()
}

fn upgrade_marker_changed(host: &mut Host, el: NodeId, _old: &PropertyValue, _new: &PropertyValue) {
    host.add_class(el, UPGRADED_CLASS).or_warn("could not mark the element as upgraded");
}

fn on_changed(host: &mut Host, el: NodeId, old: &PropertyValue, new: &PropertyValue) {
    if (old.is_truthy() && old != new) || (new.is_truthy() && !old.is_truthy()) {
        host.log(el, "Context update");
        host.context_update(el);
    }
}

fn context_changed(host: &mut Host, el: NodeId, old: &PropertyValue, new: &PropertyValue) {
    let Some(value) = new.as_str().filter(|v| !v.is_empty()) else {
        return;
    };
    if !old.is_truthy() || old != new {
        host.log(el, "Running the context observer");
        host.set_property(el, "on", value).or_warn("could not set the context");
        host.set_css_variable(el, "context", value);
    }
}

fn inline_style_changed(host: &mut Host, el: NodeId, old: &PropertyValue, new: &PropertyValue) {
    if old == new {
        return;
    }
    let Some(style) = new.as_str().filter(|s| !s.is_empty()) else {
        host.reset_context(el, None);
        return;
    };
    host.log(el, format_args!("Style observer activated on {style}"));
    let Some(declared) = CONTEXT_DECLARATION
        .captures(style)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return;
    };
    let on = host.string_property(el, "on");
    let context = host.string_property(el, "context");
    if on.as_deref() != Some(declared.as_str()) && context.is_none() {
        host.set_property(el, "on", declared).or_warn("could not set the context");
    }
}
