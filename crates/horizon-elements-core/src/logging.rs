//! Logging and debugging facilities for Horizon Elements.
//!
//! This module provides:
//! - Target constants for filtering `tracing` output by subsystem
//! - Debug visualization for element trees, including shadow roots
//! - Performance marks for component renders
//!
//! # Tracing Integration
//!
//! Horizon Elements reports everything through the `tracing` crate. Install a
//! subscriber in the embedding application to see it:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_elements_core=debug,horizon_elements=debug")
//!     .init();
//! ```
//!
//! Per-instance debug chatter (`[hl-tabs#id] ...`) is additionally gated by
//! [`ElementsConfig::debug_log`](crate::ElementsConfig::debug_log); warnings
//! and errors are always emitted.
//!
//! # Debug Visualization
//!
//! ```ignore
//! use horizon_elements_core::logging::ElementTreeDebug;
//!
//! let debug = ElementTreeDebug::new();
//! println!("{}", debug.format_subtree(host.document(), host.document().body()));
//! ```

use std::fmt::Write as FmtWrite;

use crate::dom::{Document, NodeId, NodeKind};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_elements_core";
    /// Class registration and property validation.
    pub const REGISTRY: &str = "horizon_elements_core::registry";
    /// Instance construction, render, connect and disconnect.
    pub const LIFECYCLE: &str = "horizon_elements_core::lifecycle";
    /// Attribute cascade.
    pub const CASCADE: &str = "horizon_elements_core::cascade";
    /// Context propagation.
    pub const CONTEXT: &str = "horizon_elements_core::context";
    /// Element tree and mutation watchers.
    pub const DOM: &str = "horizon_elements_core::dom";
    /// Location and session history.
    pub const HISTORY: &str = "horizon_elements_core::history";
    /// Tab widgets.
    pub const TABS: &str = "horizon_elements::tabs";
    /// Performance marks.
    pub const PERF: &str = "horizon_elements::perf";
}

/// Style options for element tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for element tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show attributes next to element tags.
    pub show_attributes: bool,
    /// Whether to descend into shadow roots.
    pub show_shadow: bool,
    /// Whether to show text nodes.
    pub show_text: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_attributes: true,
            show_shadow: false,
            show_text: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_shadow: true,
            show_text: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output: tags only.
    pub fn minimal() -> Self {
        Self {
            show_attributes: false,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing element trees.
#[derive(Debug, Clone, Default)]
pub struct ElementTreeDebug {
    options: TreeFormatOptions,
}

impl ElementTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format a subtree starting from `root`.
    pub fn format_subtree(&self, document: &Document, root: NodeId) -> String {
        let mut output = String::new();
        self.format_node_into(document, root, 0, true, &mut output);
        output
    }

    fn format_node_into(
        &self,
        document: &Document,
        node: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if let Some(max) = self.options.max_depth
            && depth > max
        {
            return;
        }

        let Some(kind) = document.kind(node) else {
            return;
        };

        let label = match kind {
            NodeKind::Document => "#document".to_string(),
            NodeKind::ShadowRoot { .. } => "#shadow-root".to_string(),
            NodeKind::Text(text) => {
                if !self.options.show_text || text.trim().is_empty() {
                    return;
                }
                format!("\"{}\"", text.trim())
            }
            NodeKind::Element(data) => {
                let mut label = format!("<{}", data.tag());
                if self.options.show_attributes {
                    for attribute in data.attributes() {
                        if attribute.value.is_empty() {
                            let _ = write!(label, " {}", attribute.name);
                        } else {
                            let _ = write!(label, " {}=\"{}\"", attribute.name, attribute.value);
                        }
                    }
                }
                label.push('>');
                label
            }
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&label);
        output.push('\n');

        let mut children: Vec<NodeId> = Vec::new();
        if self.options.show_shadow
            && let Some(shadow) = document.shadow_root(node)
        {
            children.push(shadow);
        }
        children.extend(document.children(node).iter().copied());

        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_node_into(document, child, depth + 1, i + 1 == child_count, output);
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a performance span open until dropped.
///
/// Render passes open one of these when performance tracking is enabled so
/// that the `<mark-id>-rendered` mark covers the whole pass.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span for `mark`.
    pub fn new(operation: &'static str, mark: &str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation, mark = %mark);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// Thin wrappers around the `tracing` macros with the framework target.
#[macro_export]
macro_rules! elements_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_elements_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! elements_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_elements_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! elements_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_elements_core", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        doc.set_attribute(list, "id", "menu").unwrap();
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        let text = doc.create_text("hello");
        doc.append_child(doc.body(), list).unwrap();
        doc.append_child(list, first).unwrap();
        doc.append_child(list, second).unwrap();
        doc.append_child(second, text).unwrap();
        let shadow = doc.attach_shadow(list).unwrap();
        let inner = doc.create_element("slot");
        doc.append_child(shadow, inner).unwrap();
        (doc, list)
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let (doc, list) = sample();
        let output = ElementTreeDebug::new().format_subtree(&doc, list);

        assert!(output.starts_with("<ul id=\"menu\">"));
        assert_eq!(output.matches("<li>").count(), 2);
        assert!(!output.contains("#shadow-root"));
        assert!(!output.contains("hello"));
    }

    #[test]
    fn test_tree_format_detailed_includes_shadow_and_text() {
        let (doc, list) = sample();
        let output =
            ElementTreeDebug::with_options(TreeFormatOptions::detailed()).format_subtree(&doc, list);

        assert!(output.contains("#shadow-root"));
        assert!(output.contains("<slot>"));
        assert!(output.contains("\"hello\""));
    }

    #[test]
    fn test_tree_format_minimal() {
        let (doc, list) = sample();
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        };
        let output = ElementTreeDebug::with_options(options).format_subtree(&doc, list);

        assert!(output.starts_with("<ul>"));
        assert!(output.contains("+-- <li>"));
        assert!(output.contains("`-- <li>"));
    }

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic
        let _span = PerfSpan::new("render", "hl-tabs-abc");
    }
}
