//! Logging and debugging facilities for viewtree.
//!
//! This module provides:
//! - Target names for filtering the `tracing` output of each subsystem
//! - Debug visualization of view trees
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! viewtree uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("viewtree_core::dispatch=trace,viewtree=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Use [`ViewTreeDebug`] to print the views of a collection:
//!
//! ```ignore
//! use viewtree_core::logging::ViewTreeDebug;
//!
//! let output = list.with_tree(|tree| ViewTreeDebug::new().format_tree(tree));
//! println!("{output}");
//! ```

use std::fmt::Write as FmtWrite;

use crate::node::{NodeId, ViewKind, ViewTree};

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core engine target.
    pub const CORE: &str = "viewtree_core";
    /// Root data: base replacement, validators, persistence.
    pub const ROOT: &str = "viewtree_core::root";
    /// View nodes: derivation of local bases, view lifetime.
    pub const NODE: &str = "viewtree_core::node";
    /// Two-phase modification dispatch.
    pub const DISPATCH: &str = "viewtree_core::dispatch";
    /// List containers.
    pub const LIST: &str = "viewtree::list";
    /// Set containers.
    pub const SET: &str = "viewtree::set";
    /// Map containers.
    pub const MAP: &str = "viewtree::map";
    /// Performance spans.
    pub const PERF: &str = "viewtree::perf";
}

/// Style options for view tree visualization.
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

/// Configuration for view tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node IDs.
    pub show_ids: bool,
    /// Whether to show whether the local base is fresh, and handle counts.
    pub show_state: bool,
    /// Whether to show listener counts.
    pub show_listeners: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_state: true,
            show_listeners: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_listeners: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_state: false,
            show_listeners: false,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing the views of one collection.
#[derive(Debug, Clone, Default)]
pub struct ViewTreeDebug {
    options: TreeFormatOptions,
}

impl ViewTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree, starting at the root.
    pub fn format_tree<K: ViewKind>(&self, tree: &ViewTree<K>) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "View Tree ({} views, mod count {}):",
            tree.node_count(),
            tree.data().mod_count()
        )
        .expect("write to String");
        self.format_subtree_into(tree, tree.root(), 0, true, &mut output);
        output
    }

    /// Format the subtree below one view.
    pub fn format_subtree<K: ViewKind>(&self, tree: &ViewTree<K>, id: NodeId) -> String {
        let mut output = String::new();
        self.format_subtree_into(tree, id, 0, true, &mut output);
        output
    }

    fn format_subtree_into<K: ViewKind>(
        &self,
        tree: &ViewTree<K>,
        id: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Ok(info) = tree.view_info(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        match info {
            Some(info) => write!(output, "{info:?}").expect("write to String"),
            None => output.push_str("root"),
        }

        if self.options.show_ids {
            write!(output, " [{id:?}]").expect("write to String");
        }
        if self.options.show_state {
            let freshness = if tree.is_fresh(id) { "fresh" } else { "stale" };
            write!(output, " ({freshness}, handles: {}", tree.handle_count(id)).expect("write to String");
            if tree.is_cached(id) {
                output.push_str(", cached");
            }
            output.push(')');
        }
        if self.options.show_listeners {
            if let Ok(count) = tree.listener_count(id) {
                write!(output, " listeners: {count}").expect("write to String");
            }
        }
        output.push('\n');

        let children = tree.children(id).map(<[NodeId]>::to_vec).unwrap_or_default();
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(tree, child, depth + 1, i == child_count - 1, output);
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
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
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// Useful for timing bulk operations such as `extend` or `retain`.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::{tree_of, Window};

    #[test]
    fn test_tree_format_root_only() {
        let tree = tree_of(&[1, 2]);
        let output = ViewTreeDebug::new().format_tree(&tree);
        assert!(output.contains("View Tree (1 views"));
        assert!(output.contains("root"));
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let mut tree = tree_of(&[1, 2, 3]);
        let root = tree.root();
        let outer = tree.add_view(root, Window::Slice { from: 0, to: 2 }).unwrap();
        tree.add_view(outer, Window::Whole).unwrap();
        tree.cached_view(root, Window::Whole).unwrap();

        let output = ViewTreeDebug::new().format_tree(&tree);
        assert!(output.contains("Slice { from: 0, to: 2 }"));
        assert!(output.contains("\u{2514}\u{2500}\u{2500} Whole"));
        assert!(output.contains("cached"));
        assert!(output.contains("fresh"));
    }

    #[test]
    fn test_tree_format_minimal() {
        let mut tree = tree_of(&[1]);
        let view = tree.add_view(tree.root(), Window::Whole).unwrap();

        let debug = ViewTreeDebug::with_options(TreeFormatOptions::minimal());
        let output = debug.format_subtree(&tree, view);
        assert_eq!(output, "Whole\n");
    }

    #[test]
    fn test_tree_format_max_depth() {
        let mut tree = tree_of(&[1]);
        let root = tree.root();
        let child = tree.add_view(root, Window::Whole).unwrap();
        tree.add_view(child, Window::Slice { from: 0, to: 1 }).unwrap();

        let options = TreeFormatOptions {
            max_depth: Some(1),
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        };
        let output = ViewTreeDebug::with_options(options).format_tree(&tree);
        assert!(output.contains("`-- Whole"));
        assert!(!output.contains("Slice"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }
}
