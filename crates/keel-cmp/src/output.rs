//! YAML-like rendering of a comparison tree.

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::change::{display_opt, ChangeType};
use crate::tree::{DiffNode, DiffTree};
use crate::value::Value;

/// Vertical bar separating the change prefix from the content.
const PREFIX_SEPARATOR: &str = "\u{2502}";

/// Options controlling [`crate::Comparison::to_yaml`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Omit unchanged nodes.
    pub show_diff_only: bool,
    /// Emphasize changes with colors.
    pub show_color: bool,
    /// Prefix each line with `+`, `-`, `~` or a blank.
    pub show_change_type_prefix: bool,
}

impl FormatOptions {
    pub(crate) fn render(&self, tree: &DiffTree) -> String {
        let mut lines = Vec::new();
        self.render_node(tree, tree.root(), 0, false, &mut lines);
        lines.join("\n")
    }

    /// Returns `true` if at least one line was written.
    fn render_node(
        &self,
        tree: &DiffTree,
        node: &DiffNode,
        depth: usize,
        list_item: bool,
        lines: &mut Vec<String>,
    ) -> bool {
        // Identity fields stay visible so changed elements can be told apart.
        if self.show_diff_only && !node.has_changed() && !node.is_slice_id() {
            return false;
        }

        let start = lines.len();
        if let Some(line) = self.format_line(node, depth, list_item) {
            lines.push(line);
        }

        // The root does not indent its children.
        let depth = if node.is_root() { depth } else { depth + 1 };

        // The first visible line below a sequence element carries the list
        // marker.
        let mut list_item = node.is_slice_index();
        for key in tree.children_keys_sorted(node) {
            let Some(child) = tree.child(node, key) else {
                continue;
            };

            if self.render_node(tree, child, depth, list_item, lines) {
                list_item = false;
            }
        }

        lines.len() > start
    }

    fn format_line(&self, node: &DiffNode, depth: usize, list_item: bool) -> Option<String> {
        // Inner sequence elements and an inner root have nothing to show.
        if !node.is_leaf() && (node.is_slice_index() || node.is_root()) {
            return None;
        }

        let mut indent = " ".repeat(depth * 2);
        if list_item {
            indent.truncate(indent.len().saturating_sub(2));
            indent.push_str("- ");
        }

        let before = format_value(node.value_before());
        let after = format_value(node.value_after());

        let change_type = node.change_type();
        let mut key = node.key().to_string();
        let mut value = match change_type {
            ChangeType::Create => after,
            ChangeType::Modify => format!("{before} -> {after}"),
            _ => before,
        };

        let mut prefix = match change_type {
            ChangeType::Create => "+",
            ChangeType::Delete => "-",
            ChangeType::Modify => "~",
            _ => " ",
        }
        .to_string();

        if self.show_color {
            match change_type {
                ChangeType::Create => {
                    key = key.bright_green().to_string();
                    value = value.bright_green().to_string();
                    prefix = prefix.bright_green().to_string();
                }
                ChangeType::Delete => {
                    key = key.red().to_string();
                    value = value.red().to_string();
                    prefix = prefix.red().to_string();
                }
                ChangeType::Modify => {
                    value = value.yellow().to_string();
                    prefix = prefix.yellow().to_string();
                }
                _ => {}
            }
        }

        let prefix = if self.show_change_type_prefix {
            format!("{prefix} {PREFIX_SEPARATOR} ")
        } else {
            String::new()
        };

        let line = match (node.is_leaf(), node.is_root()) {
            // Elements of a plain sequence show their value as a list item.
            (true, _) if node.is_slice_index() => format!("{prefix}{indent}- {value}"),
            (true, true) => format!("{prefix}{indent}{value}"),
            (false, false) => format!("{prefix}{indent}{key}:"),
            _ => format!("{prefix}{indent}{key}: {value}"),
        };

        Some(line)
    }
}

/// Strings are quoted; missing values render as `<nil>`.
fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => format!("\"{s}\""),
        other => display_opt(other),
    }
}
