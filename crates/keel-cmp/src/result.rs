use crate::change::{Change, ChangeType};
use crate::output::FormatOptions;
use crate::tree::{DiffNode, DiffTree};

/// The outcome of a comparison: an optional diff tree plus the operations
/// that read it.
#[derive(Clone, Debug, Default)]
pub struct Comparison {
    tree: Option<DiffTree>,
}

impl Comparison {
    pub(crate) fn new(tree: Option<DiffTree>) -> Self {
        Self { tree }
    }

    /// The comparison tree, or `None` if both operands were absent (or the
    /// whole comparison was pruned as empty).
    pub fn tree(&self) -> Option<&DiffTree> {
        self.tree.as_ref()
    }

    /// Returns `true` if the compared values differ.
    pub fn has_changes(&self) -> bool {
        self.tree.as_ref().is_some_and(|t| t.root().has_changed())
    }

    /// Changes of the leaf nodes, ignoring intermediate nodes.
    pub fn changes(&self) -> Vec<Change> {
        let mut changes = Vec::new();
        if let Some(tree) = &self.tree {
            leaf_changes(tree, tree.root(), &mut changes);
        }
        changes
    }

    /// The smallest set of changes that explains the diff:
    ///
    /// - `Create`/`Delete` nodes are returned without descending, since all
    ///   descendants share their type;
    /// - `Modify` leaves are returned, `Modify` inner nodes are descended.
    pub fn distinct_changes(&self) -> Vec<Change> {
        let mut changes = Vec::new();
        if let Some(tree) = &self.tree {
            distinct_changes(tree, tree.root(), &mut changes);
        }
        changes
    }

    /// Render the tree in a YAML-like format.
    pub fn to_yaml(&self, options: &FormatOptions) -> String {
        match &self.tree {
            Some(tree) => options.render(tree),
            None => String::new(),
        }
    }
}

fn leaf_changes(tree: &DiffTree, node: &DiffNode, changes: &mut Vec<Change>) {
    if !node.has_changed() {
        return;
    }

    if node.is_leaf() {
        changes.push(node.to_change());
        return;
    }

    for child in tree.children(node) {
        leaf_changes(tree, child, changes);
    }
}

fn distinct_changes(tree: &DiffTree, node: &DiffNode, changes: &mut Vec<Change>) {
    if !node.has_changed() {
        return;
    }

    if node.is_leaf() || matches!(node.change_type(), ChangeType::Create | ChangeType::Delete) {
        changes.push(node.to_change());
        return;
    }

    for child in tree.children(node) {
        distinct_changes(tree, child, changes);
    }
}
