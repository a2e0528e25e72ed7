//! The comparison tree.
//!
//! The comparator assembles an owned [`NodeBuilder`] hierarchy bottom-up;
//! once the comparison is complete it is frozen into a [`DiffTree`], an arena
//! of [`DiffNode`]s addressed by [`NodeId`] with parent and child indices.
//!
//! # Invariants
//!
//! - The root is always `NodeId(0)`; nodes are stored in pre-order.
//! - A node's change type is `None`/`Any` iff no descendant changed.
//! - `Create`/`Delete` on a node implies every descendant has the same type.

use serde::Serialize;

use crate::change::{Change, ChangeType};
use crate::value::{Value, ValueKind};

/// Separator between path segments.
pub const PATH_SEPARATOR: &str = ".";

// ---------------------------------------------------------------------------
// NodeBuilder
// ---------------------------------------------------------------------------

/// Mutable node used while the comparison is running.
#[derive(Clone, Debug)]
pub(crate) struct NodeBuilder {
    pub(crate) change_type: ChangeType,
    pub(crate) kind: ValueKind,
    pub(crate) value_before: Option<Value>,
    pub(crate) value_after: Option<Value>,
    pub(crate) key: String,
    pub(crate) struct_key: String,
    pub(crate) is_slice_id: bool,
    pub(crate) children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    pub(crate) fn empty(kind: ValueKind) -> Self {
        Self {
            change_type: ChangeType::Any,
            kind,
            value_before: None,
            value_after: None,
            key: String::new(),
            struct_key: String::new(),
            is_slice_id: false,
            children: Vec::new(),
        }
    }

    /// A node holding both values. The kind is taken from whichever value is
    /// present, preferring `before`.
    pub(crate) fn with_values(before: Option<Value>, after: Option<Value>, fallback: ValueKind) -> Self {
        let kind = before
            .as_ref()
            .or(after.as_ref())
            .map_or(fallback, Value::kind);

        Self {
            value_before: before,
            value_after: after,
            ..Self::empty(kind)
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Attach a child under the given keys and absorb its change type.
    pub(crate) fn add_child(&mut self, child: Option<NodeBuilder>, key: &str, struct_key: &str) {
        let Some(mut child) = child else {
            return;
        };

        child.key = key.to_owned();
        child.struct_key = struct_key.to_owned();
        self.set_change_type(child.change_type);
        self.children.push(child);
    }

    /// `Any` is ignored; the first concrete type is adopted; a differing
    /// second type turns the node into `Modify`.
    pub(crate) fn set_change_type(&mut self, t: ChangeType) {
        if t == ChangeType::Any {
            return;
        }

        if self.change_type == ChangeType::Any {
            self.change_type = t;
        }

        if self.change_type != t {
            self.change_type = ChangeType::Modify;
        }
    }

    /// Force `t` onto this node and every descendant.
    pub(crate) fn set_change_type_of_children(&mut self, t: ChangeType) {
        self.change_type = t;
        for child in &mut self.children {
            child.set_change_type_of_children(t);
        }
    }
}

// ---------------------------------------------------------------------------
// DiffTree
// ---------------------------------------------------------------------------

/// Index of a node inside a [`DiffTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// One node of a frozen comparison tree.
#[derive(Clone, Debug)]
pub struct DiffNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    change_type: ChangeType,
    kind: ValueKind,
    value_before: Option<Value>,
    value_after: Option<Value>,
    key: String,
    struct_key: String,
    path: String,
    struct_path: String,
    is_slice_id: bool,
    is_slice_index: bool,
}

impl DiffNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children_ids(&self) -> &[NodeId] {
        &self.children
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value_before(&self) -> Option<&Value> {
        self.value_before.as_ref()
    }

    pub fn value_after(&self) -> Option<&Value> {
        self.value_after.as_ref()
    }

    /// External name of the edge from the parent; empty for the root.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared name of the edge from the parent; empty for the root.
    pub fn struct_key(&self) -> &str {
        &self.struct_key
    }

    /// Dot separated external path. The root contributes no segment.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dot separated declared-name path.
    pub fn struct_path(&self) -> &str {
        &self.struct_path
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if the node itself or any descendant changed.
    pub fn has_changed(&self) -> bool {
        self.change_type.is_change()
    }

    /// Identity field of a collection element matched by identity.
    pub fn is_slice_id(&self) -> bool {
        self.is_slice_id
    }

    /// Returns `true` if the parent is a sequence.
    pub fn is_slice_index(&self) -> bool {
        self.is_slice_index
    }

    pub fn to_change(&self) -> Change {
        Change {
            change_type: self.change_type,
            path: self.path.clone(),
            struct_path: self.struct_path.clone(),
            kind: self.kind,
            value_before: self.value_before.clone(),
            value_after: self.value_after.clone(),
        }
    }
}

/// A frozen comparison tree.
#[derive(Clone, Debug)]
pub struct DiffTree {
    nodes: Vec<DiffNode>,
}

impl DiffTree {
    pub(crate) fn from_builder(root: NodeBuilder) -> Self {
        let mut tree = DiffTree { nodes: Vec::new() };
        tree.push(root, None);
        tree
    }

    fn push(&mut self, builder: NodeBuilder, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());

        let (path, struct_path, is_slice_index) = match parent {
            None => (String::new(), String::new(), false),
            Some(pid) => {
                let p = &self.nodes[pid.0];
                if p.is_root() {
                    (builder.key.clone(), builder.struct_key.clone(), p.kind == ValueKind::Seq)
                } else {
                    (
                        format!("{}{PATH_SEPARATOR}{}", p.path, builder.key),
                        format!("{}{PATH_SEPARATOR}{}", p.struct_path, builder.struct_key),
                        p.kind == ValueKind::Seq,
                    )
                }
            }
        };

        self.nodes.push(DiffNode {
            id,
            parent,
            children: Vec::with_capacity(builder.children.len()),
            change_type: builder.change_type,
            kind: builder.kind,
            value_before: builder.value_before,
            value_after: builder.value_after,
            key: builder.key,
            struct_key: builder.struct_key,
            path,
            struct_path,
            is_slice_id: builder.is_slice_id,
            is_slice_index,
        });

        for child in builder.children {
            let child_id = self.push(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    /// The root node.
    pub fn root(&self) -> &DiffNode {
        &self.nodes[0]
    }

    /// Look up a node. Ids handed out by this tree are always valid.
    pub fn node(&self, id: NodeId) -> &DiffNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&DiffNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &DiffNode> {
        self.nodes.iter()
    }

    pub fn parent(&self, node: &DiffNode) -> Option<&DiffNode> {
        node.parent.map(|id| self.node(id))
    }

    pub fn children<'a>(&'a self, node: &'a DiffNode) -> impl Iterator<Item = &'a DiffNode> + 'a {
        node.children.iter().map(move |id| self.node(*id))
    }

    /// The first child with the given external key.
    pub fn child<'a>(&'a self, node: &'a DiffNode, key: &str) -> Option<&'a DiffNode> {
        self.children(node).find(|c| c.key == key)
    }

    /// Keys of the node's children in lexicographic order.
    pub fn children_keys_sorted<'a>(&'a self, node: &'a DiffNode) -> Vec<&'a str> {
        let mut keys: Vec<&str> = self.children(node).map(DiffNode::key).collect();
        keys.sort_unstable();
        keys
    }

    /// Walk up from `node` (inclusive) to the first node whose path equals
    /// `path`.
    pub fn parent_by_path<'a>(&'a self, node: &'a DiffNode, path: &str) -> Option<&'a DiffNode> {
        let mut current = Some(node);
        while let Some(n) = current {
            if n.path == path {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Find a node by its external path.
    pub fn find(&self, path: &str) -> Option<&DiffNode> {
        self.nodes.iter().find(|n| n.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(t: ChangeType) -> Option<NodeBuilder> {
        let mut n = NodeBuilder::with_values(Some(Value::Int(1)), Some(Value::Int(2)), ValueKind::Int);
        n.change_type = t;
        Some(n)
    }

    #[test]
    fn first_concrete_type_is_adopted() {
        let mut n = NodeBuilder::empty(ValueKind::Map);
        n.add_child(leaf(ChangeType::Any), "a", "a");
        assert_eq!(n.change_type, ChangeType::Any);
        n.add_child(leaf(ChangeType::Create), "b", "b");
        assert_eq!(n.change_type, ChangeType::Create);
        n.add_child(leaf(ChangeType::Create), "c", "c");
        assert_eq!(n.change_type, ChangeType::Create);
    }

    #[test]
    fn mixed_types_become_modify() {
        let mut n = NodeBuilder::empty(ValueKind::Map);
        n.add_child(leaf(ChangeType::None), "a", "a");
        n.add_child(leaf(ChangeType::Delete), "b", "b");
        assert_eq!(n.change_type, ChangeType::Modify);
    }

    #[test]
    fn missing_child_is_ignored() {
        let mut n = NodeBuilder::empty(ValueKind::Map);
        n.add_child(None, "a", "a");
        assert!(n.is_leaf());
        assert_eq!(n.change_type, ChangeType::Any);
    }

    #[test]
    fn forced_type_reaches_all_descendants() {
        let mut inner = NodeBuilder::empty(ValueKind::Record);
        inner.add_child(leaf(ChangeType::None), "x", "X");
        let mut root = NodeBuilder::empty(ValueKind::Record);
        root.add_child(Some(inner), "a", "A");
        root.set_change_type_of_children(ChangeType::Delete);

        let tree = DiffTree::from_builder(root);
        assert!(tree.iter().all(|n| n.change_type() == ChangeType::Delete));
    }

    #[test]
    fn paths_skip_the_root() {
        let mut inner = NodeBuilder::empty(ValueKind::Record);
        inner.add_child(leaf(ChangeType::Modify), "ip", "Ip");
        let mut root = NodeBuilder::empty(ValueKind::Record);
        root.add_child(Some(inner), "node", "Node");

        let tree = DiffTree::from_builder(root);
        let ip = tree.find("node.ip").unwrap();
        assert_eq!(ip.struct_path(), "Node.Ip");
        assert_eq!(tree.root().path(), "");
        assert!(tree.root().is_root());
        assert!(ip.is_leaf());

        let node = tree.parent_by_path(ip, "node").unwrap();
        assert_eq!(node.key(), "node");
        assert!(tree.parent_by_path(ip, "missing").is_none());
        assert_eq!(tree.parent_by_path(ip, "node.ip").unwrap().id(), ip.id());
    }

    #[test]
    fn child_lookup_walks_down_by_key() {
        let mut inner = NodeBuilder::empty(ValueKind::Record);
        inner.add_child(leaf(ChangeType::Modify), "ip", "Ip");
        let mut root = NodeBuilder::empty(ValueKind::Record);
        root.add_child(Some(inner), "node", "Node");
        let tree = DiffTree::from_builder(root);

        let ip = {
            let key = String::from("node");
            let node = tree.child(tree.root(), &key).unwrap();
            tree.child(node, "ip").unwrap()
        };
        assert_eq!(ip.path(), "node.ip");
        assert!(tree.child(tree.root(), "ip").is_none());
    }

    #[test]
    fn children_keys_sort_lexicographically() {
        let mut root = NodeBuilder::empty(ValueKind::Seq);
        for key in ["2", "10", "1"] {
            root.add_child(leaf(ChangeType::None), key, key);
        }
        let tree = DiffTree::from_builder(root);
        assert_eq!(tree.children_keys_sorted(tree.root()), vec!["1", "10", "2"]);
        assert!(tree.child(tree.root(), "10").unwrap().is_slice_index());
    }
}
