//! Sequence and map comparison.
//!
//! Both collections are reduced to a list of [`Pair`]s: the element found on
//! the before side and the element found on the after side under the same
//! key. For maps the key is the map key; for sequences it is either the
//! element's identity value or its index.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::change::ChangeType;
use crate::compare::Comparator;
use crate::error::{CmpError, CmpResult};
use crate::tree::NodeBuilder;
use crate::value::{Value, ValueKind, ABSENT};

#[derive(Debug)]
struct Pair<'v> {
    key: String,
    a: &'v Value,
    b: &'v Value,
}

#[derive(Debug)]
struct Pairs<'v> {
    pairs: Vec<Pair<'v>>,
    index: HashMap<String, usize>,
    kind: ValueKind,
    /// Elements were paired by their identity field.
    by_identity: bool,
    /// Initial change type of the collection node.
    change_type: ChangeType,
}

impl<'v> Pairs<'v> {
    fn new(kind: ValueKind) -> Self {
        Self {
            pairs: Vec::new(),
            index: HashMap::new(),
            kind,
            by_identity: false,
            change_type: ChangeType::Any,
        }
    }

    fn get_or_create(&mut self, key: String) -> &mut Pair<'v> {
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.index.insert(key.clone(), self.pairs.len());
                self.pairs.push(Pair {
                    key,
                    a: &ABSENT,
                    b: &ABSENT,
                });
                self.pairs.len() - 1
            }
        };
        &mut self.pairs[i]
    }

    fn add_a(&mut self, key: impl ToString, v: &'v Value) {
        self.get_or_create(key.to_string()).a = v;
    }

    fn add_b(&mut self, key: impl ToString, v: &'v Value) {
        self.get_or_create(key.to_string()).b = v;
    }

    fn add(&mut self, side: ChangeType, key: impl ToString, v: &'v Value) {
        match side {
            ChangeType::Create => self.add_b(key, v),
            _ => self.add_a(key, v),
        }
    }

    /// Rebuild the collection values on both sides from the pairs.
    fn values(&self) -> (Value, Value) {
        match self.kind {
            ValueKind::Map => {
                let side = |pick: fn(&Pair<'v>) -> &'v Value| {
                    let entries: BTreeMap<String, Value> = self
                        .pairs
                        .iter()
                        .filter_map(|p| pick(p).present().map(|v| (p.key.clone(), v.clone())))
                        .collect();
                    Value::Map(entries)
                };
                (side(|p| p.a), side(|p| p.b))
            }
            _ => {
                let side = |pick: fn(&Pair<'v>) -> &'v Value| {
                    Value::Seq(
                        self.pairs
                            .iter()
                            .filter_map(|p| pick(p).present().cloned())
                            .collect(),
                    )
                };
                (side(|p| p.a), side(|p| p.b))
            }
        }
    }
}

/// Classify a collection compared against a missing value. The missing
/// side of a populated node is cleared.
fn to_absent(mut node: NodeBuilder, t: ChangeType) -> NodeBuilder {
    match t {
        ChangeType::Create => node.value_before = None,
        _ => node.value_after = None,
    }
    node.set_change_type_of_children(t);
    node
}

/// Claim the first element of `s` equal to `x` that is not matched yet.
fn claim(s: &[Value], x: &Value, matched: &mut [bool]) -> bool {
    for (i, si) in s.iter().enumerate() {
        if !matched[i] && si == x {
            matched[i] = true;
            return true;
        }
    }
    false
}

impl Comparator {
    pub(crate) fn cmp_seq(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        match (a, b) {
            (Value::Absent, Value::Seq(vb)) => self.cmp_seq_to_absent(ChangeType::Create, vb),
            (Value::Seq(va), Value::Absent) => self.cmp_seq_to_absent(ChangeType::Delete, va),
            (Value::Seq(va), Value::Seq(vb)) => {
                if self.comparable_by_identity(va, vb) {
                    self.cmp_seq_by_identity(va, vb)
                } else {
                    self.cmp_seq_by_index(va, vb)
                }
            }
            _ => Err(CmpError::type_mismatch(a.kind(), b.kind())),
        }
    }

    /// Elements are compared by identity if the first element of either
    /// sequence is a record with an identity field.
    fn comparable_by_identity(&self, a: &[Value], b: &[Value]) -> bool {
        [a.first(), b.first()]
            .into_iter()
            .flatten()
            .any(|v| self.options().identity_field(v).is_some())
    }

    fn identity_key(&self, v: &Value) -> Option<String> {
        self.options()
            .identity_field(v)
            .map(|f| f.value().deep().to_string())
    }

    fn cmp_seq_by_index<'v>(&self, a: &'v [Value], b: &'v [Value]) -> CmpResult<Option<NodeBuilder>> {
        let respect_order = self.options().respect_slice_order;
        let mut pairs = Pairs::new(ValueKind::Seq);

        let mut matched = vec![false; b.len()];
        for (i, ai) in a.iter().enumerate() {
            let paired = if respect_order {
                b.get(i) == Some(ai)
            } else {
                claim(b, ai, &mut matched)
            };

            pairs.add_a(i, ai);
            if paired {
                pairs.add_b(i, ai);
            }
        }

        let mut matched = vec![false; a.len()];
        let mut last_index = a.len();
        for (i, bi) in b.iter().enumerate() {
            if respect_order {
                if a.get(i) != Some(bi) {
                    pairs.add_b(i, bi);
                }
            } else if !claim(a, bi, &mut matched) {
                // Unmatched elements are appended past the end of `a`.
                pairs.add_b(last_index, bi);
                last_index += 1;
            }
        }

        self.cmp_pairs(pairs)
    }

    fn cmp_seq_by_identity<'v>(&self, a: &'v [Value], b: &'v [Value]) -> CmpResult<Option<NodeBuilder>> {
        let mut pairs = Pairs::new(ValueKind::Seq);
        pairs.by_identity = true;

        for ai in a {
            if let Some(id) = self.identity_key(ai) {
                pairs.add_a(id, ai);
            }
        }

        for bi in b {
            if let Some(id) = self.identity_key(bi) {
                pairs.add_b(id, bi);
            }
        }

        self.cmp_pairs(pairs)
    }

    fn cmp_seq_to_absent(&self, t: ChangeType, v: &[Value]) -> CmpResult<Option<NodeBuilder>> {
        let mut pairs = Pairs::new(ValueKind::Seq);

        for (i, vi) in v.iter().enumerate() {
            match self.identity_key(vi) {
                Some(id) => {
                    pairs.by_identity = true;
                    pairs.add(t, id, vi);
                }
                None => pairs.add(t, i, vi),
            }
        }

        let node = self.cmp_pairs(pairs)?;
        Ok(node.map(|n| to_absent(n, t)))
    }

    pub(crate) fn cmp_map(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        match (a, b) {
            (Value::Absent, Value::Map(mb)) => self.cmp_map_to_absent(ChangeType::Create, mb),
            (Value::Map(ma), Value::Absent) => self.cmp_map_to_absent(ChangeType::Delete, ma),
            (Value::Map(ma), Value::Map(mb)) => {
                // Both maps exist, so the map itself is at least unchanged.
                let mut pairs = Pairs::new(ValueKind::Map);
                pairs.change_type = ChangeType::None;

                for (k, v) in ma {
                    pairs.add_a(k, v);
                }
                for (k, v) in mb {
                    pairs.add_b(k, v);
                }

                self.cmp_pairs(pairs)
            }
            _ => Err(CmpError::type_mismatch(a.kind(), b.kind())),
        }
    }

    fn cmp_map_to_absent(
        &self,
        t: ChangeType,
        m: &BTreeMap<String, Value>,
    ) -> CmpResult<Option<NodeBuilder>> {
        let mut pairs = Pairs::new(ValueKind::Map);
        for (k, v) in m {
            pairs.add(t, k, v);
        }

        let node = self.cmp_pairs(pairs)?;
        Ok(node.map(|n| to_absent(n, t)))
    }

    fn cmp_pairs(&self, pairs: Pairs<'_>) -> CmpResult<Option<NodeBuilder>> {
        if self.options().ignore_empty_changes && pairs.pairs.is_empty() {
            return Ok(None);
        }

        let mut node = NodeBuilder::empty(pairs.kind);
        node.change_type = pairs.change_type;

        if self.options().populate_all_nodes {
            let (before, after) = pairs.values();
            node.value_before = Some(before);
            node.value_after = Some(after);
        }

        for pair in &pairs.pairs {
            let mut child = self.compare_values(pair.a, pair.b)?;

            if pairs.by_identity {
                if let Some(c) = child.as_mut() {
                    self.mark_identity(pair, c);
                }
            }

            node.add_child(child, &pair.key, &pair.key);
        }

        debug!(
            kind = %pairs.kind,
            pairs = pairs.pairs.len(),
            by_identity = pairs.by_identity,
            change = %node.change_type,
            "collection compared"
        );

        Ok(Some(node))
    }

    /// Flag the child holding the element's identity field so that it stays
    /// visible in diff-only output.
    fn mark_identity(&self, pair: &Pair<'_>, element: &mut NodeBuilder) {
        let source = if pair.a.is_absent() { pair.b } else { pair.a };
        let Some(field) = self.options().identity_field(source) else {
            return;
        };

        if let Some(c) = element
            .children
            .iter_mut()
            .find(|c| c.struct_key == field.name())
        {
            c.is_slice_id = true;
        }
    }
}
