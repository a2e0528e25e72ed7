//! Value comparator: dispatches on the shape of two values and recursively
//! builds the comparison tree.

use tracing::debug;

use crate::change::ChangeType;
use crate::error::{CmpError, CmpResult};
use crate::options::Options;
use crate::result::Comparison;
use crate::tree::{DiffTree, NodeBuilder};
use crate::value::{Describe, Record, Value, ValueKind, ABSENT};

/// Compare two values with the given options.
///
/// Either operand may be [`Value::Absent`]; comparing two absent values
/// yields an empty [`Comparison`].
///
/// # Errors
///
/// Returns [`CmpError::TypeMismatch`] as soon as two values of different or
/// unsupported shapes meet. No partial tree is returned.
pub fn compare<A, B>(before: &A, after: &B, options: &Options) -> CmpResult<Comparison>
where
    A: Describe + ?Sized,
    B: Describe + ?Sized,
{
    Comparator::new(options.clone()).compare(&before.describe(), &after.describe())
}

/// Recursive comparator holding the comparison options.
#[derive(Clone, Debug, Default)]
pub struct Comparator {
    options: Options,
}

impl Comparator {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compare two already described values.
    pub fn compare(&self, before: &Value, after: &Value) -> CmpResult<Comparison> {
        let root = self.compare_values(before, after)?;
        let tree = root.map(DiffTree::from_builder);

        debug!(
            nodes = tree.as_ref().map_or(0, DiffTree::len),
            changed = tree.as_ref().is_some_and(|t| t.root().has_changed()),
            "comparison finished"
        );

        Ok(Comparison::new(tree))
    }

    pub(crate) fn compare_values(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        if a.is_absent() && b.is_absent() {
            return Ok(None);
        }

        let kind = match (a.kind(), b.kind()) {
            (ValueKind::Invalid, k) | (k, ValueKind::Invalid) => k,
            (ka, kb) if ka == kb => ka,
            (ka, kb) => return Err(CmpError::type_mismatch(ka, kb)),
        };

        match kind {
            k if k.is_scalar() => Ok(self.cmp_scalar(a, b)),
            ValueKind::Pointer => self.cmp_pointer(a, b),
            ValueKind::Dynamic => self.cmp_dynamic(a, b),
            ValueKind::Record => self.cmp_record(a, b),
            ValueKind::Seq => self.cmp_seq(a, b),
            ValueKind::Map => self.cmp_map(a, b),
            _ => Err(CmpError::type_mismatch(a.kind(), b.kind())),
        }
    }

    /// A leaf node, or nothing when empty changes are ignored and both sides
    /// are missing.
    pub(crate) fn new_leaf(
        &self,
        change_type: ChangeType,
        before: Option<Value>,
        after: Option<Value>,
        kind: ValueKind,
    ) -> Option<NodeBuilder> {
        if self.options.ignore_empty_changes && before.is_none() && after.is_none() {
            return None;
        }

        let mut node = NodeBuilder::with_values(before, after, kind);
        node.change_type = change_type;
        Some(node)
    }

    fn cmp_scalar(&self, a: &Value, b: &Value) -> Option<NodeBuilder> {
        let kind = if a.is_absent() { b.kind() } else { a.kind() };

        let change_type = if a.is_absent() {
            ChangeType::Create
        } else if b.is_absent() {
            ChangeType::Delete
        } else if a != b {
            ChangeType::Modify
        } else {
            ChangeType::None
        };

        self.new_leaf(change_type, a.present().cloned(), b.present().cloned(), kind)
    }

    fn cmp_pointer(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        match (a, b) {
            (Value::Absent, Value::Pointer(Some(pb))) => self.compare_values(&ABSENT, pb),
            (Value::Absent, Value::Pointer(None)) => {
                Ok(self.new_leaf(ChangeType::Create, None, None, ValueKind::Pointer))
            }
            (Value::Pointer(Some(pa)), Value::Absent) => self.compare_values(pa, &ABSENT),
            (Value::Pointer(None), Value::Absent) => {
                Ok(self.new_leaf(ChangeType::Delete, None, None, ValueKind::Pointer))
            }
            (Value::Pointer(None), Value::Pointer(None)) => {
                Ok(self.new_leaf(ChangeType::None, None, None, ValueKind::Pointer))
            }
            (Value::Pointer(pa), Value::Pointer(pb)) => {
                let a = pa.as_deref().unwrap_or(&ABSENT);
                let b = pb.as_deref().unwrap_or(&ABSENT);
                self.compare_values(a, b)
            }
            _ => Err(CmpError::type_mismatch(a.kind(), b.kind())),
        }
    }

    fn cmp_dynamic(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        match (a, b) {
            (Value::Absent, Value::Dynamic(inner)) => {
                let after = inner.as_deref().cloned();
                Ok(self.new_leaf(ChangeType::Create, None, after, ValueKind::Dynamic))
            }
            (Value::Dynamic(inner), Value::Absent) => {
                let before = inner.as_deref().cloned();
                Ok(self.new_leaf(ChangeType::Delete, before, None, ValueKind::Dynamic))
            }
            (Value::Dynamic(ia), Value::Dynamic(ib)) => {
                let a = ia.as_deref().unwrap_or(&ABSENT);
                let b = ib.as_deref().unwrap_or(&ABSENT);
                self.compare_values(a, b)
            }
            _ => Err(CmpError::type_mismatch(a.kind(), b.kind())),
        }
    }

    fn cmp_record(&self, a: &Value, b: &Value) -> CmpResult<Option<NodeBuilder>> {
        let populated = self
            .options
            .populate_all_nodes
            .then(|| NodeBuilder::with_values(a.present().cloned(), b.present().cloned(), ValueKind::Record));

        // A missing side is replaced by the zero record of the other side,
        // and the whole subtree is classified accordingly.
        let zero: Record;
        let (ra, rb, forced) = match (a, b) {
            (Value::Record(ra), Value::Record(rb)) => (ra, rb, ChangeType::Any),
            (Value::Absent, Value::Record(rb)) => {
                zero = rb.zeroed();
                (&zero, rb, ChangeType::Create)
            }
            (Value::Record(ra), Value::Absent) => {
                zero = ra.zeroed();
                (ra, &zero, ChangeType::Delete)
            }
            _ => return Err(CmpError::type_mismatch(a.kind(), b.kind())),
        };

        let mut node = populated.unwrap_or_else(|| NodeBuilder::empty(ValueKind::Record));

        for field in ra.exported() {
            let Some(name) = self.options.field_name(field) else {
                continue;
            };

            let bf = rb.field(field.name()).map_or(&ABSENT, |f| f.value());
            let child = self.compare_values(field.value(), bf)?;
            node.add_child(child, name, field.name());
        }

        // A record without children has no fields or only empty ones.
        if self.options.ignore_empty_changes && node.is_leaf() {
            return Ok(None);
        }

        if forced != ChangeType::Any {
            node.set_change_type_of_children(forced);
        }

        Ok(Some(node))
    }
}
