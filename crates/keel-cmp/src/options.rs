use serde::{Deserialize, Serialize};

use crate::value::{Field, Value};

/// Tag consulted when [`Options::tag`] is left empty.
pub const DEFAULT_TAG: &str = "cmp";

/// Tag flag marking the identity field of a collection element.
pub const ID_FLAG: &str = "id";

/// Options that influence how a comparison is executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Primary tag from which field names and flags are derived.
    pub tag: String,
    /// Additional tags checked for field names only. The primary tag always
    /// takes precedence.
    pub extra_name_tags: Vec<String>,
    /// Pair sequence elements strictly by index.
    pub respect_slice_order: bool,
    /// Omit nodes whose before and after values are both missing, and
    /// records that end up without any child.
    pub ignore_empty_changes: bool,
    /// Keep before and after values on intermediate nodes too.
    pub populate_all_nodes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.into(),
            extra_name_tags: Vec::new(),
            respect_slice_order: false,
            ignore_empty_changes: false,
            populate_all_nodes: false,
        }
    }
}

impl Options {
    /// The primary tag, falling back to [`DEFAULT_TAG`] when empty.
    pub fn primary_tag(&self) -> &str {
        if self.tag.is_empty() {
            DEFAULT_TAG
        } else {
            &self.tag
        }
    }

    /// Tags searched for a field's external name, primary tag first.
    pub fn name_tags(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_tag()).chain(self.extra_name_tags.iter().map(String::as_str))
    }

    /// The external name of a field: the first non-empty tag name, or the
    /// declared name. Returns `None` for fields tagged `-`.
    pub fn field_name<'f>(&self, field: &'f Field) -> Option<&'f str> {
        let name = self
            .name_tags()
            .map(|tag| field.tag_name(tag))
            .find(|name| !name.is_empty())
            .unwrap_or(field.name());

        (name != "-").then_some(name)
    }

    /// The identity field of a value, if the value (after dereferencing) is a
    /// record with a field flagged [`ID_FLAG`] under the primary tag.
    pub fn identity_field<'v>(&self, value: &'v Value) -> Option<&'v Field> {
        let tag = self.primary_tag();
        value
            .deep()
            .as_record()?
            .fields()
            .iter()
            .find(|f| f.has_tag_flag(tag, ID_FLAG))
    }
}
