//! Dynamic value model consumed by the comparator.
//!
//! Every operand is first turned into a [`Value`] through the [`Describe`]
//! trait. Records carry their field list together with per-field metadata
//! tags, which is what the comparator uses to resolve external field names,
//! skipped fields and identity fields.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Shared absent value, used wherever a missing operand is needed by
/// reference.
pub(crate) static ABSENT: Value = Value::Absent;

// ---------------------------------------------------------------------------
// ValueKind
// ---------------------------------------------------------------------------

/// The shape of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Invalid,
    Bool,
    Int,
    Uint,
    Float,
    String,
    Pointer,
    Dynamic,
    Record,
    Seq,
    Map,
    Opaque,
}

impl ValueKind {
    /// Returns `true` for kinds compared by plain equality.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Uint | Self::Float | Self::String
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invalid => "invalid",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Pointer => "pointer",
            Self::Dynamic => "dynamic",
            Self::Record => "record",
            Self::Seq => "seq",
            Self::Map => "map",
            Self::Opaque => "opaque",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A comparable value.
///
/// `Absent` stands for "no value at all" (a missing map entry, a `None`
/// operand). It is different from a present but nil [`Value::Pointer`] or
/// [`Value::Dynamic`] slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Absent,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    /// Optional value; `None` is a nil pointer.
    Pointer(Option<Box<Value>>),
    /// Dynamically typed slot; `None` is an empty slot.
    Dynamic(Option<Box<Value>>),
    Record(Record),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A value of a kind that cannot be compared, named by its type.
    Opaque(String),
}

impl Value {
    /// Wrap a value into a non-nil pointer.
    pub fn pointer(value: Value) -> Self {
        Self::Pointer(Some(Box::new(value)))
    }

    /// Wrap a value into a non-empty dynamic slot.
    pub fn dynamic(value: Value) -> Self {
        Self::Dynamic(Some(Box::new(value)))
    }

    /// The shape of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Absent => ValueKind::Invalid,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Uint(_) => ValueKind::Uint,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Pointer(_) => ValueKind::Pointer,
            Self::Dynamic(_) => ValueKind::Dynamic,
            Self::Record(_) => ValueKind::Record,
            Self::Seq(_) => ValueKind::Seq,
            Self::Map(_) => ValueKind::Map,
            Self::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Returns `true` if this is [`Value::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns the record if this value is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Follow pointers and dynamic slots down to the first value that is
    /// neither. Nil pointers and empty slots resolve to `Absent`.
    pub fn deep(&self) -> &Value {
        match self {
            Self::Pointer(Some(v)) | Self::Dynamic(Some(v)) => v.deep(),
            Self::Pointer(None) | Self::Dynamic(None) => &ABSENT,
            other => other,
        }
    }

    /// `Some(self)` unless the value is absent.
    pub fn present(&self) -> Option<&Value> {
        match self {
            Self::Absent => None,
            other => Some(other),
        }
    }

    /// The zero value of the same shape: zeroed record fields, empty
    /// collections, nil pointers and empty slots.
    pub fn zero_like(&self) -> Value {
        match self {
            Self::Absent => Self::Absent,
            Self::Bool(_) => Self::Bool(false),
            Self::Int(_) => Self::Int(0),
            Self::Uint(_) => Self::Uint(0),
            Self::Float(_) => Self::Float(0.0),
            Self::String(_) => Self::String(String::new()),
            Self::Pointer(_) => Self::Pointer(None),
            Self::Dynamic(_) => Self::Dynamic(None),
            Self::Record(r) => Self::Record(r.zeroed()),
            Self::Seq(_) => Self::Seq(Vec::new()),
            Self::Map(_) => Self::Map(BTreeMap::new()),
            Self::Opaque(name) => Self::Opaque(name.clone()),
        }
    }

    /// Convert a JSON document into a value.
    ///
    /// Object members and array items become dynamic slots, mirroring how an
    /// untyped configuration document is decoded; `null` at the top level is
    /// `Absent`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;

        fn slot(json: &Json) -> Value {
            match json {
                Json::Null => Value::Dynamic(None),
                other => Value::dynamic(Value::from_json(other)),
            }
        }

        match json {
            Json::Null => Value::Absent,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Seq(items.iter().map(slot).collect()),
            Json::Object(members) => Value::Map(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), slot(v)))
                    .collect(),
            ),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent | Self::Pointer(None) | Self::Dynamic(None) => f.write_str("<nil>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Uint(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Pointer(Some(v)) | Self::Dynamic(Some(v)) => write!(f, "{v}"),
            Self::Record(r) => {
                f.write_str("{")?;
                for (i, field) in r.exported().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", field.name)?;
                    field.value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: ")?;
                    v.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Self::Opaque(name) => write!(f, "<{name}>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent | Self::Pointer(None) | Self::Dynamic(None) => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Uint(u) => serializer.serialize_u64(*u),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::String(s) => serializer.serialize_str(s),
            Self::Pointer(Some(v)) | Self::Dynamic(Some(v)) => v.serialize(serializer),
            Self::Record(r) => {
                serializer.collect_map(r.exported().map(|f| (f.name.as_str(), &f.value)))
            }
            Self::Seq(items) => serializer.collect_seq(items),
            Self::Map(entries) => serializer.collect_map(entries),
            Self::Opaque(name) => serializer.serialize_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Record / Field
// ---------------------------------------------------------------------------

/// A record value: a named type with an ordered list of fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    type_name: String,
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// The record's type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All fields in declaration order, exported or not.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Exported fields in declaration order.
    pub fn exported(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.exported)
    }

    /// Look up a field by its declared name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The same record with every field set to its zero value.
    pub fn zeroed(&self) -> Record {
        Record {
            type_name: self.type_name.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    value: f.value.zero_like(),
                    ..f.clone()
                })
                .collect(),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

/// A single record field with its metadata tags.
///
/// Tags follow the `name,flag,flag` convention: the part before the first
/// comma is the external name (`-` skips the field), the rest are flags.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    value: Value,
    tags: Vec<(String, String)>,
    exported: bool,
}

impl Field {
    /// Create an exported field from any describable value.
    pub fn new<T: Describe + ?Sized>(name: impl Into<String>, value: &T) -> Self {
        Self::from_value(name, value.describe())
    }

    /// Create an exported field from an already built value.
    pub fn from_value(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            tags: Vec::new(),
            exported: true,
        }
    }

    /// Attach a metadata tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Mark the field as internal; internal fields are never compared.
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// The raw tag value for `key`, or an empty string.
    pub fn lookup_tag(&self, key: &str) -> &str {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// The external name declared under `key` (may be empty).
    pub fn tag_name(&self, key: &str) -> &str {
        self.lookup_tag(key).split(',').next().unwrap_or("")
    }

    /// Returns `true` if the tag under `key` lists `flag` after the name.
    /// Flags are trimmed and compared case-insensitively.
    pub fn has_tag_flag(&self, key: &str, flag: &str) -> bool {
        self.lookup_tag(key)
            .split(',')
            .skip(1)
            .any(|f| f.trim().eq_ignore_ascii_case(flag))
    }
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

/// Conversion of a Rust value into a comparable [`Value`].
///
/// Record types implement this by building a [`Record`]:
///
/// ```rust
/// use keel_cmp::{Describe, Field, Record, Value};
///
/// struct Instance {
///     id: String,
///     ip: Option<String>,
/// }
///
/// impl Describe for Instance {
///     fn describe(&self) -> Value {
///         Record::new("Instance")
///             .with(Field::new("Id", &self.id).tag("cmp", "id,id"))
///             .with(Field::new("Ip", &self.ip).tag("cmp", "ip"))
///             .into()
///     }
/// }
/// ```
pub trait Describe {
    fn describe(&self) -> Value;
}

impl Describe for Value {
    fn describe(&self) -> Value {
        self.clone()
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe(&self) -> Value {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe(&self) -> Value {
        (**self).describe()
    }
}

impl Describe for bool {
    fn describe(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! describe_as {
    ($variant:ident($target:ty): $($t:ty),*) => {
        $(
            impl Describe for $t {
                fn describe(&self) -> Value {
                    Value::$variant(*self as $target)
                }
            }
        )*
    };
}

describe_as!(Int(i64): i8, i16, i32, i64, isize);
describe_as!(Uint(u64): u8, u16, u32, u64, usize);
describe_as!(Float(f64): f32, f64);

impl Describe for str {
    fn describe(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl Describe for String {
    fn describe(&self) -> Value {
        Value::String(self.clone())
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Value {
        Value::Pointer(self.as_ref().map(|v| Box::new(v.describe())))
    }
}

impl<T: Describe> Describe for [T] {
    fn describe(&self) -> Value {
        Value::Seq(self.iter().map(Describe::describe).collect())
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe(&self) -> Value {
        self.as_slice().describe()
    }
}

impl<K: fmt::Display, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.describe()))
                .collect(),
        )
    }
}

impl<K: fmt::Display, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.describe()))
                .collect(),
        )
    }
}

impl Describe for serde_json::Value {
    fn describe(&self) -> Value {
        Value::from_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_tag_name_and_flags() {
        let f = Field::new("Id", "a").tag("cmp", "id, ID ").tag("yaml", "ident");
        assert_eq!(f.tag_name("cmp"), "id");
        assert_eq!(f.tag_name("yaml"), "ident");
        assert_eq!(f.tag_name("json"), "");
        assert!(f.has_tag_flag("cmp", "id"));
        assert!(!f.has_tag_flag("yaml", "id"));
    }

    #[test]
    fn name_only_tag_has_no_flags() {
        let f = Field::new("Id", "a").tag("cmp", "id");
        assert!(!f.has_tag_flag("cmp", "id"));
    }

    #[test]
    fn zeroed_record_keeps_shape() {
        let r = Record::new("T")
            .with(Field::new("A", "x"))
            .with(Field::new("B", &Some(3_i32)))
            .with(Field::new("C", &vec![1_u8, 2]));
        let z = r.zeroed();
        assert_eq!(z.type_name(), "T");
        assert_eq!(z.field("A").unwrap().value(), &Value::String(String::new()));
        assert_eq!(z.field("B").unwrap().value(), &Value::Pointer(None));
        assert_eq!(z.field("C").unwrap().value(), &Value::Seq(vec![]));
    }

    #[test]
    fn deep_follows_pointers_and_slots() {
        let v = Value::pointer(Value::dynamic(Value::Int(4)));
        assert_eq!(v.deep(), &Value::Int(4));
        assert!(Value::Pointer(None).deep().is_absent());
    }

    #[test]
    fn json_objects_become_dynamic_maps() {
        let json = serde_json::json!({"a": 1, "b": [true, null], "c": 1.5});
        let v = Value::from_json(&json);
        let Value::Map(entries) = v else {
            panic!("expected a map");
        };
        assert_eq!(entries["a"], Value::dynamic(Value::Int(1)));
        assert_eq!(entries["c"], Value::dynamic(Value::Float(1.5)));
        assert_eq!(
            entries["b"],
            Value::dynamic(Value::Seq(vec![
                Value::dynamic(Value::Bool(true)),
                Value::Dynamic(None),
            ]))
        );
    }

    #[test]
    fn display_renders_composites() {
        let r = Record::new("T")
            .with(Field::new("Name", "n"))
            .with(Field::new("Secret", "s").private())
            .with(Field::new("Tags", &vec!["x".to_string()]));
        assert_eq!(Value::from(r).to_string(), r#"{Name: "n", Tags: ["x"]}"#);
        assert_eq!(Value::Pointer(None).to_string(), "<nil>");
        assert_eq!(Some(2_u8).describe().to_string(), "2");
    }

    #[test]
    fn serializes_like_plain_data() {
        let r = Record::new("T")
            .with(Field::new("Name", "n"))
            .with(Field::new("Port", &Some(80_u16)));
        let json = serde_json::to_value(Value::from(r)).unwrap();
        assert_eq!(json, serde_json::json!({"Name": "n", "Port": 80}));
    }
}
