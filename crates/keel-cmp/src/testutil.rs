//! Value builders shared by the unit tests.

use std::collections::BTreeMap;

use crate::value::{Field, Record, Value};

pub(crate) fn s(v: &str) -> Value {
    Value::String(v.to_string())
}

/// A dynamic slot holding `v`; `Absent` becomes an empty slot.
pub(crate) fn slot(v: Value) -> Value {
    match v {
        Value::Absent => Value::Dynamic(None),
        v => Value::dynamic(v),
    }
}

/// A record with a single dynamically typed field named `Value`.
pub(crate) fn wrap(v: Value) -> Value {
    Record::new("Struct")
        .with(Field::from_value("Value", slot(v)))
        .into()
}

pub(crate) fn strings(items: &[&str]) -> Value {
    Value::Seq(items.iter().map(|i| s(i)).collect())
}

pub(crate) fn string_map(entries: &[(&str, &str)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), s(v)))
            .collect(),
    )
}

/// A map whose values are dynamic slots.
pub(crate) fn any_map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), slot(v)))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// A record whose `Id` field is the identity field under the default tag.
pub(crate) fn with_id(id: &str, list: Vec<Value>) -> Value {
    Record::new("Item")
        .with(Field::from_value("Id", s(id)).tag("cmp", ",id"))
        .with(Field::from_value("List", Value::Seq(list)))
        .into()
}
