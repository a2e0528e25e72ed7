//! Change classification and the flattened [`Change`] record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::{Value, ValueKind};

/// The type of change detected between two values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Not yet determined; absorbed by any concrete type.
    #[default]
    Any,
    /// No change.
    None,
    /// The value was added.
    Create,
    /// The value was removed.
    Delete,
    /// The value changed, or its children changed in different ways.
    Modify,
}

impl ChangeType {
    pub const ALL: [ChangeType; 5] = [
        ChangeType::Any,
        ChangeType::None,
        ChangeType::Create,
        ChangeType::Delete,
        ChangeType::Modify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::None => "none",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Modify => "modify",
        }
    }

    /// Returns `true` for types that describe an actual change.
    pub fn is_change(self) -> bool {
        !matches!(self, Self::None | Self::Any)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "modify" => Ok(Self::Modify),
            other => Err(format!("unknown change type {other:?}")),
        }
    }
}

/// Flattened view of one diff node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Change {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Path built from external field names.
    pub path: String,
    /// Path built from declared field names.
    pub struct_path: String,
    pub kind: ValueKind,
    pub value_before: Option<Value>,
    pub value_after: Option<Value>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == ValueKind::Record {
            return write!(f, "({}) {}", self.change_type, self.path);
        }

        write!(
            f,
            "({}) {}: {} -> {}",
            self.change_type,
            self.path,
            display_opt(self.value_before.as_ref()),
            display_opt(self.value_after.as_ref()),
        )
    }
}

pub(crate) fn display_opt(value: Option<&Value>) -> String {
    value.map_or_else(|| "<nil>".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_change_types() {
        assert_eq!("".parse::<ChangeType>().unwrap(), ChangeType::Any);
        assert_eq!(" Delete ".parse::<ChangeType>().unwrap(), ChangeType::Delete);
        assert!("rename".parse::<ChangeType>().is_err());
    }

    #[test]
    fn only_concrete_types_are_changes() {
        assert!(!ChangeType::Any.is_change());
        assert!(!ChangeType::None.is_change());
        assert!(ChangeType::Create.is_change());
        assert!(ChangeType::Modify.is_change());
    }

    #[test]
    fn display_of_scalar_and_record_changes() {
        let c = Change {
            change_type: ChangeType::Modify,
            path: "a.b".into(),
            struct_path: "A.B".into(),
            kind: ValueKind::String,
            value_before: Some(Value::String("x".into())),
            value_after: None,
        };
        assert_eq!(c.to_string(), "(modify) a.b: x -> <nil>");

        let c = Change {
            kind: ValueKind::Record,
            change_type: ChangeType::Create,
            ..c
        };
        assert_eq!(c.to_string(), "(create) a.b");
    }
}
