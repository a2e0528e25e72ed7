//! Rules: a path pattern, the change type it observes, and a priority.

use std::fmt;
use std::str::FromStr;

use keel_cmp::ChangeType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::path::RulePath;

// ---------------------------------------------------------------------------
// RuleType
// ---------------------------------------------------------------------------

/// Priority of a rule. Higher values take precedence when two rules match a
/// change equally well.
///
/// Any `u8` is accepted; [`RuleType::normalize`] maps it to the closest
/// named tier at or below it. [`RuleType::IGNORE`] is the highest priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleType(pub u8);

impl RuleType {
    /// Safe change, applied without confirmation.
    pub const ALLOW: Self = Self(0);
    /// Potentially dangerous change that needs user confirmation.
    pub const WARN: Self = Self(100);
    /// Change that must block the operation.
    pub const ERROR: Self = Self(200);
    /// Change that is deliberately disregarded.
    pub const IGNORE: Self = Self(255);

    pub const TIERS: [RuleType; 4] = [Self::ALLOW, Self::WARN, Self::ERROR, Self::IGNORE];

    pub fn priority(self) -> u8 {
        self.0
    }

    pub fn normalize(self) -> Self {
        match self.0 {
            255 => Self::IGNORE,
            p if p >= Self::ERROR.0 => Self::ERROR,
            p if p >= Self::WARN.0 => Self::WARN,
            _ => Self::ALLOW,
        }
    }

    /// Name of the normalized tier.
    pub fn tier_name(self) -> &'static str {
        match self.normalize() {
            Self::IGNORE => "Ignore",
            Self::ERROR => "Error",
            Self::WARN => "Warn",
            _ => "Allow",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tier_name())
    }
}

impl FromStr for RuleType {
    type Err = ValidationError;

    /// Accepts a tier name (case-insensitive) or a numeric priority.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(p) = s.parse::<u8>() {
            return Ok(Self(p));
        }

        Self::TIERS
            .into_iter()
            .find(|t| t.tier_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::new(format!("unknown rule type {s:?}")))
    }
}

/// Tiers serialize by name, other priorities as numbers.
impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.normalize() == *self {
            serializer.serialize_str(&self.tier_name().to_ascii_lowercase())
        } else {
            serializer.serialize_u8(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Priority(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Priority(p) => Ok(Self(p)),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Follow-up action tagged on a rule, used to pick events out for further
/// processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ScaleUp,
    ScaleDown,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScaleUp => "scale_up",
            Self::ScaleDown => "scale_down",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Conditions under which a change produces an event.
///
/// ```
/// use keel_cmp::ChangeType;
/// use keel_event::{ActionType, Rule, RuleType};
///
/// let rule = Rule::new(RuleType::ALLOW, "cluster.nodes.worker.instances.@")
///     .on(ChangeType::Delete)
///     .with_action(ActionType::ScaleDown);
///
/// assert!(rule.validate().is_ok());
/// assert!(rule.is_of_type(RuleType::ALLOW));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type", default)]
    pub rule_type: RuleType,
    #[serde(rename = "path")]
    pub match_path: RulePath,
    /// `Any` matches every change type.
    #[serde(rename = "change", default)]
    pub match_change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Rule {
    pub fn new(rule_type: RuleType, path: &str) -> Self {
        Self {
            rule_type,
            match_path: RulePath::new(path),
            ..Default::default()
        }
    }

    /// Restrict the rule to one change type.
    pub fn on(mut self, change_type: ChangeType) -> Self {
        self.match_change_type = change_type;
        self
    }

    pub fn with_action(mut self, action: ActionType) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.match_path
            .validate()
            .map_err(|e| ValidationError::rule(self.match_path.as_str(), e))
    }

    /// Compare normalized tiers, so custom priorities count as their tier.
    pub fn is_of_type(&self, t: RuleType) -> bool {
        self.rule_type.normalize() == t.normalize()
    }

    /// Returns `true` if the rule observes the given change type.
    pub fn accepts(&self, change_type: ChangeType) -> bool {
        self.match_change_type == ChangeType::Any || self.match_change_type == change_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_tiers() {
        let cases = [
            (0, RuleType::ALLOW),
            (99, RuleType::ALLOW),
            (100, RuleType::WARN),
            (199, RuleType::WARN),
            (200, RuleType::ERROR),
            (254, RuleType::ERROR),
            (255, RuleType::IGNORE),
        ];
        for (p, tier) in cases {
            assert_eq!(RuleType(p).normalize(), tier, "priority {p}");
        }
    }

    #[test]
    fn displays_tier_name() {
        assert_eq!(RuleType::ALLOW.to_string(), "Allow");
        assert_eq!(RuleType(150).to_string(), "Warn");
        assert_eq!(RuleType(201).to_string(), "Error");
        assert_eq!(RuleType::IGNORE.to_string(), "Ignore");
    }

    #[test]
    fn parses_names_and_priorities() {
        assert_eq!("warn".parse::<RuleType>().unwrap(), RuleType::WARN);
        assert_eq!(" Error ".parse::<RuleType>().unwrap(), RuleType::ERROR);
        assert_eq!("42".parse::<RuleType>().unwrap(), RuleType(42));
        assert!("fatal".parse::<RuleType>().is_err());
    }

    #[test]
    fn custom_priorities_count_as_their_tier() {
        let r = Rule::new(RuleType(120), "a");
        assert!(r.is_of_type(RuleType::WARN));
        assert!(r.is_of_type(RuleType(199)));
        assert!(!r.is_of_type(RuleType::ERROR));
    }

    #[test]
    fn invalid_path_fails_rule_validation() {
        let err = Rule::new(RuleType::ERROR, "a..b").validate().unwrap_err();
        assert_eq!(
            err.message(),
            r#"rule "a..b": rule path "a..b": rule path segment "": segment must not be empty"#
        );
    }

    #[test]
    fn accepts_change_types() {
        let any = Rule::new(RuleType::ALLOW, "a");
        assert!(ChangeType::ALL.iter().all(|t| any.accepts(*t)));

        let delete = any.clone().on(ChangeType::Delete);
        assert!(delete.accepts(ChangeType::Delete));
        assert!(!delete.accepts(ChangeType::Create));
    }

    #[test]
    fn deserializes_from_json() {
        let rule: Rule = serde_json::from_str(
            r#"{"type": "warn", "path": "hosts.*.mainResourcePoolPath", "change": "modify", "message": "careful"}"#,
        )
        .unwrap();
        assert_eq!(rule.rule_type, RuleType::WARN);
        assert_eq!(rule.match_path.as_str(), "hosts.*.mainResourcePoolPath");
        assert_eq!(rule.match_change_type, ChangeType::Modify);
        assert_eq!(rule.message, "careful");
        assert_eq!(rule.action, None);

        let rule: Rule =
            serde_json::from_str(r#"{"type": 42, "path": "a.@", "action": "scale_up"}"#).unwrap();
        assert_eq!(rule.rule_type, RuleType(42));
        assert_eq!(rule.match_change_type, ChangeType::Any);
        assert_eq!(rule.action, Some(ActionType::ScaleUp));

        assert!(serde_json::from_str::<Rule>(r#"{"path": "a", "change": "rename"}"#).is_err());
    }

    #[test]
    fn serializes_tiers_by_name() {
        let rule = Rule::new(RuleType::ERROR, "a.b!").with_message("no");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "error", "path": "a.b!", "change": "any", "message": "no"})
        );

        let json = serde_json::to_value(Rule::new(RuleType(7), "a")).unwrap();
        assert_eq!(json["type"], 7);
    }
}
