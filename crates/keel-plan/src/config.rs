use std::path::Path;

use keel_cmp::{FormatOptions, Options};
use keel_event::{EventError, Rule};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};

use crate::action::ApplyAction;
use crate::error::{PlanError, PlanResult};
use crate::model::{OPT_TAG, YAML_TAG};

/// Configuration of the apply planner.
///
/// Every section is optional in a plan file; missing values fall back to
/// [`PlanConfig::default`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// How the applied and the new configuration are compared.
    #[serde(deserialize_with = "compare_over_defaults")]
    pub compare: Options,
    /// How the detected changes are rendered.
    #[serde(deserialize_with = "format_over_defaults")]
    pub format: FormatOptions,
    /// Rule lists replacing the built-in policy of an action.
    pub rules: RuleOverrides,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            compare: Options {
                tag: OPT_TAG.into(),
                extra_name_tags: vec![YAML_TAG.into()],
                respect_slice_order: false,
                ignore_empty_changes: true,
                populate_all_nodes: true,
            },
            format: FormatOptions {
                show_diff_only: true,
                show_color: true,
                show_change_type_prefix: true,
            },
            rules: RuleOverrides::default(),
        }
    }
}

fn compare_over_defaults<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Options, D::Error> {
    overlay(PlanConfig::default().compare, deserializer)
}

fn format_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FormatOptions, D::Error> {
    overlay(PlanConfig::default().format, deserializer)
}

/// Deserialize a possibly partial table on top of `base`, so keys the table
/// leaves out keep the plan defaults rather than the type's own.
fn overlay<'de, T, D>(base: T, deserializer: D) -> Result<T, D::Error>
where
    T: Serialize + DeserializeOwned,
    D: Deserializer<'de>,
{
    let table = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;

    let mut merged = serde_json::to_value(base).map_err(de::Error::custom)?;
    if let serde_json::Value::Object(fields) = &mut merged {
        fields.extend(table);
    }

    serde_json::from_value(merged).map_err(de::Error::custom)
}

/// Per-action rule lists. `None` keeps the built-in policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<Vec<Rule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<Vec<Rule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<Rule>>,
}

impl RuleOverrides {
    fn get(&self, action: ApplyAction) -> Option<&Vec<Rule>> {
        match action {
            ApplyAction::Create => self.create.as_ref(),
            ApplyAction::Upgrade => self.upgrade.as_ref(),
            ApplyAction::Scale => self.scale.as_ref(),
        }
    }
}

impl PlanConfig {
    pub fn from_toml_str(s: &str) -> PlanResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// The rules applied for `action`: the override if present, otherwise
    /// the built-in policy.
    pub fn rules_for(&self, action: ApplyAction) -> Vec<Rule> {
        self.rules
            .get(action)
            .cloned()
            .unwrap_or_else(|| action.rules())
    }

    /// Check every overriding rule.
    pub fn validate(&self) -> PlanResult<()> {
        for action in ApplyAction::ALL {
            for rule in self.rules.get(action).into_iter().flatten() {
                rule.validate().map_err(EventError::from)?;
            }
        }
        Ok(())
    }
}
