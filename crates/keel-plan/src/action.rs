use std::fmt;
use std::str::FromStr;

use keel_event::Rule;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::policy;

/// What an apply is meant to do with the cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyAction {
    /// Create the cluster, or re-apply an existing one.
    #[default]
    Create,
    /// Move the cluster to a new Kubernetes version.
    Upgrade,
    /// Add or remove worker and load balancer nodes.
    Scale,
}

impl ApplyAction {
    pub const ALL: [ApplyAction; 3] = [Self::Create, Self::Upgrade, Self::Scale];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Upgrade => "upgrade",
            Self::Scale => "scale",
        }
    }

    /// The built-in policy of the action.
    pub fn rules(self) -> Vec<Rule> {
        match self {
            Self::Create => policy::modify_rules(),
            Self::Upgrade => policy::upgrade_rules(),
            Self::Scale => policy::scale_rules(),
        }
    }
}

impl fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplyAction {
    type Err = PlanError;

    /// An empty string selects [`ApplyAction::Create`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "create" => Ok(Self::Create),
            "upgrade" => Ok(Self::Upgrade),
            "scale" => Ok(Self::Scale),
            other => Err(PlanError::UnknownAction(other.to_string())),
        }
    }
}
