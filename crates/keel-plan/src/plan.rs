use keel_cmp::{compare, ChangeType, Comparison};
use keel_event::{generate_events, Event, Events, RuleType};
use serde::Serialize;
use tracing::{debug, info};

use crate::action::ApplyAction;
use crate::config::PlanConfig;
use crate::error::PlanResult;
use crate::model::ClusterConfig;
use crate::scale::{self, ScaledInstance};

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// What should happen with a planned apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The configurations are equal.
    NoChanges,
    /// Every change is allowed.
    Apply,
    /// Some changes are dangerous and need confirmation.
    Confirm,
    /// Some changes are not allowed.
    Blocked,
}

impl Verdict {
    /// Returns `true` if the apply may go ahead (possibly after confirmation).
    pub fn is_applicable(self) -> bool {
        matches!(self, Self::Apply | Self::Confirm)
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A blocking or dangerous change, ready to be reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    /// Configuration paths the finding refers to.
    pub paths: Vec<String>,
}

impl Finding {
    /// Created and deleted subtrees are reported by their roots only; other
    /// errors list every matched path.
    fn error(event: &Event) -> Self {
        let paths = match event.change.change_type {
            ChangeType::Create | ChangeType::Delete => event.anchor_paths(),
            _ => event.matched_paths.clone(),
        };

        Self {
            severity: Severity::Error,
            message: event.rule.message.clone(),
            paths,
        }
    }

    fn warning(event: &Event) -> Self {
        Self {
            severity: Severity::Warning,
            message: event.rule.message.clone(),
            paths: vec![event.change.path.clone()],
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The result of planning an apply.
#[derive(Clone, Debug)]
pub struct Plan {
    action: ApplyAction,
    comparison: Comparison,
    events: Events,
    removed: Vec<ScaledInstance>,
    added: Vec<ScaledInstance>,
}

impl Plan {
    pub fn action(&self) -> ApplyAction {
        self.action
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn has_changes(&self) -> bool {
        self.comparison.has_changes()
    }

    pub fn verdict(&self) -> Verdict {
        if !self.has_changes() {
            Verdict::NoChanges
        } else if self.events.iter().any(|e| e.rule.is_of_type(RuleType::ERROR)) {
            Verdict::Blocked
        } else if self.events.iter().any(|e| e.rule.is_of_type(RuleType::WARN)) {
            Verdict::Confirm
        } else {
            Verdict::Apply
        }
    }

    /// Changes that are not allowed, in event order.
    pub fn blocking(&self) -> Vec<Finding> {
        self.events
            .iter()
            .filter(|e| e.rule.is_of_type(RuleType::ERROR))
            .map(Finding::error)
            .collect()
    }

    /// Dangerous changes, in event order.
    pub fn warnings(&self) -> Vec<Finding> {
        self.events
            .iter()
            .filter(|e| e.rule.is_of_type(RuleType::WARN))
            .map(Finding::warning)
            .collect()
    }

    /// Instances removed by the plan.
    pub fn removed_instances(&self) -> &[ScaledInstance] {
        &self.removed
    }

    /// Instances added by the plan.
    pub fn new_instances(&self) -> &[ScaledInstance] {
        &self.added
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Compares an applied configuration with a new one and classifies the
/// changes with the policy of an apply action.
#[derive(Clone, Debug, Default)]
pub struct Planner {
    action: ApplyAction,
    config: PlanConfig,
}

impl Planner {
    pub fn new(action: ApplyAction, config: PlanConfig) -> Self {
        Self { action, config }
    }

    pub fn action(&self) -> ApplyAction {
        self.action
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Plan the transition from `applied` to `new`.
    ///
    /// Fails if a rule is invalid, or if a scale event does not point at a
    /// node instance.
    pub fn plan(&self, applied: &ClusterConfig, new: &ClusterConfig) -> PlanResult<Plan> {
        let comparison = compare(applied, new, &self.config.compare)?;

        let mut plan = Plan {
            action: self.action,
            comparison,
            events: Events::new(),
            removed: Vec::new(),
            added: Vec::new(),
        };

        if !plan.has_changes() {
            debug!(action = %self.action, "no changes detected");
            return Ok(plan);
        }

        let rules = self.config.rules_for(self.action);
        plan.events = generate_events(plan.comparison.tree(), &rules)?;
        plan.removed = scale::removed_instances(&plan.events, applied)?;
        plan.added = scale::new_instances(&plan.events, new)?;

        info!(
            action = %self.action,
            events = plan.events.len(),
            verdict = ?plan.verdict(),
            "planned apply"
        );
        Ok(plan)
    }
}
