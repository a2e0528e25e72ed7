//! Apply planning for Keel clusters.
//!
//! A [`Planner`] compares the configuration a cluster was last applied with
//! against a newly supplied one, classifies every change with the policy of
//! the requested [`ApplyAction`], and returns a [`Plan`] whose [`Verdict`]
//! says whether the apply may go ahead.
//!
//! ```rust
//! use keel_plan::{ApplyAction, ClusterConfig, PlanConfig, Planner, Verdict};
//!
//! let applied = ClusterConfig::default();
//! let mut new = applied.clone();
//! new.kubernetes.version = "v1.28.6".into();
//!
//! let planner = Planner::new(ApplyAction::Upgrade, PlanConfig::default());
//! let plan = planner.plan(&applied, &new).unwrap();
//! assert_eq!(plan.verdict(), Verdict::Apply);
//! ```
//!
//! # Key Types
//!
//! - [`ClusterConfig`]: typed cluster configuration snapshot.
//! - [`ApplyAction`]: create, upgrade or scale, each with a built-in policy.
//! - [`PlanConfig`]: comparison and rendering options, policy overrides.
//! - [`Plan`]: events, findings and scaled instances of one apply.

pub mod action;
pub mod config;
pub mod error;
pub mod model;
pub mod plan;
pub mod policy;
pub mod scale;

pub use action::ApplyAction;
pub use config::{PlanConfig, RuleOverrides};
pub use error::{PlanError, PlanResult};
pub use model::{ClusterConfig, Instance, NodeRole};
pub use plan::{Finding, Plan, Planner, Severity, Verdict};
pub use scale::ScaledInstance;
