//! Path-pattern rule engine for Keel.
//!
//! Rules pair a dotted path pattern with the change type they observe and a
//! priority. Every changed leaf of a comparison tree is matched against the
//! rule list; the best matching rule turns it into an [`Event`].
//!
//! # Key Types
//!
//! - [`RulePath`] / [`RulePathSegment`] -- Compiled path patterns
//! - [`Rule`] / [`RuleType`] / [`ActionType`] -- Policy rules
//! - [`Event`] / [`Events`] -- Matched changes
//! - [`generate_events`] -- Tree walk producing events

pub mod error;
pub mod event;
pub mod path;
pub mod rule;

pub use error::{EventError, EventResult, ValidationError};
pub use event::{generate_events, match_rule, Event, Events};
pub use path::{RulePath, RulePathSegment};
pub use rule::{ActionType, Rule, RuleType};
