use std::fmt;

/// A rule, rule path or path segment failed validation.
///
/// The message is prefixed with the offending object, innermost last:
/// `rule "a.{b": rule path "a.{b": rule path segment "{b": ...`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn segment(segment: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("rule path segment {segment:?}: {reason}"))
    }

    pub(crate) fn path(path: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("rule path {path:?}: {reason}"))
    }

    pub(crate) fn rule(path: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("rule {path:?}: {reason}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while generating events.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A rule did not pass validation; no events were produced.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type EventResult<T> = Result<T, EventError>;
