use std::fmt;
use std::path::PathBuf;

use keel_cmp::CmpError;
use keel_event::EventError;

/// Errors that can occur while planning an apply.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The requested apply action is not known.
    #[error("unknown cluster action: {0}")]
    UnknownAction(String),

    /// The configurations could not be compared.
    #[error(transparent)]
    Compare(#[from] CmpError),

    /// A policy rule is invalid.
    #[error(transparent)]
    Event(#[from] EventError),

    /// A configuration or plan file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file could not be read.
    #[error("failed to read {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scale event does not refer to a node instance.
    #[error("{0} cannot be scaled")]
    NotScalable(String),
}

impl PlanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for PlanError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl PartialEq for PlanError {
    fn eq(&self, other: &Self) -> bool {
        fmt::format(format_args!("{self}")) == fmt::format(format_args!("{other}"))
    }
}

impl Eq for PlanError {}

pub type PlanResult<T> = Result<T, PlanError>;
