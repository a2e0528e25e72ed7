//! Error types for the comparison crate.

use crate::value::ValueKind;

/// Errors that can occur while comparing two values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CmpError {
    /// The compared values have different shapes, or a shape that cannot be
    /// compared at all (see [`ValueKind::Opaque`]).
    #[error("compared values have either unsupported or mismatched types ({before} <> {after})")]
    TypeMismatch { before: ValueKind, after: ValueKind },
}

impl CmpError {
    /// Create a type mismatch error from the kinds of both operands.
    pub fn type_mismatch(before: ValueKind, after: ValueKind) -> Self {
        Self::TypeMismatch { before, after }
    }
}

/// Convenience alias for comparison results.
pub type CmpResult<T> = Result<T, CmpError>;
