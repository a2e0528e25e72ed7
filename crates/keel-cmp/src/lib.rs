//! Structural diff engine for Keel.
//!
//! Compares two values of the same shape and produces a comparison tree in
//! which every node is classified as created, deleted, modified or
//! unchanged. Collections are paired by key, by element identity, or by
//! index, and the resulting tree can be flattened into changes or rendered
//! as annotated YAML.
//!
//! # Key Types
//!
//! - [`Value`] / [`Record`] / [`Field`] / [`Describe`] -- Value model fed to the comparator
//! - [`Options`] -- Tags, identity flags and pairing behavior
//! - [`Comparison`] / [`DiffTree`] / [`DiffNode`] -- Comparison result
//! - [`Change`] / [`ChangeType`] -- Flattened view of a changed node
//! - [`FormatOptions`] -- YAML rendering switches

pub mod change;
pub mod compare;
pub mod error;
pub mod options;
pub mod output;
mod pairs;
pub mod result;
pub mod tree;
pub mod value;

#[cfg(test)]
mod testutil;

pub use change::{Change, ChangeType};
pub use compare::{compare, Comparator};
pub use error::{CmpError, CmpResult};
pub use options::{Options, DEFAULT_TAG, ID_FLAG};
pub use output::FormatOptions;
pub use result::Comparison;
pub use tree::{DiffNode, DiffTree, NodeId, PATH_SEPARATOR};
pub use value::{Describe, Field, Record, Value, ValueKind};
