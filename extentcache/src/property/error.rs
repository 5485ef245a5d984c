//! Accessor construction and validation errors.

use thiserror::Error;

use super::{PropertyDescriptor, PropertyKind};
use crate::interval::IntervalValue;

/// Errors raised when an accessor is built or its output is checked.
///
/// These are programmer errors: a deposit that triggers one is rejected
/// as a whole before anything is stored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessorError {
    /// The accessor produced a value of a different kind than declared.
    #[error("Property {descriptor} produced a {actual} value")]
    TypeMismatch {
        descriptor: PropertyDescriptor,
        actual: PropertyKind,
    },

    /// An interval value fell outside the accessor's declared extent.
    #[error("Value {value} of property {descriptor} lies outside extent {extent}")]
    ValueOutsideExtent {
        descriptor: PropertyDescriptor,
        value: IntervalValue,
        extent: IntervalValue,
    },

    #[error("Column row has {actual} values, expected {expected}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("Column index {index} out of range for {count} columns")]
    InvalidColumn { index: usize, count: usize },

    #[error("Active column {0} has no value")]
    MissingColumnValue(PropertyDescriptor),

    #[error("Property {0} cannot be read by a scalar accessor")]
    NotScalar(PropertyDescriptor),
}
