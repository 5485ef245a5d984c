//! Interval values, value sets and matchers.
//!
//! An [`IntervalValue`] is a time span or a geographic region. An
//! [`IntervalValueSet`] bundles values per property and describes either
//! the scope of a query or the coverage of stored data. An
//! [`IntervalMatcher`] is a predicate over one interval-valued property.

mod matcher;
mod set;
mod value;

pub use matcher::{
    signature_of, IntervalMatcher, MatchOperator, MatcherSignature, SpatialOperator,
    TimeMatchMode,
};
pub use set::IntervalValueSet;
pub use value::IntervalValue;

use thiserror::Error;

use crate::property::{PropertyDescriptor, PropertyKind};

/// Errors from building matchers and value sets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntervalError {
    #[error("Property {0} is not interval-valued")]
    NotInterval(PropertyDescriptor),

    #[error("Property {descriptor} cannot hold a {actual} value")]
    KindMismatch {
        descriptor: PropertyDescriptor,
        actual: PropertyKind,
    },

    #[error("Operator {operator} does not apply to property {descriptor}")]
    OperatorMismatch {
        descriptor: PropertyDescriptor,
        operator: MatchOperator,
    },
}
