//! Typed, named property extraction.
//!
//! A [`PropertyDescriptor`] names a property and its kind. A
//! [`PropertyAccessor`] reads that property from an arbitrary source
//! object, which is what lets unrelated domain types be cached and queried
//! uniformly. Interval-valued accessors additionally declare an extent that
//! every produced value lies within.

mod accessor;
mod columns;
mod descriptor;
mod error;
mod value;

pub use accessor::{
    GeometryAccessor, IntervalPropertyAccessor, PassThroughAccessor, PropertyAccessor,
    ScalarAccessor, TimeSpanAccessor,
};
pub use columns::ColumnArrayAccessor;
pub use descriptor::{PropertyDescriptor, PropertyKind};
pub use error::AccessorError;
pub use value::PropertyValue;
