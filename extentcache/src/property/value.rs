//! Extracted property values.

use std::cmp::Ordering;

use bytes::Bytes;

use super::PropertyKind;
use crate::geo::GeoRegion;
use crate::interval::IntervalValue;
use crate::span::TimeSpan;

/// A value produced by a property accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Time(TimeSpan),
    Geometry(GeoRegion),
    Bytes(Bytes),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// One entry per declared column; inactive columns are `None`.
    Columns(Vec<Option<PropertyValue>>),
}

impl PropertyValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Time(_) => PropertyKind::TimeSpan,
            Self::Geometry(_) => PropertyKind::Geometry,
            Self::Bytes(_) => PropertyKind::Bytes,
            Self::Text(_) => PropertyKind::Text,
            Self::Integer(_) => PropertyKind::Integer,
            Self::Float(_) => PropertyKind::Float,
            Self::Boolean(_) => PropertyKind::Boolean,
            Self::Columns(_) => PropertyKind::Columns,
        }
    }

    /// View this value as an interval value, if it is one.
    pub fn as_interval(&self) -> Option<IntervalValue> {
        match self {
            Self::Time(span) => Some(IntervalValue::Time(*span)),
            Self::Geometry(region) => Some(IntervalValue::Geometry(region.clone())),
            _ => None,
        }
    }

    /// Ordering used by order specifiers.
    ///
    /// Values of different kinds, geometries, byte payloads and column rows
    /// are not comparable.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<TimeSpan> for PropertyValue {
    fn from(span: TimeSpan) -> Self {
        Self::Time(span)
    }
}

impl From<GeoRegion> for PropertyValue {
    fn from(region: GeoRegion) -> Self {
        Self::Geometry(region)
    }
}

impl From<Bytes> for PropertyValue {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}
