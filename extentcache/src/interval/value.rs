//! Interval values and per-dimension set operations.

use std::fmt;

use crate::geo::GeoRegion;
use crate::property::PropertyKind;
use crate::span::{intersect_spans, merge_spans, subtract_spans, TimeSpan};

/// An interval-valued extent: a time span or a geographic region.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalValue {
    Time(TimeSpan),
    Geometry(GeoRegion),
}

impl IntervalValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Time(_) => PropertyKind::TimeSpan,
            Self::Geometry(_) => PropertyKind::Geometry,
        }
    }

    /// The value covering everything of the given kind.
    ///
    /// Returns `None` for non-interval kinds.
    pub fn universe(kind: PropertyKind) -> Option<Self> {
        match kind {
            PropertyKind::TimeSpan => Some(Self::Time(TimeSpan::TIMELESS)),
            PropertyKind::Geometry => Some(Self::Geometry(GeoRegion::world())),
            _ => None,
        }
    }

    /// True for the empty region. Time spans are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Time(_) => false,
            Self::Geometry(region) => region.is_empty(),
        }
    }

    pub fn as_time(&self) -> Option<&TimeSpan> {
        match self {
            Self::Time(span) => Some(span),
            Self::Geometry(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeoRegion> {
        match self {
            Self::Geometry(region) => Some(region),
            Self::Time(_) => None,
        }
    }

    /// True if this value lies within `extent`.
    ///
    /// Time values use strict containment, so TIMELESS on either side is
    /// always within. Geometry values must be covered by the extent.
    pub fn is_within(&self, extent: &IntervalValue) -> bool {
        match (self, extent) {
            (Self::Time(value), Self::Time(extent)) => extent.contains_strictly(value),
            (Self::Geometry(value), Self::Geometry(extent)) => extent.covers(value),
            _ => false,
        }
    }
}

impl From<TimeSpan> for IntervalValue {
    fn from(span: TimeSpan) -> Self {
        Self::Time(span)
    }
}

impl From<GeoRegion> for IntervalValue {
    fn from(region: GeoRegion) -> Self {
        Self::Geometry(region)
    }
}

impl fmt::Display for IntervalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(span) => write!(f, "{}", span),
            Self::Geometry(region) => write!(f, "{}", region),
        }
    }
}

fn spans_of(values: &[IntervalValue]) -> Vec<TimeSpan> {
    values.iter().filter_map(IntervalValue::as_time).copied().collect()
}

fn region_of(values: &[IntervalValue]) -> GeoRegion {
    values
        .iter()
        .filter_map(IntervalValue::as_geometry)
        .fold(GeoRegion::empty(), |acc, r| acc.union(r))
}

fn geometry_values(region: GeoRegion) -> Vec<IntervalValue> {
    if region.is_empty() {
        Vec::new()
    } else {
        vec![IntervalValue::Geometry(region)]
    }
}

/// Canonical form of one dimension: merged spans, or a single region.
pub(crate) fn normalize(kind: PropertyKind, values: &[IntervalValue]) -> Vec<IntervalValue> {
    match kind {
        PropertyKind::TimeSpan => merge_spans(spans_of(values))
            .into_iter()
            .map(IntervalValue::Time)
            .collect(),
        PropertyKind::Geometry => geometry_values(region_of(values)),
        _ => Vec::new(),
    }
}

/// `from − remove` within one dimension.
pub(crate) fn subtract_values(
    kind: PropertyKind,
    from: &[IntervalValue],
    remove: &[IntervalValue],
) -> Vec<IntervalValue> {
    match kind {
        PropertyKind::TimeSpan => subtract_spans(&spans_of(from), &spans_of(remove))
            .into_iter()
            .map(IntervalValue::Time)
            .collect(),
        PropertyKind::Geometry => geometry_values(region_of(from).subtract(&region_of(remove))),
        _ => Vec::new(),
    }
}

/// `a ∩ b` within one dimension.
pub(crate) fn intersect_values(
    kind: PropertyKind,
    a: &[IntervalValue],
    b: &[IntervalValue],
) -> Vec<IntervalValue> {
    match kind {
        PropertyKind::TimeSpan => intersect_spans(&spans_of(a), &spans_of(b))
            .into_iter()
            .map(IntervalValue::Time)
            .collect(),
        PropertyKind::Geometry => geometry_values(region_of(a).intersection(&region_of(b))),
        _ => Vec::new(),
    }
}

/// Equality of two canonical dimensions. Regions compare topologically.
pub(crate) fn same_values(kind: PropertyKind, a: &[IntervalValue], b: &[IntervalValue]) -> bool {
    match kind {
        PropertyKind::Geometry => region_of(a).equals(&region_of(b)),
        _ => a == b,
    }
}
