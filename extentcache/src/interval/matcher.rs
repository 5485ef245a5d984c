//! Interval matchers: predicates over interval-valued properties.

use std::fmt;

use super::{IntervalError, IntervalValue};
use crate::geo::GeoRegion;
use crate::property::{PropertyDescriptor, PropertyKind, PropertyValue};
use crate::span::TimeSpan;

/// Boundary rules for time-span matching.
///
/// Both modes treat a TIMELESS operand or candidate as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeMatchMode {
    /// The candidate must lie fully within the operand's bounds.
    Strict,
    /// The candidate must share interior with the operand. A zero-width
    /// side matches only when it lies strictly inside the other.
    General,
}

/// Spatial predicate vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpatialOperator {
    Equals,
    Intersects,
}

/// Operator of an [`IntervalMatcher`], tied to the property kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchOperator {
    Time(TimeMatchMode),
    Spatial(SpatialOperator),
}

impl MatchOperator {
    /// Operator used when nothing else is specified for a property.
    pub fn default_for(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Geometry => Self::Spatial(SpatialOperator::Intersects),
            _ => Self::Time(TimeMatchMode::General),
        }
    }

    fn applies_to(&self, kind: PropertyKind) -> bool {
        matches!(
            (self, kind),
            (Self::Time(_), PropertyKind::TimeSpan) | (Self::Spatial(_), PropertyKind::Geometry)
        )
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Time(TimeMatchMode::Strict) => "strict",
            Self::Time(TimeMatchMode::General) => "general",
            Self::Spatial(SpatialOperator::Equals) => "equals",
            Self::Spatial(SpatialOperator::Intersects) => "intersects",
        };
        f.write_str(name)
    }
}

/// The operand-free part of a matcher: which property, which operator.
///
/// Two queries with the same sorted signature list ask the same kind of
/// question and may share in-flight fetches and coverage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatcherSignature {
    pub descriptor: PropertyDescriptor,
    pub operator: MatchOperator,
}

/// Sorted, de-duplicated signatures of a matcher list.
pub fn signature_of(matchers: &[IntervalMatcher]) -> Vec<MatcherSignature> {
    let mut signature: Vec<MatcherSignature> =
        matchers.iter().map(IntervalMatcher::signature).collect();
    signature.sort();
    signature.dedup();
    signature
}

/// A predicate over one interval-valued property.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalMatcher {
    descriptor: PropertyDescriptor,
    operator: MatchOperator,
    operand: IntervalValue,
}

impl IntervalMatcher {
    /// Create a matcher, validating that descriptor, operator and operand agree.
    pub fn new(
        descriptor: PropertyDescriptor,
        operator: MatchOperator,
        operand: impl Into<IntervalValue>,
    ) -> Result<Self, IntervalError> {
        let operand = operand.into();
        let kind = descriptor.kind();
        if !kind.is_interval() {
            return Err(IntervalError::NotInterval(descriptor));
        }
        if operand.kind() != kind {
            return Err(IntervalError::KindMismatch {
                descriptor,
                actual: operand.kind(),
            });
        }
        if !operator.applies_to(kind) {
            return Err(IntervalError::OperatorMismatch { descriptor, operator });
        }
        Ok(Self {
            descriptor,
            operator,
            operand,
        })
    }

    /// Time-span matcher with the given boundary mode.
    pub fn time(
        descriptor: PropertyDescriptor,
        span: TimeSpan,
        mode: TimeMatchMode,
    ) -> Result<Self, IntervalError> {
        Self::new(descriptor, MatchOperator::Time(mode), span)
    }

    /// Geometry matcher with the given spatial operator.
    pub fn geometry(
        descriptor: PropertyDescriptor,
        region: GeoRegion,
        operator: SpatialOperator,
    ) -> Result<Self, IntervalError> {
        Self::new(descriptor, MatchOperator::Spatial(operator), region)
    }

    /// Assemble from parts already known to agree.
    pub(crate) fn from_parts(
        descriptor: PropertyDescriptor,
        operator: MatchOperator,
        operand: IntervalValue,
    ) -> Self {
        Self {
            descriptor,
            operator,
            operand,
        }
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn operator(&self) -> MatchOperator {
        self.operator
    }

    pub fn operand(&self) -> &IntervalValue {
        &self.operand
    }

    pub fn signature(&self) -> MatcherSignature {
        MatcherSignature {
            descriptor: self.descriptor.clone(),
            operator: self.operator,
        }
    }

    /// Same property and operator, different operand.
    pub fn with_operand(&self, operand: impl Into<IntervalValue>) -> Result<Self, IntervalError> {
        Self::new(self.descriptor.clone(), self.operator, operand)
    }

    /// Evaluate the predicate against a candidate extent.
    ///
    /// Candidates of another kind never match.
    pub fn matches(&self, candidate: &IntervalValue) -> bool {
        match (&self.operator, &self.operand, candidate) {
            (MatchOperator::Time(mode), IntervalValue::Time(operand), IntervalValue::Time(c)) => {
                match mode {
                    TimeMatchMode::Strict => operand.contains_strictly(c),
                    TimeMatchMode::General => operand.intersects_loosely(c),
                }
            }
            (
                MatchOperator::Spatial(op),
                IntervalValue::Geometry(operand),
                IntervalValue::Geometry(c),
            ) => match op {
                SpatialOperator::Equals => operand.equals(c),
                SpatialOperator::Intersects => operand.intersects(c),
            },
            _ => false,
        }
    }

    /// Evaluate against an extracted property value.
    pub fn matches_value(&self, value: &PropertyValue) -> bool {
        value
            .as_interval()
            .map(|candidate| self.matches(&candidate))
            .unwrap_or(false)
    }

    /// True if every candidate in the list matches.
    pub fn covers_all(&self, candidates: &[IntervalValue]) -> bool {
        candidates.iter().all(|c| self.matches(c))
    }

    /// Indices of the candidates that match, in order.
    pub fn filter_indices(&self, candidates: &[IntervalValue]) -> Vec<usize> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| self.matches(c))
            .map(|(i, _)| i)
            .collect()
    }
}

impl fmt::Display for IntervalMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.descriptor.name(), self.operator, self.operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoBounds;

    fn when() -> PropertyDescriptor {
        PropertyDescriptor::time("when")
    }

    fn span(s: i64, e: i64) -> IntervalValue {
        IntervalValue::Time(TimeSpan::new(s, e).unwrap())
    }

    fn region(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> GeoRegion {
        GeoRegion::from_bounds(GeoBounds::new(min_lat, max_lat, min_lon, max_lon).unwrap())
    }

    fn strict() -> IntervalMatcher {
        IntervalMatcher::time(when(), TimeSpan::new(100, 200).unwrap(), TimeMatchMode::Strict)
            .unwrap()
    }

    fn general() -> IntervalMatcher {
        IntervalMatcher::time(when(), TimeSpan::new(100, 200).unwrap(), TimeMatchMode::General)
            .unwrap()
    }

    #[test]
    fn test_strict_boundaries() {
        let m = strict();
        assert!(m.matches(&span(100, 200)));
        assert!(!m.matches(&span(99, 200)));
        assert!(!m.matches(&span(100, 201)));
        assert!(!m.matches(&IntervalValue::Time(TimeSpan::instant(200))));
    }

    #[test]
    fn test_general_boundaries() {
        let m = general();
        assert!(m.matches(&span(50, 101)));
        assert!(!m.matches(&span(50, 100)));
        assert!(!m.matches(&span(200, 250)));
    }

    #[test]
    fn test_timeless_matches_both_ways() {
        let timeless = IntervalValue::Time(TimeSpan::TIMELESS);
        assert!(strict().matches(&timeless));
        assert!(general().matches(&timeless));

        let any = IntervalMatcher::time(when(), TimeSpan::TIMELESS, TimeMatchMode::Strict).unwrap();
        assert!(any.matches(&span(-5, 5)));
    }

    #[test]
    fn test_spatial_operators() {
        let area = region(0.0, 10.0, 0.0, 10.0);
        let where_ = PropertyDescriptor::geometry("where");
        let eq = IntervalMatcher::geometry(where_.clone(), area.clone(), SpatialOperator::Equals)
            .unwrap();
        let hit = IntervalMatcher::geometry(where_, area.clone(), SpatialOperator::Intersects)
            .unwrap();

        let part = IntervalValue::Geometry(region(5.0, 15.0, 5.0, 15.0));
        assert!(!eq.matches(&part));
        assert!(hit.matches(&part));
        assert!(eq.matches(&IntervalValue::Geometry(area)));
        assert!(!hit.matches(&span(0, 1)));
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            IntervalMatcher::new(
                when(),
                MatchOperator::Spatial(SpatialOperator::Equals),
                TimeSpan::TIMELESS
            ),
            Err(IntervalError::OperatorMismatch { .. })
        ));
        assert!(matches!(
            IntervalMatcher::new(
                when(),
                MatchOperator::Time(TimeMatchMode::Strict),
                region(0.0, 1.0, 0.0, 1.0)
            ),
            Err(IntervalError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_batch_filtering() {
        let m = general();
        let candidates = vec![span(0, 50), span(150, 160), span(190, 300)];
        assert_eq!(m.filter_indices(&candidates), vec![1, 2]);
        assert!(!m.covers_all(&candidates));
        assert!(m.covers_all(&candidates[1..]));
    }

    #[test]
    fn test_signature_ignores_operand() {
        let a = general();
        let b = a.with_operand(TimeSpan::new(0, 1).unwrap()).unwrap();
        assert_eq!(signature_of(&[a.clone(), b]), vec![a.signature()]);
        assert_ne!(strict().signature(), a.signature());
    }
}
