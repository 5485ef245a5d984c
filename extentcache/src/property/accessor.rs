//! Property accessors: typed extraction from source objects.

use std::fmt;

use bytes::Bytes;

use super::{AccessorError, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::geo::GeoRegion;
use crate::interval::{
    IntervalMatcher, IntervalValue, MatchOperator, SpatialOperator, TimeMatchMode,
};
use crate::span::TimeSpan;

/// Extracts one named, typed property from source objects of type `S`.
///
/// Accessors are pure: the same source always yields the same value.
pub trait PropertyAccessor<S>: Send + Sync {
    /// The property this accessor populates.
    fn descriptor(&self) -> &PropertyDescriptor;

    /// Read the property from a source object.
    fn access(&self, source: &S) -> PropertyValue;

    /// View as an interval accessor, if this accessor is one.
    fn as_interval(&self) -> Option<&dyn IntervalPropertyAccessor<S>> {
        None
    }

    /// Read the property and verify it against the declaration.
    ///
    /// The value must have the descriptor's kind, and interval values must
    /// lie within the declared extent.
    fn checked_access(&self, source: &S) -> Result<PropertyValue, AccessorError> {
        let value = self.access(source);
        let descriptor = self.descriptor();
        if value.kind() != descriptor.kind() {
            return Err(AccessorError::TypeMismatch {
                descriptor: descriptor.clone(),
                actual: value.kind(),
            });
        }
        if let (Some(interval), Some(candidate)) = (self.as_interval(), value.as_interval()) {
            let extent = interval.extent();
            if !candidate.is_within(&extent) {
                return Err(AccessorError::ValueOutsideExtent {
                    descriptor: descriptor.clone(),
                    value: candidate,
                    extent,
                });
            }
        }
        Ok(value)
    }
}

/// An accessor producing interval values within a declared extent.
pub trait IntervalPropertyAccessor<S>: PropertyAccessor<S> {
    /// The union interval covering every value this accessor produces.
    fn extent(&self) -> IntervalValue;

    /// Matcher accepting exactly this accessor's extent.
    ///
    /// Time accessors match strictly within the extent; geometry accessors
    /// use spatial equality.
    fn matcher(&self) -> IntervalMatcher {
        let operator = match self.descriptor().kind() {
            PropertyKind::Geometry => MatchOperator::Spatial(SpatialOperator::Equals),
            _ => MatchOperator::Time(TimeMatchMode::Strict),
        };
        IntervalMatcher::from_parts(self.descriptor().clone(), operator, self.extent())
    }
}

type Extract<S, T> = Box<dyn Fn(&S) -> T + Send + Sync>;

// =============================================================================
// Time span accessor
// =============================================================================

/// Reads a [`TimeSpan`] from each source.
pub struct TimeSpanAccessor<S> {
    descriptor: PropertyDescriptor,
    extent: TimeSpan,
    extract: Extract<S, TimeSpan>,
}

impl<S> TimeSpanAccessor<S> {
    pub fn new<F>(name: &str, extent: TimeSpan, extract: F) -> Self
    where
        F: Fn(&S) -> TimeSpan + Send + Sync + 'static,
    {
        Self {
            descriptor: PropertyDescriptor::time(name),
            extent,
            extract: Box::new(extract),
        }
    }

    pub fn extent_span(&self) -> TimeSpan {
        self.extent
    }
}

impl<S> PropertyAccessor<S> for TimeSpanAccessor<S> {
    fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    fn access(&self, source: &S) -> PropertyValue {
        PropertyValue::Time((self.extract)(source))
    }

    fn as_interval(&self) -> Option<&dyn IntervalPropertyAccessor<S>> {
        Some(self)
    }
}

impl<S> IntervalPropertyAccessor<S> for TimeSpanAccessor<S> {
    fn extent(&self) -> IntervalValue {
        IntervalValue::Time(self.extent)
    }
}

impl<S> fmt::Debug for TimeSpanAccessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSpanAccessor")
            .field("descriptor", &self.descriptor)
            .field("extent", &self.extent)
            .finish()
    }
}

// =============================================================================
// Geometry accessor
// =============================================================================

/// Reads a [`GeoRegion`] from each source.
pub struct GeometryAccessor<S> {
    descriptor: PropertyDescriptor,
    extent: GeoRegion,
    extract: Extract<S, GeoRegion>,
}

impl<S> GeometryAccessor<S> {
    pub fn new<F>(name: &str, extent: GeoRegion, extract: F) -> Self
    where
        F: Fn(&S) -> GeoRegion + Send + Sync + 'static,
    {
        Self {
            descriptor: PropertyDescriptor::geometry(name),
            extent,
            extract: Box::new(extract),
        }
    }
}

impl<S> PropertyAccessor<S> for GeometryAccessor<S> {
    fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    fn access(&self, source: &S) -> PropertyValue {
        PropertyValue::Geometry((self.extract)(source))
    }

    fn as_interval(&self) -> Option<&dyn IntervalPropertyAccessor<S>> {
        Some(self)
    }
}

impl<S> IntervalPropertyAccessor<S> for GeometryAccessor<S> {
    fn extent(&self) -> IntervalValue {
        IntervalValue::Geometry(self.extent.clone())
    }
}

impl<S> fmt::Debug for GeometryAccessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryAccessor")
            .field("descriptor", &self.descriptor)
            .field("extent", &self.extent)
            .finish()
    }
}

// =============================================================================
// Pass-through accessor
// =============================================================================

/// Exposes an opaque payload. Cached with the object, never indexed.
pub struct PassThroughAccessor<S> {
    descriptor: PropertyDescriptor,
    extract: Extract<S, Bytes>,
}

impl<S> PassThroughAccessor<S> {
    pub fn new<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&S) -> Bytes + Send + Sync + 'static,
    {
        Self {
            descriptor: PropertyDescriptor::new(name, PropertyKind::Bytes),
            extract: Box::new(extract),
        }
    }
}

impl<S> PropertyAccessor<S> for PassThroughAccessor<S> {
    fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    fn access(&self, source: &S) -> PropertyValue {
        PropertyValue::Bytes((self.extract)(source))
    }
}

// =============================================================================
// Scalar accessor
// =============================================================================

/// Reads a text, integer, float or boolean property.
pub struct ScalarAccessor<S> {
    descriptor: PropertyDescriptor,
    extract: Extract<S, PropertyValue>,
}

impl<S: 'static> ScalarAccessor<S> {
    /// Create from an untyped extraction function.
    ///
    /// # Errors
    ///
    /// Returns [`AccessorError::NotScalar`] for interval, byte and column
    /// kinds. Value kinds are verified when a deposit is built.
    pub fn new<F>(descriptor: PropertyDescriptor, extract: F) -> Result<Self, AccessorError>
    where
        F: Fn(&S) -> PropertyValue + Send + Sync + 'static,
    {
        match descriptor.kind() {
            PropertyKind::Text
            | PropertyKind::Integer
            | PropertyKind::Float
            | PropertyKind::Boolean => Ok(Self {
                descriptor,
                extract: Box::new(extract),
            }),
            _ => Err(AccessorError::NotScalar(descriptor)),
        }
    }

    pub fn text<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        Self::typed(name, PropertyKind::Text, move |s| PropertyValue::Text(extract(s)))
    }

    pub fn integer<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&S) -> i64 + Send + Sync + 'static,
    {
        Self::typed(name, PropertyKind::Integer, move |s| PropertyValue::Integer(extract(s)))
    }

    pub fn float<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&S) -> f64 + Send + Sync + 'static,
    {
        Self::typed(name, PropertyKind::Float, move |s| PropertyValue::Float(extract(s)))
    }

    pub fn boolean<F>(name: &str, extract: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self::typed(name, PropertyKind::Boolean, move |s| PropertyValue::Boolean(extract(s)))
    }

    fn typed<F>(name: &str, kind: PropertyKind, extract: F) -> Self
    where
        F: Fn(&S) -> PropertyValue + Send + Sync + 'static,
    {
        Self {
            descriptor: PropertyDescriptor::new(name, kind),
            extract: Box::new(extract),
        }
    }
}

impl<S> PropertyAccessor<S> for ScalarAccessor<S> {
    fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    fn access(&self, source: &S) -> PropertyValue {
        (self.extract)(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoBounds;

    struct Sample {
        start: i64,
        end: i64,
        lat: f64,
        lon: f64,
        label: &'static str,
    }

    fn sample() -> Sample {
        Sample {
            start: 10,
            end: 20,
            lat: 1.0,
            lon: 2.0,
            label: "a",
        }
    }

    fn time_accessor() -> TimeSpanAccessor<Sample> {
        TimeSpanAccessor::new("when", TimeSpan::new(0, 100).unwrap(), |s: &Sample| {
            TimeSpan::new(s.start, s.end).unwrap_or(TimeSpan::instant(s.start))
        })
    }

    #[test]
    fn test_time_accessor_default_matcher() {
        let accessor = time_accessor();
        let matcher = accessor.matcher();
        assert_eq!(matcher.operator(), MatchOperator::Time(TimeMatchMode::Strict));
        assert!(matcher.matches_value(&accessor.access(&sample())));
    }

    #[test]
    fn test_checked_access_rejects_value_outside_extent() {
        let accessor = time_accessor();
        let outside = Sample {
            start: 90,
            end: 150,
            ..sample()
        };
        assert!(matches!(
            accessor.checked_access(&outside),
            Err(AccessorError::ValueOutsideExtent { .. })
        ));
        assert!(accessor.checked_access(&sample()).is_ok());
    }

    #[test]
    fn test_geometry_accessor_defaults_to_equals() {
        let extent = GeoRegion::from_bounds(GeoBounds::new(0.0, 5.0, 0.0, 5.0).unwrap());
        let accessor = GeometryAccessor::new("where", extent, |s: &Sample| {
            GeoRegion::point(s.lat, s.lon).unwrap_or_else(|_| GeoRegion::world())
        });
        assert_eq!(
            accessor.matcher().operator(),
            MatchOperator::Spatial(SpatialOperator::Equals)
        );
        assert!(accessor.checked_access(&sample()).is_ok());
    }

    #[test]
    fn test_scalar_kind_mismatch_detected() {
        let lying = ScalarAccessor::new(
            PropertyDescriptor::new("count", PropertyKind::Integer),
            |s: &Sample| PropertyValue::Text(s.label.to_string()),
        )
        .unwrap();
        assert!(matches!(
            lying.checked_access(&sample()),
            Err(AccessorError::TypeMismatch { .. })
        ));

        let rejected = ScalarAccessor::<Sample>::new(PropertyDescriptor::time("when"), |_| {
            PropertyValue::Boolean(true)
        });
        assert!(matches!(rejected, Err(AccessorError::NotScalar(_))));
    }

    #[test]
    fn test_pass_through_is_not_interval() {
        let accessor = PassThroughAccessor::new("payload", |s: &Sample| {
            Bytes::copy_from_slice(s.label.as_bytes())
        });
        assert!(accessor.as_interval().is_none());
        assert_eq!(
            accessor.access(&sample()),
            PropertyValue::Bytes(Bytes::from_static(b"a"))
        );
    }

    #[test]
    fn test_typed_scalars() {
        let text = ScalarAccessor::text("label", |s: &Sample| s.label.to_string());
        let flag = ScalarAccessor::boolean("odd", |s: &Sample| s.start % 2 == 1);
        assert_eq!(text.checked_access(&sample()), Ok(PropertyValue::Text("a".into())));
        assert_eq!(flag.access(&sample()), PropertyValue::Boolean(false));
    }
}
