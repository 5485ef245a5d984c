//! Property descriptors: the (name, type) identity used as a key throughout.

use std::fmt;
use std::sync::Arc;

/// Type tag of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    /// A [`crate::span::TimeSpan`]
    TimeSpan,
    /// A [`crate::geo::GeoRegion`]
    Geometry,
    /// Opaque payload bytes, cached but never indexed
    Bytes,
    Text,
    Integer,
    Float,
    Boolean,
    /// A row of typed columns
    Columns,
}

impl PropertyKind {
    /// True for kinds that can be matched with an interval matcher.
    pub fn is_interval(&self) -> bool {
        matches!(self, Self::TimeSpan | Self::Geometry)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TimeSpan => "time_span",
            Self::Geometry => "geometry",
            Self::Bytes => "bytes",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Columns => "columns",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed property.
///
/// Identity is the pair (name, kind): two descriptors with the same name
/// but different kinds are different properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyDescriptor {
    name: Arc<str>,
    kind: PropertyKind,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<Arc<str>>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a time-span property.
    pub fn time(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, PropertyKind::TimeSpan)
    }

    /// Shorthand for a geometry property.
    pub fn geometry(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, PropertyKind::Geometry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_includes_kind() {
        let a = PropertyDescriptor::new("when", PropertyKind::TimeSpan);
        let b = PropertyDescriptor::new("when", PropertyKind::Text);
        assert_ne!(a, b);

        let set: HashSet<_> = [a.clone(), b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyDescriptor::time("when").to_string(), "when:time_span");
    }

    #[test]
    fn test_interval_kinds() {
        assert!(PropertyKind::TimeSpan.is_interval());
        assert!(PropertyKind::Geometry.is_interval());
        assert!(!PropertyKind::Bytes.is_interval());
    }
}
