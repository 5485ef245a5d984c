//! Interval value sets: multi-dimensional query scopes and coverage records.

use std::collections::BTreeMap;
use std::fmt;

use super::value::{intersect_values, normalize, same_values, subtract_values};
use super::{IntervalError, IntervalMatcher, IntervalValue, MatchOperator, MatcherSignature};
use crate::property::PropertyDescriptor;
use crate::span::TimeSpan;

/// A mapping from property descriptor to the interval values of that property.
///
/// The set denotes the product of its dimensions: a point is inside when
/// every dimension contains it. A dimension that is absent is unconstrained.
/// Dimensions are kept canonical: time dimensions hold sorted, merged spans;
/// geometry dimensions hold at most one region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalValueSet {
    dims: BTreeMap<PropertyDescriptor, Vec<IntervalValue>>,
}

impl IntervalValueSet {
    /// Create an unconstrained set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        descriptor: PropertyDescriptor,
        value: impl Into<IntervalValue>,
    ) -> Result<Self, IntervalError> {
        self.insert(descriptor, value)?;
        Ok(self)
    }

    /// Add a value to a dimension, unioning with what is already there.
    ///
    /// # Errors
    ///
    /// Fails if the descriptor is not an interval kind or the value's kind
    /// differs from the descriptor's.
    pub fn insert(
        &mut self,
        descriptor: PropertyDescriptor,
        value: impl Into<IntervalValue>,
    ) -> Result<(), IntervalError> {
        let value = value.into();
        check_kind(&descriptor, &value)?;
        let kind = descriptor.kind();
        let values = self.dims.entry(descriptor).or_default();
        values.push(value);
        *values = normalize(kind, values);
        Ok(())
    }

    /// Values of one dimension, `None` if unconstrained.
    pub fn get(&self, descriptor: &PropertyDescriptor) -> Option<&[IntervalValue]> {
        self.dims.get(descriptor).map(Vec::as_slice)
    }

    /// Time spans of one dimension. Unconstrained dimensions yield TIMELESS.
    pub fn time_spans(&self, descriptor: &PropertyDescriptor) -> Vec<TimeSpan> {
        match self.dims.get(descriptor) {
            Some(values) => values.iter().filter_map(IntervalValue::as_time).copied().collect(),
            None => vec![TimeSpan::TIMELESS],
        }
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.dims.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyDescriptor, &[IntervalValue])> {
        self.dims.iter().map(|(d, v)| (d, v.as_slice()))
    }

    /// Number of constrained dimensions.
    pub fn dimension_count(&self) -> usize {
        self.dims.len()
    }

    /// True when no dimension is constrained (the set covers everything).
    pub fn is_unconstrained(&self) -> bool {
        self.dims.is_empty()
    }

    /// True when some dimension holds nothing, so the set covers nothing.
    pub fn is_void(&self) -> bool {
        self.dims.values().any(Vec::is_empty)
    }

    /// Build the set scoped by a conjunction of matchers.
    ///
    /// Several matchers on one property intersect their operands.
    pub fn from_matchers(matchers: &[IntervalMatcher]) -> Self {
        let mut dims: BTreeMap<PropertyDescriptor, Vec<IntervalValue>> = BTreeMap::new();
        for matcher in matchers {
            let descriptor = matcher.descriptor().clone();
            let kind = descriptor.kind();
            let operand = std::slice::from_ref(matcher.operand());
            let values = match dims.get(&descriptor) {
                Some(existing) => intersect_values(kind, existing, operand),
                None => normalize(kind, operand),
            };
            dims.insert(descriptor, values);
        }
        Self { dims }
    }

    /// Express the set as matchers, one per value.
    ///
    /// Operators come from `signature`; properties without an entry use
    /// general time matching or spatial intersects. Call
    /// [`split`](Self::split) first when a conjunction is required.
    pub fn to_matchers(&self, signature: &[MatcherSignature]) -> Vec<IntervalMatcher> {
        let mut matchers = Vec::new();
        for (descriptor, values) in &self.dims {
            let operator = signature
                .iter()
                .find(|s| &s.descriptor == descriptor)
                .map(|s| s.operator)
                .unwrap_or_else(|| MatchOperator::default_for(descriptor.kind()));
            for value in values {
                matchers.push(IntervalMatcher::from_parts(
                    descriptor.clone(),
                    operator,
                    value.clone(),
                ));
            }
        }
        matchers
    }

    /// Split into pieces holding at most one value per dimension.
    ///
    /// The pieces are disjoint and their union is this set.
    pub fn split(&self) -> Vec<IntervalValueSet> {
        let mut pieces = vec![IntervalValueSet::new()];
        for (descriptor, values) in &self.dims {
            if values.is_empty() {
                return Vec::new();
            }
            pieces = pieces
                .into_iter()
                .flat_map(|piece| {
                    values.iter().map(move |value| {
                        let mut next = piece.clone();
                        next.dims.insert(descriptor.clone(), vec![value.clone()]);
                        next
                    })
                })
                .collect();
        }
        pieces
    }

    /// Intersection with another set, `None` if it is empty.
    pub fn intersection(&self, other: &IntervalValueSet) -> Option<IntervalValueSet> {
        let mut dims = BTreeMap::new();
        for descriptor in self.union_descriptors(other) {
            let kind = descriptor.kind();
            let values = intersect_values(
                kind,
                &self.dimension_or_universe(&descriptor),
                &other.dimension_or_universe(&descriptor),
            );
            if values.is_empty() {
                return None;
            }
            dims.insert(descriptor, values);
        }
        Some(Self { dims })
    }

    /// Subtract another set, yielding pairwise-disjoint residual pieces.
    ///
    /// Dimensions are peeled in order: piece `k` keeps the overlap on the
    /// first `k` dimensions, takes the residual on dimension `k`, and keeps
    /// this set's own values on the rest.
    pub fn subtract(&self, other: &IntervalValueSet) -> Vec<IntervalValueSet> {
        if self.is_void() {
            return Vec::new();
        }

        let descriptors = self.union_descriptors(other);
        let mut pieces = Vec::new();
        let mut overlap: BTreeMap<PropertyDescriptor, Vec<IntervalValue>> = BTreeMap::new();

        for (index, descriptor) in descriptors.iter().enumerate() {
            let kind = descriptor.kind();
            let mine = self.dimension_or_universe(descriptor);
            let theirs = other.dimension_or_universe(descriptor);

            let residual = subtract_values(kind, &mine, &theirs);
            if !residual.is_empty() {
                let mut dims = overlap.clone();
                dims.insert(descriptor.clone(), residual);
                for later in &descriptors[index + 1..] {
                    if let Some(values) = self.dims.get(later) {
                        dims.insert(later.clone(), values.clone());
                    }
                }
                pieces.push(Self { dims });
            }

            let common = intersect_values(kind, &mine, &theirs);
            if common.is_empty() {
                return pieces;
            }
            overlap.insert(descriptor.clone(), common);
        }
        pieces
    }

    /// True if both sets denote the same extent.
    ///
    /// Unlike `==`, regions that differ only in ring layout or vertex order
    /// compare equal, and an absent dimension equals its universe.
    pub fn same_extent(&self, other: &IntervalValueSet) -> bool {
        self.union_descriptors(other).iter().all(|descriptor| {
            same_values(
                descriptor.kind(),
                &self.dimension_or_universe(descriptor),
                &other.dimension_or_universe(descriptor),
            )
        })
    }

    /// True if the union of `cover` contains this whole set.
    pub fn is_covered_by(&self, cover: &[IntervalValueSet]) -> bool {
        let mut remaining = vec![self.clone()];
        for c in cover {
            remaining = remaining.iter().flat_map(|r| r.subtract(c)).collect();
            if remaining.is_empty() {
                return true;
            }
        }
        remaining.is_empty()
    }

    fn union_descriptors(&self, other: &IntervalValueSet) -> Vec<PropertyDescriptor> {
        let mut all: Vec<PropertyDescriptor> = self.dims.keys().cloned().collect();
        for d in other.dims.keys() {
            if !self.dims.contains_key(d) {
                all.push(d.clone());
            }
        }
        all.sort();
        all
    }

    fn dimension_or_universe(&self, descriptor: &PropertyDescriptor) -> Vec<IntervalValue> {
        match self.dims.get(descriptor) {
            Some(values) => values.clone(),
            None => IntervalValue::universe(descriptor.kind()).into_iter().collect(),
        }
    }
}

fn check_kind(descriptor: &PropertyDescriptor, value: &IntervalValue) -> Result<(), IntervalError> {
    if !descriptor.kind().is_interval() {
        return Err(IntervalError::NotInterval(descriptor.clone()));
    }
    if descriptor.kind() != value.kind() {
        return Err(IntervalError::KindMismatch {
            descriptor: descriptor.clone(),
            actual: value.kind(),
        });
    }
    Ok(())
}

impl fmt::Display for IntervalValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dims.is_empty() {
            return write!(f, "{{*}}");
        }
        write!(f, "{{")?;
        for (i, (descriptor, values)) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}=", descriptor.name())?;
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    write!(f, "|")?;
                }
                write!(f, "{}", value)?;
            }
        }
        write!(f, "}}")
    }
}
