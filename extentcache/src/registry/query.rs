//! Query descriptions: scope, ordering and limits.

use std::cmp::Ordering;
use std::fmt;

use super::{DataModelCategory, ModelId};
use crate::interval::{IntervalMatcher, IntervalValueSet};
use crate::property::{PropertyDescriptor, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Sort key for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpecifier {
    pub descriptor: PropertyDescriptor,
    pub direction: SortDirection,
}

impl OrderSpecifier {
    pub fn ascending(descriptor: PropertyDescriptor) -> Self {
        Self {
            descriptor,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(descriptor: PropertyDescriptor) -> Self {
        Self {
            descriptor,
            direction: SortDirection::Descending,
        }
    }

    /// Compare two values under this key. Incomparable values tie.
    pub(crate) fn compare(&self, a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> Ordering {
        let ordering = match (a, b) {
            (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// A conjunction of interval predicates over one category.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    category: DataModelCategory,
    matchers: Vec<IntervalMatcher>,
    order: Vec<OrderSpecifier>,
    limit: Option<usize>,
    properties: Vec<PropertyDescriptor>,
}

impl DataQuery {
    pub fn new(category: DataModelCategory) -> Self {
        Self {
            category,
            matchers: Vec::new(),
            order: Vec::new(),
            limit: None,
            properties: Vec::new(),
        }
    }

    pub fn with_matcher(mut self, matcher: IntervalMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn with_matchers(mut self, matchers: impl IntoIterator<Item = IntervalMatcher>) -> Self {
        self.matchers.extend(matchers);
        self
    }

    /// Add a sort key. Keys apply in the order they are added.
    pub fn order_by(mut self, order: OrderSpecifier) -> Self {
        self.order.push(order);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Properties the caller wants populated.
    pub fn with_properties(
        mut self,
        properties: impl IntoIterator<Item = PropertyDescriptor>,
    ) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn category(&self) -> &DataModelCategory {
        &self.category
    }

    pub fn matchers(&self) -> &[IntervalMatcher] {
        &self.matchers
    }

    pub fn order(&self) -> &[OrderSpecifier] {
        &self.order
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// The interval scope the matchers select.
    pub fn scope(&self) -> IntervalValueSet {
        IntervalValueSet::from_matchers(&self.matchers)
    }

    /// Sort rows by the order keys (ties broken by id), then truncate.
    pub(crate) fn order_and_limit(
        &self,
        mut rows: Vec<(ModelId, Vec<Option<PropertyValue>>)>,
    ) -> Vec<ModelId> {
        rows.sort_by(|(a_id, a), (b_id, b)| {
            self.order
                .iter()
                .enumerate()
                .map(|(i, order)| order.compare(a[i].as_ref(), b[i].as_ref()))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a_id.cmp(b_id))
        });
        let limit = self.limit.unwrap_or(usize::MAX);
        rows.into_iter().take(limit).map(|(id, _)| id).collect()
    }
}

impl fmt::Display for DataQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)?;
        for m in &self.matchers {
            write!(f, " [{}]", m)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKind;

    fn ids(list: &[u64]) -> Vec<ModelId> {
        list.iter().copied().map(ModelId::new).collect()
    }

    #[test]
    fn test_order_and_limit() {
        let priority = PropertyDescriptor::new("priority", PropertyKind::Integer);
        let query = DataQuery::new(DataModelCategory::any())
            .order_by(OrderSpecifier::descending(priority))
            .with_limit(2);

        let rows = vec![
            (ModelId::new(1), vec![Some(PropertyValue::Integer(5))]),
            (ModelId::new(2), vec![Some(PropertyValue::Integer(9))]),
            (ModelId::new(3), vec![None]),
            (ModelId::new(4), vec![Some(PropertyValue::Integer(7))]),
        ];
        assert_eq!(query.order_and_limit(rows), ids(&[2, 4]));
    }

    #[test]
    fn test_missing_values_sort_last_ascending() {
        let name = PropertyDescriptor::new("name", PropertyKind::Text);
        let query =
            DataQuery::new(DataModelCategory::any()).order_by(OrderSpecifier::ascending(name));
        let rows = vec![
            (ModelId::new(1), vec![None]),
            (ModelId::new(2), vec![Some(PropertyValue::Text("b".into()))]),
            (ModelId::new(3), vec![Some(PropertyValue::Text("a".into()))]),
        ];
        assert_eq!(query.order_and_limit(rows), ids(&[3, 2, 1]));
    }

    #[test]
    fn test_no_order_sorts_by_id() {
        let query = DataQuery::new(DataModelCategory::any());
        let rows = vec![(ModelId::new(9), vec![]), (ModelId::new(3), vec![])];
        assert_eq!(query.order_and_limit(rows), ids(&[3, 9]));
    }
}
