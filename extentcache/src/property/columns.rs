//! Array-of-columns accessor for bulk tabular deposits.

use std::collections::BTreeSet;

use super::{AccessorError, PropertyAccessor, PropertyDescriptor, PropertyKind, PropertyValue};

type ExtractRow<S> = Box<dyn Fn(&S) -> Vec<Option<PropertyValue>> + Send + Sync>;

/// Reads a row of typed columns, of which only a declared subset is active.
///
/// The produced value always has one entry per declared column. Inactive
/// columns are `None` regardless of what the source holds.
pub struct ColumnArrayAccessor<S> {
    descriptor: PropertyDescriptor,
    columns: Vec<PropertyDescriptor>,
    active: BTreeSet<usize>,
    extract: ExtractRow<S>,
}

impl<S> ColumnArrayAccessor<S> {
    /// # Errors
    ///
    /// Returns [`AccessorError::InvalidColumn`] if an active index is out of
    /// range.
    pub fn new<F>(
        name: &str,
        columns: Vec<PropertyDescriptor>,
        active: impl IntoIterator<Item = usize>,
        extract: F,
    ) -> Result<Self, AccessorError>
    where
        F: Fn(&S) -> Vec<Option<PropertyValue>> + Send + Sync + 'static,
    {
        let active: BTreeSet<usize> = active.into_iter().collect();
        if let Some(&index) = active.iter().find(|&&i| i >= columns.len()) {
            return Err(AccessorError::InvalidColumn {
                index,
                count: columns.len(),
            });
        }
        Ok(Self {
            descriptor: PropertyDescriptor::new(name, PropertyKind::Columns),
            columns,
            active,
            extract: Box::new(extract),
        })
    }

    pub fn columns(&self) -> &[PropertyDescriptor] {
        &self.columns
    }

    pub fn active_columns(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.active.iter().map(move |&i| &self.columns[i])
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(&index)
    }

    /// Index of a column by descriptor.
    pub fn column_index(&self, descriptor: &PropertyDescriptor) -> Option<usize> {
        self.columns.iter().position(|c| c == descriptor)
    }

    /// Read a single active column.
    pub fn column(&self, source: &S, index: usize) -> Option<PropertyValue> {
        if !self.is_active(index) {
            return None;
        }
        (self.extract)(source).into_iter().nth(index).flatten()
    }
}

impl<S> PropertyAccessor<S> for ColumnArrayAccessor<S> {
    fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    fn access(&self, source: &S) -> PropertyValue {
        let row = (self.extract)(source);
        let values = (0..self.columns.len())
            .map(|i| {
                if self.is_active(i) {
                    row.get(i).cloned().flatten()
                } else {
                    None
                }
            })
            .collect();
        PropertyValue::Columns(values)
    }

    fn checked_access(&self, source: &S) -> Result<PropertyValue, AccessorError> {
        let row = (self.extract)(source);
        if row.len() != self.columns.len() {
            return Err(AccessorError::ColumnCount {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        let mut values = Vec::with_capacity(row.len());
        for (index, (column, value)) in self.columns.iter().zip(row).enumerate() {
            if !self.is_active(index) {
                values.push(None);
                continue;
            }
            let value = value.ok_or_else(|| AccessorError::MissingColumnValue(column.clone()))?;
            if value.kind() != column.kind() {
                return Err(AccessorError::TypeMismatch {
                    descriptor: column.clone(),
                    actual: value.kind(),
                });
            }
            values.push(Some(value));
        }
        Ok(PropertyValue::Columns(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Row = (i64, String, f64);

    fn columns() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new("id", PropertyKind::Integer),
            PropertyDescriptor::new("name", PropertyKind::Text),
            PropertyDescriptor::new("value", PropertyKind::Float),
        ]
    }

    fn accessor(active: Vec<usize>) -> Result<ColumnArrayAccessor<Row>, AccessorError> {
        ColumnArrayAccessor::new("row", columns(), active, |r: &Row| {
            vec![
                Some(PropertyValue::Integer(r.0)),
                Some(PropertyValue::Text(r.1.clone())),
                Some(PropertyValue::Float(r.2)),
            ]
        })
    }

    #[test]
    fn test_inactive_columns_are_none() {
        let accessor = accessor(vec![0, 2]).unwrap();
        let row: Row = (7, "x".into(), 1.5);
        assert_eq!(
            accessor.checked_access(&row).unwrap(),
            PropertyValue::Columns(vec![
                Some(PropertyValue::Integer(7)),
                None,
                Some(PropertyValue::Float(1.5)),
            ])
        );
        assert_eq!(accessor.column(&row, 1), None);
        assert_eq!(accessor.column(&row, 2), Some(PropertyValue::Float(1.5)));
        assert_eq!(accessor.active_columns().count(), 2);
    }

    #[test]
    fn test_invalid_active_index() {
        assert!(matches!(
            accessor(vec![3]),
            Err(AccessorError::InvalidColumn { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_column_type_checked() {
        let wrong = ColumnArrayAccessor::new("row", columns(), [1], |_: &Row| {
            vec![None, Some(PropertyValue::Integer(1)), None]
        })
        .unwrap();
        assert!(matches!(
            wrong.checked_access(&(0, String::new(), 0.0)),
            Err(AccessorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_short_row_rejected() {
        let short = ColumnArrayAccessor::new("row", columns(), [0], |_: &Row| {
            vec![Some(PropertyValue::Integer(1))]
        })
        .unwrap();
        assert!(matches!(
            short.checked_access(&(0, String::new(), 0.0)),
            Err(AccessorError::ColumnCount { expected: 3, actual: 1 })
        ));
    }
}
