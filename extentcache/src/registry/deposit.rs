//! Cache deposits: validated batches of objects submitted for storage.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::DataModelCategory;
use crate::interval::IntervalValueSet;
use crate::property::{AccessorError, PropertyAccessor, PropertyDescriptor, PropertyValue};

/// How long deposited data stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Never,
    After(Duration),
}

/// What happens to previously stored data of the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepositMode {
    /// Add alongside existing data.
    #[default]
    Merge,
    /// Drop existing data and coverage for the category first.
    Replace,
}

/// Errors raised while building a deposit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DepositError {
    #[error("Object {object} failed accessor check: {source}")]
    Accessor {
        object: usize,
        #[source]
        source: AccessorError,
    },

    #[error("Property {0} has more than one accessor")]
    DuplicateDescriptor(PropertyDescriptor),
}

/// A typed batch of source objects plus the accessors that index them.
///
/// Every accessor is evaluated against every object when the deposit is
/// built, so a deposit that exists is known to be type-correct and within
/// the declared extents.
pub struct CacheDeposit<S> {
    category: DataModelCategory,
    descriptors: Vec<PropertyDescriptor>,
    objects: Vec<S>,
    values: Vec<Vec<PropertyValue>>,
    persist: bool,
    expiration: Option<Expiration>,
    mode: DepositMode,
    coverage: Option<IntervalValueSet>,
}

impl<S> CacheDeposit<S> {
    /// Build and validate a deposit.
    ///
    /// # Errors
    ///
    /// Returns [`DepositError::Accessor`] for the first object whose value
    /// fails its accessor's declaration, or
    /// [`DepositError::DuplicateDescriptor`] if two accessors share a
    /// descriptor.
    pub fn new(
        category: DataModelCategory,
        accessors: Vec<Arc<dyn PropertyAccessor<S>>>,
        objects: Vec<S>,
    ) -> Result<Self, DepositError> {
        let mut descriptors: Vec<PropertyDescriptor> = Vec::with_capacity(accessors.len());
        for accessor in &accessors {
            let descriptor = accessor.descriptor();
            if descriptors.contains(descriptor) {
                return Err(DepositError::DuplicateDescriptor(descriptor.clone()));
            }
            descriptors.push(descriptor.clone());
        }

        let values = objects
            .iter()
            .enumerate()
            .map(|(object, source)| {
                accessors
                    .iter()
                    .map(|a| a.checked_access(source))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| DepositError::Accessor { object, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            category,
            descriptors,
            objects,
            values,
            persist: false,
            expiration: None,
            mode: DepositMode::Merge,
            coverage: None,
        })
    }

    /// Keep the data past [`end_session`](super::DataRegistry::end_session).
    pub fn persist_beyond_session(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Override the registry's default expiration.
    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_mode(mut self, mode: DepositMode) -> Self {
        self.mode = mode;
        self
    }

    /// Declare the deposit complete for the given extents.
    ///
    /// Only deposits added directly need this; data received for a query is
    /// credited with the query's extents.
    pub fn with_coverage(mut self, coverage: IntervalValueSet) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn category(&self) -> &DataModelCategory {
        &self.category
    }

    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    pub fn objects(&self) -> &[S] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn persists(&self) -> bool {
        self.persist
    }

    pub fn expiration(&self) -> Option<Expiration> {
        self.expiration
    }

    pub fn mode(&self) -> DepositMode {
        self.mode
    }

    pub fn coverage(&self) -> Option<&IntervalValueSet> {
        self.coverage.as_ref()
    }

    /// Split into the parts the store keeps.
    pub(crate) fn into_parts(self) -> DepositParts<S> {
        DepositParts {
            category: self.category,
            descriptors: self.descriptors,
            rows: self.objects.into_iter().zip(self.values).collect(),
            persist: self.persist,
            expiration: self.expiration,
            mode: self.mode,
            coverage: self.coverage,
        }
    }
}

pub(crate) struct DepositParts<S> {
    pub category: DataModelCategory,
    pub descriptors: Vec<PropertyDescriptor>,
    pub rows: Vec<(S, Vec<PropertyValue>)>,
    pub persist: bool,
    pub expiration: Option<Expiration>,
    pub mode: DepositMode,
    pub coverage: Option<IntervalValueSet>,
}
