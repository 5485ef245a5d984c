//! Provider contract: the collaborators that fetch data for the registry.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;

use tokio_util::sync::CancellationToken;

use super::data_registry::RegistryInner;
use super::store::OpId;
use super::{CacheDeposit, DataModelCategory, ModelId, OrderSpecifier, ProviderError};
use crate::interval::{IntervalMatcher, IntervalValueSet};
use crate::property::PropertyDescriptor;
use crate::satisfaction::Satisfaction;
use crate::span::TimeSpan;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of data for one or more categories.
///
/// Providers are registered with
/// [`DataRegistry::register_provider`](super::DataRegistry::register_provider)
/// and only ever see the part of a query that local storage cannot answer.
pub trait DataProvider: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this provider answers queries for `category`.
    fn provides_data_for(&self, category: &DataModelCategory) -> bool;

    /// The parts of `requested` this provider takes on.
    ///
    /// The default claims every requested set whole. Providers that track
    /// their own coverage may return less; a provider returning nothing is
    /// not called for that piece. A piece no provider claims fails the query
    /// with `NoProvider`.
    fn satisfactions(
        &self,
        _category: &DataModelCategory,
        requested: &[IntervalValueSet],
    ) -> Vec<Satisfaction> {
        requested.iter().cloned().map(Satisfaction::new).collect()
    }

    /// Fetch data for the query and push it into `receiver`.
    fn query(
        &self,
        query: ProviderQuery,
        receiver: DepositReceiver,
    ) -> BoxFuture<'_, Result<(), ProviderError>>;
}

/// One provider call: a single remainder piece of a registry query.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    pub category: DataModelCategory,
    pub satisfactions: Vec<Satisfaction>,
    /// Conjunction of matchers selecting the remainder piece
    pub matchers: Vec<IntervalMatcher>,
    pub order: Vec<OrderSpecifier>,
    pub limit: Option<usize>,
    pub properties: Vec<PropertyDescriptor>,
    /// Cancelled when the operation is aborted or times out
    pub cancellation: CancellationToken,
}

impl ProviderQuery {
    /// The interval scope of the matchers.
    pub fn scope(&self) -> IntervalValueSet {
        IntervalValueSet::from_matchers(&self.matchers)
    }

    /// The time span requested for a property, if it is constrained.
    pub fn time_span(&self, descriptor: &PropertyDescriptor) -> Option<TimeSpan> {
        self.matchers
            .iter()
            .filter(|m| m.descriptor() == descriptor)
            .find_map(|m| m.operand().as_time().copied())
    }
}

/// Sink through which providers hand fetched data to the registry.
#[derive(Clone)]
pub struct DepositReceiver {
    registry: Weak<RegistryInner>,
    op: OpId,
}

impl DepositReceiver {
    pub(crate) fn new(registry: Weak<RegistryInner>, op: OpId) -> Self {
        Self { registry, op }
    }

    /// Store a deposit and return the identifiers of its objects.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if the operation was cancelled,
    /// in which case the deposit is discarded, or
    /// [`ProviderError::RegistryClosed`] if the registry is gone.
    pub fn receive<S>(&self, deposit: CacheDeposit<S>) -> Result<Vec<ModelId>, ProviderError>
    where
        S: Send + Sync + 'static,
    {
        let registry = self.registry.upgrade().ok_or(ProviderError::RegistryClosed)?;
        registry.ingest(deposit, Some(self.op))
    }
}

impl fmt::Debug for DepositReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepositReceiver").field("op", &self.op).finish()
    }
}

/// Registration of a provider. Dropping it unregisters the provider.
#[must_use = "dropping the handle unregisters the provider"]
pub struct ProviderHandle {
    registry: Weak<RegistryInner>,
    id: u64,
    name: String,
}

impl ProviderHandle {
    pub(crate) fn new(registry: Weak<RegistryInner>, id: u64, name: String) -> Self {
        Self { registry, id, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the provider from the registry.
    pub fn unregister(self) {
        drop(self);
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister_provider(self.id, &self.name);
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
