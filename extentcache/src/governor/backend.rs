//! Fetch/evict seam between governors and the data they load.

use tracing::warn;

use super::GovernorError;
use crate::geo::GeoRegion;
use crate::interval::{IntervalError, IntervalMatcher, SpatialOperator, TimeMatchMode};
use crate::property::PropertyDescriptor;
use crate::registry::{BoxFuture, DataModelCategory, DataQuery, DataRegistry, QueryOutcome};
use crate::span::TimeSpan;

/// What a governor loads from and evicts into.
pub trait GovernorBackend: Send + Sync {
    /// Load data for one delta span.
    fn fetch(&self, span: TimeSpan) -> BoxFuture<'_, Result<(), GovernorError>>;

    /// Drop data for spans the consumer no longer wants.
    fn evict(&self, spans: &[TimeSpan]);
}

/// Backend that loads through a [`DataRegistry`] query and evicts with
/// [`DataRegistry::remove_matching`].
#[derive(Clone)]
pub struct RegistryGovernorBackend {
    registry: DataRegistry,
    category: DataModelCategory,
    time: PropertyDescriptor,
    region: Option<(PropertyDescriptor, GeoRegion)>,
}

impl RegistryGovernorBackend {
    /// Backend querying `category` over the time property `time`.
    pub fn new(
        registry: DataRegistry,
        category: DataModelCategory,
        time: PropertyDescriptor,
    ) -> Self {
        Self {
            registry,
            category,
            time,
            region: None,
        }
    }

    /// Restrict fetches and evictions to a geographic region.
    pub fn with_region(mut self, descriptor: PropertyDescriptor, region: GeoRegion) -> Self {
        self.region = Some((descriptor, region));
        self
    }

    pub fn category(&self) -> &DataModelCategory {
        &self.category
    }

    fn matchers(
        &self,
        span: TimeSpan,
        mode: TimeMatchMode,
    ) -> Result<Vec<IntervalMatcher>, IntervalError> {
        let mut matchers = vec![IntervalMatcher::time(self.time.clone(), span, mode)?];
        if let Some((descriptor, region)) = &self.region {
            matchers.push(IntervalMatcher::geometry(
                descriptor.clone(),
                region.clone(),
                SpatialOperator::Intersects,
            )?);
        }
        Ok(matchers)
    }
}

impl GovernorBackend for RegistryGovernorBackend {
    fn fetch(&self, span: TimeSpan) -> BoxFuture<'_, Result<(), GovernorError>> {
        Box::pin(async move {
            let matchers = self.matchers(span, TimeMatchMode::General)?;
            let query = DataQuery::new(self.category.clone()).with_matchers(matchers);
            match self.registry.submit_query(query).wait().await {
                QueryOutcome::Succeeded(_) => Ok(()),
                QueryOutcome::Cancelled => Err(GovernorError::Cancelled),
                QueryOutcome::Failed(err) => Err(GovernorError::Fetch(err.to_string())),
            }
        })
    }

    fn evict(&self, spans: &[TimeSpan]) {
        for span in spans {
            match self.matchers(*span, TimeMatchMode::Strict) {
                Ok(matchers) => {
                    self.registry.remove_matching(&self.category, &matchers);
                }
                Err(err) => warn!(span = %span, error = %err, "Cannot evict span"),
            }
        }
    }
}
