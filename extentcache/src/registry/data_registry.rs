//! The data registry: satisfaction, dedup, dispatch and ingest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::deposit::DepositParts;
use super::store::{
    CoverageEntry, DepositId, DepositRecord, InFlightOp, OpCredit, OpId, OpStatus, RegistryState,
    StoredModel,
};
use super::{
    CacheDeposit, DataModelCategory, DataProvider, DataQuery, DepositMode, DepositReceiver,
    Expiration, ModelId, ProviderError, ProviderHandle, ProviderQuery, QueryOutcome, QueryTracker,
    RegistryConfig, RegistryError, RegistryStats, RegistryStatsSnapshot,
};
use crate::interval::{
    signature_of, IntervalMatcher, IntervalValueSet, MatchOperator, MatcherSignature,
    SpatialOperator, TimeMatchMode,
};
use crate::property::{PropertyDescriptor, PropertyValue};
use crate::satisfaction::{SatisfactionEngine, SatisfactionStrategy};

/// How stored coverage may answer a query, decided by its operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoverageMode {
    /// General time and spatial-intersects matchers: pieces can be fetched
    /// separately and recombined.
    Decomposable,
    /// Strict time matchers: a covering superset answers the query, but the
    /// request cannot be split.
    Contained,
    /// Spatial-equals matchers: only an identical scope answers the query.
    Exact,
}

impl CoverageMode {
    fn for_signature(signature: &[MatcherSignature]) -> Self {
        let has = |op: MatchOperator| signature.iter().any(|s| s.operator == op);
        if has(MatchOperator::Spatial(SpatialOperator::Equals)) {
            Self::Exact
        } else if has(MatchOperator::Time(TimeMatchMode::Strict)) {
            Self::Contained
        } else {
            Self::Decomposable
        }
    }
}

struct RegisteredProvider {
    id: u64,
    provider: Arc<dyn DataProvider>,
}

/// An operation registered in the in-flight table, ready to run.
struct OpLaunch {
    id: OpId,
    pieces: Vec<IntervalValueSet>,
    token: CancellationToken,
    sender: watch::Sender<OpStatus>,
}

#[derive(Default)]
struct QueryPlan {
    attached: Vec<watch::Receiver<OpStatus>>,
    launch: Option<OpLaunch>,
    /// Remainder left with nobody to fetch it.
    unserved: bool,
}

#[derive(Debug, Default)]
struct IdSource {
    model: AtomicU64,
    deposit: AtomicU64,
    op: AtomicU64,
    query: AtomicU64,
    provider: AtomicU64,
}

impl IdSource {
    fn next(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub(crate) struct RegistryInner {
    config: RegistryConfig,
    handle: Handle,
    /// Coverage, deposit records and in-flight operations. Held across
    /// satisfaction, dedup and ingest so they observe each other atomically.
    state: Mutex<RegistryState>,
    models: DashMap<ModelId, StoredModel>,
    providers: RwLock<Vec<RegisteredProvider>>,
    ids: IdSource,
    stats: RegistryStats,
}

/// Shared, cheaply cloneable registry of cached data and providers.
///
/// # Example
///
/// ```ignore
/// let registry = DataRegistry::new(RegistryConfig::default())?;
/// let _handle = registry.register_provider(Arc::new(MyProvider::new()));
///
/// let query = DataQuery::new(category).with_matcher(
///     IntervalMatcher::time(PropertyDescriptor::time("when"), span, TimeMatchMode::General)?,
/// );
/// let ids = registry.submit_query(query).wait().await.into_result()?;
/// ```
#[derive(Clone)]
pub struct DataRegistry {
    inner: Arc<RegistryInner>,
}

impl DataRegistry {
    /// Create a registry that dispatches on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoRuntime`] outside a runtime context.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let handle = Handle::try_current().map_err(|e| RegistryError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(config, handle))
    }

    /// Create a registry that dispatches on the given runtime.
    pub fn with_handle(config: RegistryConfig, handle: Handle) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                handle,
                state: Mutex::new(RegistryState::default()),
                models: DashMap::new(),
                providers: RwLock::new(Vec::new()),
                ids: IdSource::default(),
                stats: RegistryStats::new(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// Register a provider. It stays registered while the handle lives.
    pub fn register_provider(&self, provider: Arc<dyn DataProvider>) -> ProviderHandle {
        let id = IdSource::next(&self.inner.ids.provider);
        let name = provider.name().to_string();
        self.inner
            .providers
            .write()
            .push(RegisteredProvider { id, provider });
        info!(provider = %name, "Registered data provider");
        ProviderHandle::new(Arc::downgrade(&self.inner), id, name)
    }

    pub fn provider_count(&self) -> usize {
        self.inner.providers.read().len()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Submit a query.
    ///
    /// Stored coverage answers what it can; only the remainder reaches
    /// providers, and a remainder already being fetched by another query is
    /// joined rather than fetched twice.
    pub fn submit_query(&self, query: DataQuery) -> QueryTracker {
        let inner = &self.inner;
        inner.stats.query_submitted();

        let (tracker, publisher) =
            QueryTracker::new(IdSource::next(&inner.ids.query), inner.handle.clone());
        let request = query.scope();
        let signature = signature_of(query.matchers());
        let providers = inner.providers_for(query.category());

        let plan = inner.plan(&query, &request, &signature, !providers.is_empty());

        if plan.unserved {
            warn!(query = %query, "No provider for unsatisfied query");
            inner.stats.failed();
            publisher.publish(QueryOutcome::Failed(RegistryError::NoProvider(
                query.category().clone(),
            )));
            return tracker;
        }

        if plan.attached.is_empty() && plan.launch.is_none() {
            inner.stats.satisfied_locally();
            let ids = inner.local_query(&query);
            debug!(query = %query, results = ids.len(), "Query satisfied locally");
            publisher.publish(QueryOutcome::Succeeded(ids));
            return tracker;
        }

        if !plan.attached.is_empty() {
            inner.stats.coalesced(1);
            debug!(
                query = %query,
                operations = plan.attached.len(),
                "Query attached to in-flight fetch"
            );
        }

        let mut waits = plan.attached;
        let owned = plan.launch.map(|launch| {
            waits.push(launch.sender.subscribe());
            let token = launch.token.clone();
            inner.spawn_operation(launch, query.clone(), signature, providers);
            token
        });

        let driver = Arc::clone(inner);
        let cancel = tracker.cancellation_token();
        inner.handle.spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => QueryOutcome::Cancelled,
                result = wait_for_operations(waits) => match result {
                    Ok(()) => QueryOutcome::Succeeded(driver.local_query(&query)),
                    Err(RegistryError::Cancelled) => QueryOutcome::Cancelled,
                    Err(err) => QueryOutcome::Failed(err),
                },
            };
            match &outcome {
                QueryOutcome::Cancelled => {
                    if let Some(token) = owned {
                        token.cancel();
                    }
                    driver.stats.cancelled();
                }
                QueryOutcome::Failed(err) => {
                    warn!(query = %query, error = %err, "Query failed");
                    driver.stats.failed();
                }
                QueryOutcome::Succeeded(_) => {}
            }
            publisher.publish(outcome);
        });

        tracker
    }

    /// Answer a query from stored data only. Providers are never called.
    pub fn perform_local_query(&self, query: &DataQuery) -> Vec<ModelId> {
        self.inner.local_query(query)
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Store a deposit directly, outside any query.
    pub fn add_deposit<S>(&self, deposit: CacheDeposit<S>) -> Vec<ModelId>
    where
        S: Send + Sync + 'static,
    {
        self.inner.ingest(deposit, None).unwrap_or_default()
    }

    /// Typed source objects for the given ids. Unknown ids and objects of
    /// another type are skipped.
    pub fn get_objects<S>(&self, ids: &[ModelId]) -> Vec<Arc<S>>
    where
        S: Send + Sync + 'static,
    {
        ids.iter()
            .filter_map(|id| {
                let model = self.inner.models.get(id)?;
                Arc::clone(&model.object).downcast::<S>().ok()
            })
            .collect()
    }

    /// Indexed values of one property for the given ids.
    pub fn property_values(
        &self,
        ids: &[ModelId],
        descriptor: &PropertyDescriptor,
    ) -> Vec<(ModelId, PropertyValue)> {
        ids.iter()
            .filter_map(|id| {
                let model = self.inner.models.get(id)?;
                model.property(descriptor).map(|v| (*id, v.clone()))
            })
            .collect()
    }

    /// Evict objects selected by the matchers and forget their coverage.
    ///
    /// Time matchers are applied strictly, so objects reaching outside the
    /// evicted spans are kept. Returns the number of objects removed.
    pub fn remove_matching(
        &self,
        category: &DataModelCategory,
        matchers: &[IntervalMatcher],
    ) -> usize {
        self.inner.remove_matching(category, matchers)
    }

    /// Drop everything not marked to persist beyond the session.
    pub fn end_session(&self) -> usize {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        state.coverage.retain(|entry| entry.persist);
        let doomed: Vec<DepositId> = state
            .deposits
            .iter()
            .filter(|(_, record)| !record.persist)
            .map(|(id, _)| *id)
            .collect();
        let removed = inner.remove_deposits_locked(&mut state, &doomed);
        info!(removed, "Session ended");
        removed
    }

    /// Remove expired objects and coverage.
    pub fn purge_expired(&self) -> usize {
        let inner = &self.inner;
        let now = Instant::now();
        let mut state = inner.state.lock();
        state.coverage.retain(|entry| entry.is_live(now));
        let doomed: Vec<DepositId> = state
            .deposits
            .iter()
            .filter(|(_, record)| record.expires_at.is_some_and(|at| at <= now))
            .map(|(id, _)| *id)
            .collect();
        let removed = inner.remove_deposits_locked(&mut state, &doomed);
        if removed > 0 {
            debug!(removed, "Purged expired objects");
        }
        removed
    }

    /// Remove all data and coverage for categories within `category`.
    pub fn clear_category(&self, category: &DataModelCategory) -> usize {
        let mut state = self.inner.state.lock();
        self.inner.clear_category_locked(&mut state, category)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn model_count(&self) -> usize {
        self.inner.models.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().ops.len()
    }

    /// Live coverage recorded for categories within `category`.
    pub fn coverage(&self, category: &DataModelCategory) -> Vec<IntervalValueSet> {
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .coverage
            .iter()
            .filter(|entry| entry.is_live(now) && category.covers(&entry.category))
            .map(|entry| entry.intervals.clone())
            .collect()
    }

    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn log_stats(&self) {
        self.inner.stats.snapshot().log();
    }
}

impl std::fmt::Debug for DataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRegistry")
            .field("config", &self.inner.config)
            .field("models", &self.inner.models.len())
            .finish()
    }
}

impl RegistryInner {
    fn providers_for(&self, category: &DataModelCategory) -> Vec<Arc<dyn DataProvider>> {
        self.providers
            .read()
            .iter()
            .filter(|p| p.provider.provides_data_for(category))
            .map(|p| Arc::clone(&p.provider))
            .collect()
    }

    pub(crate) fn unregister_provider(&self, id: u64, name: &str) {
        self.providers.write().retain(|p| p.id != id);
        info!(provider = %name, "Unregistered data provider");
    }

    /// Satisfaction and dedup under one lock, registering a new operation
    /// for whatever remains.
    fn plan(
        &self,
        query: &DataQuery,
        request: &IntervalValueSet,
        signature: &[MatcherSignature],
        has_providers: bool,
    ) -> QueryPlan {
        let now = Instant::now();
        let category = query.category();
        let mode = CoverageMode::for_signature(signature);
        let splittable = mode == CoverageMode::Decomposable
            && self.config.satisfaction == SatisfactionStrategy::FineGrained;

        let mut state = self.state.lock();

        let covered: Vec<IntervalValueSet> = state
            .coverage
            .iter()
            .filter(|entry| entry.applies_to(category, signature, now))
            .map(|entry| entry.intervals.clone())
            .collect();

        let mut remainder = match mode {
            CoverageMode::Exact => {
                if request.is_void() || covered.iter().any(|c| c.same_extent(request)) {
                    Vec::new()
                } else {
                    vec![request.clone()]
                }
            }
            _ => {
                let strategy = if splittable {
                    SatisfactionStrategy::FineGrained
                } else {
                    SatisfactionStrategy::Single
                };
                SatisfactionEngine::new(strategy)
                    .compute(request, &covered)
                    .remainder
            }
        };

        let mut plan = QueryPlan::default();
        for op in state.ops.values() {
            if remainder.is_empty() {
                break;
            }
            if !op.joinable(category, signature) {
                continue;
            }
            let joins = match mode {
                CoverageMode::Exact => op.pieces.len() == 1 && op.pieces[0].same_extent(request),
                _ if splittable => remainder
                    .iter()
                    .any(|r| op.pieces.iter().any(|p| r.intersection(p).is_some())),
                _ => request.is_covered_by(&op.pieces),
            };
            if !joins {
                continue;
            }
            plan.attached.push(op.status.clone());
            remainder = if splittable {
                remainder
                    .iter()
                    .flat_map(|r| subtract_all(r, &op.pieces))
                    .collect()
            } else {
                Vec::new()
            };
        }

        if remainder.is_empty() {
            return plan;
        }
        if !has_providers {
            plan.unserved = true;
            return plan;
        }

        let pieces: Vec<IntervalValueSet> =
            remainder.iter().flat_map(IntervalValueSet::split).collect();
        let id = IdSource::next(&self.ids.op);
        let token = CancellationToken::new();
        let (sender, receiver) = watch::channel(OpStatus::Pending);
        state.ops.insert(
            id,
            InFlightOp {
                category: category.clone(),
                signature: signature.to_vec(),
                pieces: pieces.clone(),
                complete: query.limit().is_none(),
                token: token.clone(),
                status: receiver,
                credit: OpCredit::default(),
            },
        );
        debug!(op = id, query = %query, pieces = pieces.len(), "Registered fetch operation");

        plan.launch = Some(OpLaunch {
            id,
            pieces,
            token,
            sender,
        });
        plan
    }

    fn spawn_operation(
        self: &Arc<Self>,
        launch: OpLaunch,
        query: DataQuery,
        signature: Vec<MatcherSignature>,
        providers: Vec<Arc<dyn DataProvider>>,
    ) {
        self.stats.operation_started();
        let inner = Arc::clone(self);
        self.handle.spawn(async move {
            let OpLaunch {
                id,
                pieces,
                token,
                sender,
            } = launch;

            let work = inner.run_pieces(id, &query, &signature, &pieces, &providers, &token);
            let results = tokio::select! {
                _ = token.cancelled() => None,
                results = work => Some(results),
            };

            let status = inner.complete_operation(id, &pieces, results);
            sender.send_replace(status);
        });
    }

    /// One provider call per (piece, claiming provider). A piece succeeds
    /// when all of its calls succeed; a piece no provider claims fails with
    /// `NoProvider` and earns no coverage.
    async fn run_pieces(
        self: &Arc<Self>,
        id: OpId,
        query: &DataQuery,
        signature: &[MatcherSignature],
        pieces: &[IntervalValueSet],
        providers: &[Arc<dyn DataProvider>],
        token: &CancellationToken,
    ) -> Vec<Result<(), RegistryError>> {
        let calls = pieces.iter().map(|piece| {
            let matchers = piece.to_matchers(signature);
            let dispatches: Vec<_> = providers
                .iter()
                .filter_map(|provider| {
                    let satisfactions =
                        provider.satisfactions(query.category(), std::slice::from_ref(piece));
                    if satisfactions.is_empty() {
                        return None;
                    }
                    let provider_query = ProviderQuery {
                        category: query.category().clone(),
                        satisfactions,
                        matchers: matchers.clone(),
                        order: query.order().to_vec(),
                        limit: query.limit(),
                        properties: query.properties().to_vec(),
                        cancellation: token.child_token(),
                    };
                    let receiver = DepositReceiver::new(Arc::downgrade(self), id);
                    Some(self.dispatch(Arc::clone(provider), provider_query, receiver))
                })
                .collect();
            let category = query.category().clone();
            async move {
                if dispatches.is_empty() {
                    return Err(RegistryError::NoProvider(category));
                }
                join_all(dispatches)
                    .await
                    .into_iter()
                    .collect::<Result<Vec<()>, RegistryError>>()
                    .map(|_| ())
            }
        });
        join_all(calls).await
    }

    async fn dispatch(
        &self,
        provider: Arc<dyn DataProvider>,
        query: ProviderQuery,
        receiver: DepositReceiver,
    ) -> Result<(), RegistryError> {
        self.stats.provider_dispatched();
        debug!(
            provider = provider.name(),
            matchers = query.matchers.len(),
            "Dispatching to provider"
        );

        let call = provider.query(query, receiver);
        let result = match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ProviderError::Timeout(limit))),
            None => call.await,
        };
        result.map_err(|source| RegistryError::Provider {
            provider: provider.name().to_string(),
            source,
        })
    }

    /// Retire an operation. Coverage is credited only for pieces that
    /// succeeded in an operation that was not cancelled.
    fn complete_operation(
        &self,
        id: OpId,
        pieces: &[IntervalValueSet],
        results: Option<Vec<Result<(), RegistryError>>>,
    ) -> OpStatus {
        let mut state = self.state.lock();
        let Some(op) = state.ops.remove(&id) else {
            return OpStatus::Cancelled;
        };

        let results = match results {
            Some(results) if !op.token.is_cancelled() => results,
            _ => {
                debug!(op = id, "Fetch operation cancelled");
                return OpStatus::Cancelled;
            }
        };

        if op.complete {
            let expires_at = op.credit.expires_at.or_else(|| self.default_expiry(Instant::now()));
            for (piece, result) in pieces.iter().zip(&results) {
                if result.is_ok() {
                    state.coverage.push(CoverageEntry {
                        category: op.category.clone(),
                        signature: op.signature.clone(),
                        intervals: piece.clone(),
                        persist: op.credit.persists(),
                        expires_at,
                    });
                }
            }
        }

        match results.into_iter().find_map(Result::err) {
            Some(err) => {
                warn!(op = id, error = %err, "Fetch operation failed");
                OpStatus::Failed(err)
            }
            None => {
                debug!(op = id, deposits = op.credit.deposits, "Fetch operation completed");
                OpStatus::Succeeded
            }
        }
    }

    fn default_expiry(&self, now: Instant) -> Option<Instant> {
        self.config.default_expiration.map(|d| now + d)
    }

    /// Store a deposit, optionally on behalf of an in-flight operation.
    pub(crate) fn ingest<S>(
        &self,
        deposit: CacheDeposit<S>,
        op: Option<OpId>,
    ) -> Result<Vec<ModelId>, ProviderError>
    where
        S: Send + Sync + 'static,
    {
        let DepositParts {
            category,
            descriptors,
            rows,
            persist,
            expiration,
            mode,
            coverage,
        } = deposit.into_parts();

        let now = Instant::now();
        let expires_at = match expiration {
            Some(Expiration::Never) => None,
            Some(Expiration::After(d)) => Some(now + d),
            None => self.default_expiry(now),
        };

        let mut state = self.state.lock();

        if let Some(op_id) = op {
            match state.ops.get_mut(&op_id) {
                Some(op) if !op.token.is_cancelled() => op.credit.record(persist, expires_at),
                _ => {
                    self.stats.deposit_discarded();
                    debug!(
                        op = op_id,
                        objects = rows.len(),
                        "Discarding deposit for cancelled operation"
                    );
                    return Err(ProviderError::Cancelled);
                }
            }
        }

        if mode == DepositMode::Replace {
            let removed = self.replace_category_locked(&mut state, &category);
            debug!(category = %category, removed, "Replacing stored data");
        }

        let deposit_id = IdSource::next(&self.ids.deposit);
        let mut ids = Vec::with_capacity(rows.len());
        for (object, values) in rows {
            let id = ModelId::new(IdSource::next(&self.ids.model));
            self.models.insert(
                id,
                StoredModel {
                    deposit: deposit_id,
                    category: category.clone(),
                    object: Arc::new(object),
                    values: descriptors.iter().cloned().zip(values).collect(),
                    expires_at,
                },
            );
            ids.push(id);
        }

        if let Some(intervals) = coverage {
            let signature = signature_of(&intervals.to_matchers(&[]));
            state.coverage.push(CoverageEntry {
                category: category.clone(),
                signature,
                intervals,
                persist,
                expires_at,
            });
        }

        state.deposits.insert(
            deposit_id,
            DepositRecord {
                category,
                models: ids.clone(),
                persist,
                expires_at,
            },
        );
        self.stats.deposit_stored(ids.len());
        Ok(ids)
    }

    fn local_query(&self, query: &DataQuery) -> Vec<ModelId> {
        let now = Instant::now();
        let rows = self
            .models
            .iter()
            .filter(|entry| {
                let model = entry.value();
                model.is_live(now) && model.selected_by(query.category(), query.matchers())
            })
            .map(|entry| {
                let model = entry.value();
                let keys = query
                    .order()
                    .iter()
                    .map(|o| model.property(&o.descriptor).cloned())
                    .collect();
                (*entry.key(), keys)
            })
            .collect();
        query.order_and_limit(rows)
    }

    fn remove_matching(&self, category: &DataModelCategory, matchers: &[IntervalMatcher]) -> usize {
        let eviction: Vec<IntervalMatcher> = matchers
            .iter()
            .map(|m| match m.operator() {
                MatchOperator::Time(_) => IntervalMatcher::from_parts(
                    m.descriptor().clone(),
                    MatchOperator::Time(TimeMatchMode::Strict),
                    m.operand().clone(),
                ),
                MatchOperator::Spatial(_) => m.clone(),
            })
            .collect();
        let scope = IntervalValueSet::from_matchers(matchers);

        let mut state = self.state.lock();

        let coverage = std::mem::take(&mut state.coverage);
        state.coverage = coverage
            .into_iter()
            .flat_map(|entry| {
                if !category.covers(&entry.category) {
                    return vec![entry];
                }
                entry
                    .intervals
                    .subtract(&scope)
                    .into_iter()
                    .map(|intervals| CoverageEntry {
                        intervals,
                        ..entry.clone()
                    })
                    .collect()
            })
            .collect();

        let doomed: Vec<ModelId> = self
            .models
            .iter()
            .filter(|entry| entry.value().selected_by(category, &eviction))
            .map(|entry| *entry.key())
            .collect();
        let removed = self.remove_models_locked(&mut state, &doomed);
        debug!(category = %category, removed, "Evicted matching objects");
        removed
    }

    /// Drop deposits and coverage of exactly `category` ahead of a replace.
    fn replace_category_locked(
        &self,
        state: &mut RegistryState,
        category: &DataModelCategory,
    ) -> usize {
        state.coverage.retain(|entry| &entry.category != category);
        let doomed: Vec<DepositId> = state
            .deposits
            .iter()
            .filter(|(_, record)| &record.category == category)
            .map(|(id, _)| *id)
            .collect();
        self.remove_deposits_locked(state, &doomed)
    }

    fn clear_category_locked(
        &self,
        state: &mut RegistryState,
        category: &DataModelCategory,
    ) -> usize {
        state.coverage.retain(|entry| !category.covers(&entry.category));
        let doomed: Vec<DepositId> = state
            .deposits
            .iter()
            .filter(|(_, record)| category.covers(&record.category))
            .map(|(id, _)| *id)
            .collect();
        self.remove_deposits_locked(state, &doomed)
    }

    fn remove_deposits_locked(&self, state: &mut RegistryState, deposits: &[DepositId]) -> usize {
        let mut removed = 0;
        for id in deposits {
            if let Some(record) = state.deposits.remove(id) {
                removed += record
                    .models
                    .iter()
                    .filter(|model| self.models.remove(model).is_some())
                    .count();
            }
        }
        self.stats.objects_evicted(removed);
        removed
    }

    fn remove_models_locked(&self, state: &mut RegistryState, models: &[ModelId]) -> usize {
        let mut removed = 0;
        for id in models {
            let Some((_, model)) = self.models.remove(id) else {
                continue;
            };
            removed += 1;
            if let Some(record) = state.deposits.get_mut(&model.deposit) {
                record.models.retain(|m| m != id);
                if record.models.is_empty() {
                    state.deposits.remove(&model.deposit);
                }
            }
        }
        self.stats.objects_evicted(removed);
        removed
    }
}

fn subtract_all(piece: &IntervalValueSet, cuts: &[IntervalValueSet]) -> Vec<IntervalValueSet> {
    let mut remaining = vec![piece.clone()];
    for cut in cuts {
        remaining = remaining.iter().flat_map(|r| r.subtract(cut)).collect();
        if remaining.is_empty() {
            break;
        }
    }
    remaining
}

/// Wait for every operation; the first failure wins over cancellation.
async fn wait_for_operations(
    receivers: Vec<watch::Receiver<OpStatus>>,
) -> Result<(), RegistryError> {
    let statuses = join_all(receivers.into_iter().map(|mut receiver| async move {
        receiver
            .wait_for(OpStatus::is_terminal)
            .await
            .map(|status| status.clone())
            .unwrap_or(OpStatus::Failed(RegistryError::Abandoned))
    }))
    .await;

    let mut cancelled = false;
    for status in statuses {
        match status {
            OpStatus::Failed(err) => return Err(err),
            OpStatus::Cancelled => cancelled = true,
            OpStatus::Pending | OpStatus::Succeeded => {}
        }
    }
    if cancelled {
        Err(RegistryError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyAccessor, PropertyKind, ScalarAccessor, TimeSpanAccessor};
    use crate::span::TimeSpan;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Event {
        at: i64,
        label: String,
    }

    fn when() -> PropertyDescriptor {
        PropertyDescriptor::time("when")
    }

    fn category() -> DataModelCategory {
        DataModelCategory::new("test", "events", "all")
    }

    fn deposit(times: &[i64]) -> CacheDeposit<Event> {
        let accessors: Vec<Arc<dyn PropertyAccessor<Event>>> = vec![
            Arc::new(TimeSpanAccessor::new("when", TimeSpan::TIMELESS, |e: &Event| {
                TimeSpan::instant(e.at)
            })),
            Arc::new(ScalarAccessor::text("label", |e: &Event| e.label.clone())),
        ];
        let events = times
            .iter()
            .map(|&at| Event {
                at,
                label: format!("e{}", at),
            })
            .collect();
        CacheDeposit::new(category(), accessors, events).unwrap()
    }

    fn general(s: i64, e: i64) -> IntervalMatcher {
        IntervalMatcher::time(when(), TimeSpan::new(s, e).unwrap(), TimeMatchMode::General).unwrap()
    }

    #[tokio::test]
    async fn test_add_deposit_and_local_query() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        let ids = registry.add_deposit(deposit(&[5, 15, 25]));
        assert_eq!(ids.len(), 3);

        let query = DataQuery::new(category()).with_matcher(general(10, 30));
        let found = registry.perform_local_query(&query);
        assert_eq!(found.len(), 2);

        let events: Vec<Arc<Event>> = registry.get_objects(&found);
        assert_eq!(events[0].at, 15);

        let label = PropertyDescriptor::new("label", PropertyKind::Text);
        let labels = registry.property_values(&found, &label);
        assert_eq!(labels[1].1, PropertyValue::Text("e25".into()));
    }

    #[tokio::test]
    async fn test_get_objects_skips_wrong_type() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        let ids = registry.add_deposit(deposit(&[1]));
        let wrong: Vec<Arc<String>> = registry.get_objects(&ids);
        assert!(wrong.is_empty());
    }

    #[tokio::test]
    async fn test_query_without_provider_fails() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        let tracker =
            registry.submit_query(DataQuery::new(category()).with_matcher(general(0, 10)));
        assert!(matches!(
            tracker.wait().await,
            QueryOutcome::Failed(RegistryError::NoProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_declared_coverage_satisfies_without_provider() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        let coverage = IntervalValueSet::new()
            .with(when(), TimeSpan::new(0, 100).unwrap())
            .unwrap();
        registry.add_deposit(deposit(&[10, 20]).with_coverage(coverage));

        let tracker =
            registry.submit_query(DataQuery::new(category()).with_matcher(general(0, 50)));
        let ids = tracker.wait().await.into_result().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(registry.stats().satisfied_locally, 1);
    }

    #[tokio::test]
    async fn test_replace_mode_drops_previous_data() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        registry.add_deposit(deposit(&[1, 2, 3]));
        registry.add_deposit(deposit(&[4]).with_mode(DepositMode::Replace));
        assert_eq!(registry.model_count(), 1);
    }

    #[tokio::test]
    async fn test_end_session_keeps_persistent_data() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        registry.add_deposit(deposit(&[1, 2]));
        registry.add_deposit(deposit(&[3]).persist_beyond_session(true));

        assert_eq!(registry.end_session(), 2);
        assert_eq!(registry.model_count(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        registry.add_deposit(deposit(&[1]).with_expiration(Expiration::After(Duration::ZERO)));
        registry.add_deposit(deposit(&[2]).with_expiration(Expiration::Never));

        let query = DataQuery::new(category());
        assert_eq!(registry.perform_local_query(&query).len(), 1);
        assert_eq!(registry.purge_expired(), 1);
        assert_eq!(registry.model_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_matching_is_strict_and_trims_coverage() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        let coverage = IntervalValueSet::new()
            .with(when(), TimeSpan::new(0, 100).unwrap())
            .unwrap();
        registry.add_deposit(deposit(&[10, 60]).with_coverage(coverage));

        let removed = registry.remove_matching(&category(), &[general(0, 50)]);
        assert_eq!(removed, 1);
        assert_eq!(registry.model_count(), 1);

        let remaining = registry.coverage(&category());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].time_spans(&when()), vec![TimeSpan::new(50, 100).unwrap()]);
    }

    #[tokio::test]
    async fn test_clear_category_with_wildcard() {
        let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
        registry.add_deposit(deposit(&[1, 2]));
        assert_eq!(registry.clear_category(&DataModelCategory::new("test", "*", "*")), 2);
        assert_eq!(registry.model_count(), 0);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(
            DataRegistry::new(RegistryConfig::default()),
            Err(RegistryError::NoRuntime(_))
        ));
    }

    #[test]
    fn test_coverage_mode_from_signature() {
        let loose = vec![general(0, 1).signature()];
        assert_eq!(CoverageMode::for_signature(&loose), CoverageMode::Decomposable);

        let strict = vec![IntervalMatcher::time(when(), TimeSpan::TIMELESS, TimeMatchMode::Strict)
            .unwrap()
            .signature()];
        assert_eq!(CoverageMode::for_signature(&strict), CoverageMode::Contained);
    }
}
