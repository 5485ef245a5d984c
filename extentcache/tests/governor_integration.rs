//! Integration tests for span governors.
//!
//! These tests verify:
//! - Delta fetching and idempotence through the governor manager
//! - Clears racing in-flight fetches
//! - The registry-backed flow: governor → registry → provider, and
//!   eviction back into the registry
//!
//! Run with: `cargo test --test governor_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use extentcache::governor::{
    GovernorBackend, GovernorConfig, GovernorError, GovernorManager, RegistryGovernorBackend,
};
use extentcache::interval::{IntervalMatcher, TimeMatchMode};
use extentcache::property::{PropertyAccessor, PropertyDescriptor, TimeSpanAccessor};
use extentcache::registry::{
    BoxFuture, CacheDeposit, DataModelCategory, DataProvider, DataQuery, DataRegistry,
    DepositReceiver, ProviderError, ProviderQuery, RegistryConfig,
};
use extentcache::span::TimeSpan;

// ============================================================================
// Helper Functions
// ============================================================================

fn span(start: i64, end: i64) -> TimeSpan {
    TimeSpan::new(start, end).unwrap()
}

/// Backend recording fetches and evictions, optionally held at a gate.
#[derive(Default)]
struct RecordingBackend {
    fetched: Mutex<Vec<TimeSpan>>,
    evicted: Mutex<Vec<TimeSpan>>,
    gate: Option<Arc<Semaphore>>,
}

impl GovernorBackend for RecordingBackend {
    fn fetch(&self, span: TimeSpan) -> BoxFuture<'_, Result<(), GovernorError>> {
        Box::pin(async move {
            self.fetched.lock().push(span);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.map_err(|_| GovernorError::Cancelled)?;
            }
            Ok(())
        })
    }

    fn evict(&self, spans: &[TimeSpan]) {
        self.evicted.lock().extend_from_slice(spans);
    }
}

fn manager_over(backend: Arc<RecordingBackend>) -> Arc<GovernorManager<&'static str>> {
    Arc::new(GovernorManager::new(
        GovernorConfig::default(),
        move |_key: &&'static str| backend.clone() as Arc<dyn GovernorBackend>,
    ))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[derive(Debug)]
struct Sample {
    start: i64,
}

/// Provider serving one sample per ten milliseconds.
#[derive(Default)]
struct SampleProvider {
    requested: Mutex<Vec<TimeSpan>>,
    calls: AtomicUsize,
}

impl DataProvider for SampleProvider {
    fn name(&self) -> &str {
        "samples"
    }

    fn provides_data_for(&self, category: &DataModelCategory) -> bool {
        category.matches_declared(&samples())
    }

    fn query(
        &self,
        query: ProviderQuery,
        receiver: DepositReceiver,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let requested = query
                .time_span(&at())
                .ok_or_else(|| ProviderError::Failed("unbounded request".into()))?;
            self.requested.lock().push(requested);

            let (Some(start), Some(end)) = (requested.start(), requested.end()) else {
                return Err(ProviderError::Failed("unbounded request".into()));
            };
            let accessors: Vec<Arc<dyn PropertyAccessor<Sample>>> =
                vec![Arc::new(TimeSpanAccessor::new("at", TimeSpan::TIMELESS, |s: &Sample| {
                    TimeSpan::new(s.start, s.start + 10).unwrap()
                }))];
            let objects = (start..end).step_by(10).map(|start| Sample { start }).collect();
            let deposit = CacheDeposit::new(query.category.clone(), accessors, objects)
                .map_err(|e| ProviderError::Failed(e.to_string()))?;
            receiver.receive(deposit)?;
            Ok(())
        })
    }
}

/// Every channel of the sample family.
fn samples() -> DataModelCategory {
    DataModelCategory::new("test", "samples", "*")
}

fn channel(name: &str) -> DataModelCategory {
    DataModelCategory::new("test", "samples", name)
}

fn at() -> PropertyDescriptor {
    PropertyDescriptor::time("at")
}

fn stored_in(registry: &DataRegistry, category: DataModelCategory, window: TimeSpan) -> usize {
    let query = DataQuery::new(category)
        .with_matcher(IntervalMatcher::time(at(), window, TimeMatchMode::General).unwrap());
    registry.perform_local_query(&query).len()
}

// ============================================================================
// Governor Manager
// ============================================================================

#[tokio::test]
async fn test_repeated_request_is_idempotent() {
    let backend = Arc::new(RecordingBackend::default());
    let manager = manager_over(backend.clone());

    let first = manager.request_data(&"radar", &[span(0, 100)]).await;
    let second = manager.request_data(&"radar", &[span(0, 100)]).await;

    assert_eq!(first.fetched, vec![span(0, 100)]);
    assert!(second.is_noop());
    assert_eq!(backend.fetched.lock().len(), 1);
}

#[tokio::test]
async fn test_loaded_set_grows_by_delta() {
    let backend = Arc::new(RecordingBackend::default());
    let manager = manager_over(backend.clone());

    manager.request_data(&"radar", &[span(0, 100)]).await;
    let report = manager.request_data(&"radar", &[span(50, 150)]).await;

    assert_eq!(report.fetched, vec![span(100, 150)]);
    assert_eq!(manager.loaded(&"radar"), vec![span(0, 150)]);
}

#[tokio::test]
async fn test_disjoint_requests_fetch_each_gap() {
    let backend = Arc::new(RecordingBackend::default());
    let manager = manager_over(backend.clone());

    manager.request_data(&"radar", &[span(0, 10), span(20, 30)]).await;
    let report = manager.request_data(&"radar", &[span(0, 40)]).await;

    assert_eq!(report.fetched, vec![span(10, 20), span(30, 40)]);
    assert_eq!(manager.loaded(&"radar"), vec![span(0, 40)]);
}

#[tokio::test]
async fn test_clear_all_then_request_refetches() {
    let backend = Arc::new(RecordingBackend::default());
    let manager = manager_over(backend.clone());

    manager.request_data(&"radar", &[span(0, 100)]).await;
    assert_eq!(manager.clear_all(&"radar"), vec![span(0, 100)]);
    assert!(manager.get(&"radar").is_none());

    let report = manager.request_data(&"radar", &[span(0, 100)]).await;
    assert_eq!(report.fetched, vec![span(0, 100)]);
    assert_eq!(*backend.evicted.lock(), vec![span(0, 100)]);
}

#[tokio::test]
async fn test_clear_during_fetch_discards_result() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(RecordingBackend {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let manager = manager_over(backend.clone());

    let request = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.request_data(&"radar", &[span(0, 100)]).await })
    };
    wait_until(|| backend.fetched.lock().len() == 1).await;

    assert!(manager.clear_all(&"radar").is_empty());
    assert_eq!(manager.len(), 1);

    gate.add_permits(1);
    let report = request.await.unwrap();

    assert!(report.committed.is_empty());
    assert_eq!(report.discarded, vec![span(0, 100)]);
    assert_eq!(*backend.evicted.lock(), vec![span(0, 100)]);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_fetch_once() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(RecordingBackend {
        gate: Some(gate.clone()),
        ..Default::default()
    });
    let manager = manager_over(backend.clone());

    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.request_data(&"radar", &[span(0, 100)]).await })
    };
    wait_until(|| backend.fetched.lock().len() == 1).await;

    let second = manager.request_data(&"radar", &[span(0, 100)]).await;
    assert!(second.fetched.is_empty());
    assert_eq!(second.pending, vec![span(0, 100)]);
    assert!(!second.is_noop());

    gate.add_permits(1);
    first.await.unwrap();
    assert_eq!(backend.fetched.lock().len(), 1);
    assert_eq!(manager.loaded(&"radar"), vec![span(0, 100)]);

    let third = manager.request_data(&"radar", &[span(0, 100)]).await;
    assert!(third.is_noop());
}

// ============================================================================
// Registry-backed governors
// ============================================================================

fn registry_manager(registry: &DataRegistry) -> GovernorManager<String> {
    let registry = registry.clone();
    GovernorManager::new(GovernorConfig::default(), move |name: &String| {
        Arc::new(RegistryGovernorBackend::new(registry.clone(), channel(name), at()))
            as Arc<dyn GovernorBackend>
    })
}

#[tokio::test]
async fn test_registry_backed_flow() {
    let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
    let provider = Arc::new(SampleProvider::default());
    let _handle = registry.register_provider(provider.clone());
    let manager = registry_manager(&registry);
    let key = "pressure".to_string();

    let report = manager.request_data(&key, &[span(0, 100)]).await;
    assert!(report.is_success());
    assert_eq!(registry.model_count(), 10);

    manager.request_data(&key, &[span(50, 150)]).await;
    assert_eq!(*provider.requested.lock(), vec![span(0, 100), span(100, 150)]);
    assert_eq!(registry.model_count(), 15);

    let removed = manager.clear_data(&key, Some(&[span(0, 50)]));
    assert_eq!(removed, vec![span(0, 50)]);
    assert_eq!(stored_in(&registry, channel("pressure"), span(0, 50)), 0);
    assert_eq!(registry.model_count(), 10);

    manager.request_data(&key, &[span(0, 100)]).await;
    assert_eq!(provider.requested.lock().last(), Some(&span(0, 50)));
    assert_eq!(registry.model_count(), 15);
}

#[tokio::test]
async fn test_registry_backed_keys_share_provider_but_not_data() {
    let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
    let provider = Arc::new(SampleProvider::default());
    let _handle = registry.register_provider(provider.clone());
    let manager = registry_manager(&registry);

    manager.request_data(&"pressure".to_string(), &[span(0, 50)]).await;
    manager.request_data(&"humidity".to_string(), &[span(0, 50)]).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    manager.clear_all(&"pressure".to_string());
    assert_eq!(stored_in(&registry, channel("pressure"), span(0, 50)), 0);
    assert_eq!(stored_in(&registry, channel("humidity"), span(0, 50)), 5);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_registry_failure_leaves_nothing_loaded() {
    let registry = DataRegistry::new(RegistryConfig::default()).unwrap();
    let manager = registry_manager(&registry);
    let key = "pressure".to_string();

    let report = manager.request_data(&key, &[span(0, 100)]).await;
    assert!(!report.is_success());
    assert!(matches!(report.failed[0].1, GovernorError::Fetch(_)));
    assert!(manager.loaded(&key).is_empty());
    assert!(manager.is_empty());
}
