//! Keyed governors, created on demand and released when empty.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use super::{GovernorBackend, GovernorConfig, RequestReport, SpanGovernor};
use crate::span::TimeSpan;

type BackendFactory<K> = Box<dyn Fn(&K) -> Arc<dyn GovernorBackend> + Send + Sync>;

/// Owns one [`SpanGovernor`] per consumer key.
///
/// A governor is created the first time its key requests data and released
/// once it has nothing loaded and nothing in flight.
pub struct GovernorManager<K>
where
    K: Eq + Hash + Clone + Debug,
{
    governors: DashMap<K, Arc<SpanGovernor>>,
    factory: BackendFactory<K>,
    config: GovernorConfig,
}

impl<K> GovernorManager<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a manager; `factory` builds the backend for each new key.
    pub fn new<F>(config: GovernorConfig, factory: F) -> Self
    where
        F: Fn(&K) -> Arc<dyn GovernorBackend> + Send + Sync + 'static,
    {
        Self {
            governors: DashMap::new(),
            factory: Box::new(factory),
            config,
        }
    }

    /// Ensure `spans` are loaded for `key`.
    ///
    /// Spans another caller is already fetching are reported as pending
    /// rather than awaited; see [`SpanGovernor::request_data`].
    pub async fn request_data(&self, key: &K, spans: &[TimeSpan]) -> RequestReport {
        // Planning under the entry guard keeps a concurrent release from
        // dropping the governor before its fetches are registered.
        let (governor, plan) = {
            let entry = self.governors.entry(key.clone()).or_insert_with(|| {
                debug!(key = ?key, "Creating governor");
                Arc::new(SpanGovernor::new((self.factory)(key), self.config.clone()))
            });
            let governor = Arc::clone(entry.value());
            let plan = governor.plan_request(spans);
            (governor, plan)
        };

        let report = governor.run_fetches(plan).await;
        self.release_if_idle(key);
        report
    }

    /// Clear spans for `key` (`None` = everything) and return what was evicted.
    pub fn clear_data(&self, key: &K, spans: Option<&[TimeSpan]>) -> Vec<TimeSpan> {
        let removed = match self.governors.get(key) {
            Some(governor) => governor.clear_data(spans),
            None => return Vec::new(),
        };
        self.release_if_idle(key);
        removed
    }

    pub fn clear_all(&self, key: &K) -> Vec<TimeSpan> {
        self.clear_data(key, None)
    }

    /// Clear every key. Used at shutdown.
    pub fn clear_everything(&self) {
        let keys: Vec<K> = self.keys();
        for key in &keys {
            self.clear_all(key);
        }
        info!(governors = keys.len(), "Cleared all governors");
    }

    pub fn get(&self, key: &K) -> Option<Arc<SpanGovernor>> {
        self.governors.get(key).map(|g| Arc::clone(g.value()))
    }

    /// Loaded spans for `key`, empty if it has no governor.
    pub fn loaded(&self, key: &K) -> Vec<TimeSpan> {
        self.get(key).map(|g| g.loaded()).unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<K> {
        self.governors.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.governors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.governors.is_empty()
    }

    fn release_if_idle(&self, key: &K) {
        if self.governors.remove_if(key, |_, g| g.is_idle()).is_some() {
            debug!(key = ?key, "Released idle governor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::GovernorError;
    use crate::registry::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        fetches: AtomicUsize,
        evictions: AtomicUsize,
    }

    impl GovernorBackend for CountingBackend {
        fn fetch(&self, _span: TimeSpan) -> BoxFuture<'_, Result<(), GovernorError>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn evict(&self, spans: &[TimeSpan]) {
            self.evictions.fetch_add(spans.len(), Ordering::SeqCst);
        }
    }

    fn span(s: i64, e: i64) -> TimeSpan {
        TimeSpan::new(s, e).unwrap()
    }

    fn manager(backend: Arc<CountingBackend>) -> GovernorManager<&'static str> {
        GovernorManager::new(GovernorConfig::default(), move |_key: &&'static str| {
            backend.clone() as Arc<dyn GovernorBackend>
        })
    }

    #[tokio::test]
    async fn test_governor_created_on_first_request() {
        let backend = Arc::new(CountingBackend::default());
        let manager = manager(backend.clone());

        assert!(manager.is_empty());
        manager.request_data(&"alpha", &[span(0, 10)]).await;
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.loaded(&"alpha"), vec![span(0, 10)]);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let backend = Arc::new(CountingBackend::default());
        let manager = manager(backend.clone());

        manager.request_data(&"alpha", &[span(0, 10)]).await;
        manager.request_data(&"beta", &[span(0, 10)]).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_governor_released_when_cleared() {
        let backend = Arc::new(CountingBackend::default());
        let manager = manager(backend.clone());

        manager.request_data(&"alpha", &[span(0, 10)]).await;
        manager.clear_data(&"alpha", Some(&[span(0, 5)]));
        assert_eq!(manager.len(), 1);

        manager.clear_all(&"alpha");
        assert!(manager.is_empty());
        assert_eq!(backend.evictions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_unknown_key_is_noop() {
        let manager = manager(Arc::new(CountingBackend::default()));
        assert!(manager.clear_all(&"missing").is_empty());
    }

    #[tokio::test]
    async fn test_clear_everything() {
        let backend = Arc::new(CountingBackend::default());
        let manager = manager(backend.clone());

        manager.request_data(&"alpha", &[span(0, 10)]).await;
        manager.request_data(&"beta", &[span(5, 20)]).await;
        manager.clear_everything();
        assert!(manager.is_empty());
    }
}
