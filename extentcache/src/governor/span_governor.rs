//! Per-consumer tracking of loaded time spans.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::{GovernorBackend, GovernorError};
use crate::span::{intersect_spans, merge_spans, subtract_spans, TimeSpan};

/// Default bound on concurrent fetches per governor.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Governor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    /// Maximum number of delta spans fetched at once
    pub max_concurrent_fetches: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl GovernorConfig {
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }
}

/// A fetch registered as in flight.
struct InFlightSpan {
    requested: TimeSpan,
    /// Portion still wanted; shrinks when overlapping spans are cleared.
    relevant: Vec<TimeSpan>,
}

#[derive(Default)]
struct GovernorState {
    /// Pairwise disjoint, maximally merged.
    loaded: Vec<TimeSpan>,
    in_flight: HashMap<u64, InFlightSpan>,
}

/// A delta span the caller must fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedFetch {
    id: u64,
    span: TimeSpan,
}

impl PlannedFetch {
    pub fn span(&self) -> TimeSpan {
        self.span
    }
}

/// Result of planning a request: the deltas this caller must fetch and the
/// parts another caller is already fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPlan {
    fetches: Vec<PlannedFetch>,
    pending: Vec<TimeSpan>,
}

impl RequestPlan {
    pub fn fetches(&self) -> &[PlannedFetch] {
        &self.fetches
    }

    /// Requested spans covered only by fetches registered earlier.
    pub fn pending(&self) -> &[TimeSpan] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty() && self.pending.is_empty()
    }
}

/// What a request did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestReport {
    /// Delta spans handed to the backend
    pub fetched: Vec<TimeSpan>,
    /// Spans merged into the loaded set
    pub committed: Vec<TimeSpan>,
    /// Spans whose data arrived after they were cleared
    pub discarded: Vec<TimeSpan>,
    pub failed: Vec<(TimeSpan, GovernorError)>,
    /// Requested spans another caller's fetch is still loading; they are not
    /// loaded yet when this report is returned
    pub pending: Vec<TimeSpan>,
}

impl RequestReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// True if every requested span was already loaded.
    pub fn is_noop(&self) -> bool {
        self.fetched.is_empty() && self.pending.is_empty()
    }
}

/// Tracks which time spans a consumer has loaded and fetches only the delta.
///
/// Requests subtract both the loaded set and spans already in flight, so
/// repeating a request never fetches twice. A clear that overlaps an
/// in-flight fetch marks that part stale; when the fetch completes, the
/// stale part is evicted instead of committed.
pub struct SpanGovernor {
    backend: Arc<dyn GovernorBackend>,
    state: Mutex<GovernorState>,
    fetch_limit: Semaphore,
    next_fetch: AtomicU64,
}

impl SpanGovernor {
    pub fn new(backend: Arc<dyn GovernorBackend>, config: GovernorConfig) -> Self {
        Self {
            backend,
            state: Mutex::new(GovernorState::default()),
            fetch_limit: Semaphore::new(config.max_concurrent_fetches.max(1)),
            next_fetch: AtomicU64::new(0),
        }
    }

    /// The loaded set.
    pub fn loaded(&self) -> Vec<TimeSpan> {
        self.state.lock().loaded.clone()
    }

    /// Still-relevant portions of in-flight fetches.
    pub fn in_flight(&self) -> Vec<TimeSpan> {
        merge_spans(
            self.state
                .lock()
                .in_flight
                .values()
                .flat_map(|f| f.relevant.iter().copied()),
        )
    }

    /// True when nothing is loaded and nothing is in flight.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.loaded.is_empty() && state.in_flight.is_empty()
    }

    /// Ensure `spans` are loaded, fetching only what is missing.
    ///
    /// Each delta span is fetched independently: a failure drops only that
    /// span's in-flight marker and leaves successful spans committed.
    ///
    /// Spans that another caller is already fetching are not fetched again
    /// and not awaited. They come back in [`RequestReport::pending`] and
    /// join the loaded set when that caller's fetch commits.
    pub async fn request_data(&self, spans: &[TimeSpan]) -> RequestReport {
        let plan = self.plan_request(spans);
        self.run_fetches(plan).await
    }

    /// Compute the delta and register it as in flight.
    pub fn plan_request(&self, spans: &[TimeSpan]) -> RequestPlan {
        let wanted = merge_spans(spans.iter().copied());
        let mut state = self.state.lock();

        let missing = subtract_spans(&wanted, &state.loaded);
        let in_flight: Vec<TimeSpan> = state
            .in_flight
            .values()
            .flat_map(|f| f.relevant.iter().copied())
            .collect();
        let pending = intersect_spans(&missing, &in_flight);
        let delta = subtract_spans(&missing, &in_flight);

        let fetches = delta
            .into_iter()
            .map(|span| {
                let id = self.next_fetch.fetch_add(1, Ordering::Relaxed);
                state.in_flight.insert(
                    id,
                    InFlightSpan {
                        requested: span,
                        relevant: vec![span],
                    },
                );
                PlannedFetch { id, span }
            })
            .collect();
        RequestPlan { fetches, pending }
    }

    /// Fetch planned spans concurrently, bounded by the fetch limit.
    pub async fn run_fetches(&self, plan: RequestPlan) -> RequestReport {
        let RequestPlan {
            fetches: planned,
            pending,
        } = plan;
        let mut report = RequestReport {
            fetched: planned.iter().map(PlannedFetch::span).collect(),
            pending,
            ..Default::default()
        };
        if planned.is_empty() {
            return report;
        }
        debug!(spans = planned.len(), "Fetching missing spans");

        let results = join_all(planned.into_iter().map(|fetch| async move {
            let result = match self.fetch_limit.acquire().await {
                Ok(_permit) => self.backend.fetch(fetch.span).await,
                Err(_) => Err(GovernorError::Cancelled),
            };
            (fetch, result)
        }))
        .await;

        for (fetch, result) in results {
            match result {
                Ok(()) => {
                    let (committed, stale) = self.commit(fetch.id);
                    if !stale.is_empty() {
                        debug!(
                            span = %fetch.span,
                            stale = stale.len(),
                            "Discarding stale fetch result"
                        );
                        self.backend.evict(&stale);
                    }
                    report.committed.extend(committed);
                    report.discarded.extend(stale);
                }
                Err(err) => {
                    warn!(span = %fetch.span, error = %err, "Span fetch failed");
                    self.state.lock().in_flight.remove(&fetch.id);
                    report.failed.push((fetch.span, err));
                }
            }
        }
        report
    }

    /// Move a finished fetch's relevant portion into the loaded set.
    ///
    /// The cleared remainder is stale, except where it has since been
    /// loaded again or is being fetched again by a later request.
    fn commit(&self, id: u64) -> (Vec<TimeSpan>, Vec<TimeSpan>) {
        let mut state = self.state.lock();
        let Some(fetch) = state.in_flight.remove(&id) else {
            return (Vec::new(), Vec::new());
        };
        let mut keep = state.loaded.clone();
        keep.extend(fetch.relevant.iter().copied());
        keep.extend(state.in_flight.values().flat_map(|f| f.relevant.iter().copied()));
        let stale = subtract_spans(&[fetch.requested], &keep);
        let mut loaded = std::mem::take(&mut state.loaded);
        loaded.extend(fetch.relevant.iter().copied());
        state.loaded = merge_spans(loaded);
        (fetch.relevant, stale)
    }

    /// Remove spans from the loaded set (`None` = everything) and evict
    /// exactly what was removed.
    ///
    /// Overlapping in-flight fetches are marked stale for the cleared part.
    pub fn clear_data(&self, spans: Option<&[TimeSpan]>) -> Vec<TimeSpan> {
        let removed = {
            let mut state = self.state.lock();
            match spans {
                None => {
                    for fetch in state.in_flight.values_mut() {
                        fetch.relevant.clear();
                    }
                    std::mem::take(&mut state.loaded)
                }
                Some(spans) => {
                    let cut = merge_spans(spans.iter().copied());
                    for fetch in state.in_flight.values_mut() {
                        fetch.relevant = subtract_spans(&fetch.relevant, &cut);
                    }
                    let removed = intersect_spans(&state.loaded, &cut);
                    state.loaded = subtract_spans(&state.loaded, &cut);
                    removed
                }
            }
        };
        if !removed.is_empty() {
            debug!(spans = removed.len(), "Evicting cleared spans");
            self.backend.evict(&removed);
        }
        removed
    }
}

impl fmt::Debug for SpanGovernor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SpanGovernor")
            .field("loaded", &state.loaded)
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}
