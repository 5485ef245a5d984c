//! Registry statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

/// Lock-free counters updated by the registry.
#[derive(Debug, Default)]
pub struct RegistryStats {
    queries_submitted: AtomicU64,
    satisfied_locally: AtomicU64,
    coalesced: AtomicU64,
    operations_started: AtomicU64,
    provider_dispatches: AtomicU64,
    failures: AtomicU64,
    cancellations: AtomicU64,
    deposits: AtomicU64,
    objects_stored: AtomicU64,
    objects_evicted: AtomicU64,
    discarded_deposits: AtomicU64,
}

impl RegistryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn query_submitted(&self) {
        self.queries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn satisfied_locally(&self) {
        self.satisfied_locally.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesced(&self, operations: usize) {
        self.coalesced.fetch_add(operations as u64, Ordering::Relaxed);
    }

    pub(crate) fn operation_started(&self) {
        self.operations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn provider_dispatched(&self) {
        self.provider_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cancelled(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deposit_stored(&self, objects: usize) {
        self.deposits.fetch_add(1, Ordering::Relaxed);
        self.objects_stored.fetch_add(objects as u64, Ordering::Relaxed);
    }

    pub(crate) fn deposit_discarded(&self) {
        self.discarded_deposits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn objects_evicted(&self, objects: usize) {
        self.objects_evicted.fetch_add(objects as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            queries_submitted: self.queries_submitted.load(Ordering::Relaxed),
            satisfied_locally: self.satisfied_locally.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            operations_started: self.operations_started.load(Ordering::Relaxed),
            provider_dispatches: self.provider_dispatches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            deposits: self.deposits.load(Ordering::Relaxed),
            objects_stored: self.objects_stored.load(Ordering::Relaxed),
            objects_evicted: self.objects_evicted.load(Ordering::Relaxed),
            discarded_deposits: self.discarded_deposits.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`RegistryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStatsSnapshot {
    pub queries_submitted: u64,
    pub satisfied_locally: u64,
    pub coalesced: u64,
    pub operations_started: u64,
    pub provider_dispatches: u64,
    pub failures: u64,
    pub cancellations: u64,
    pub deposits: u64,
    pub objects_stored: u64,
    pub objects_evicted: u64,
    pub discarded_deposits: u64,
}

impl RegistryStatsSnapshot {
    /// Share of submitted queries that attached to an existing fetch.
    pub fn coalescing_ratio(&self) -> f64 {
        if self.queries_submitted == 0 {
            0.0
        } else {
            self.coalesced as f64 / self.queries_submitted as f64
        }
    }

    pub fn log(&self) {
        info!(
            queries = self.queries_submitted,
            satisfied_locally = self.satisfied_locally,
            coalesced = self.coalesced,
            coalescing_ratio = format!("{:.1}%", self.coalescing_ratio() * 100.0),
            operations = self.operations_started,
            dispatches = self.provider_dispatches,
            failures = self.failures,
            cancellations = self.cancellations,
            deposits = self.deposits,
            objects = self.objects_stored,
            evicted = self.objects_evicted,
            "Registry statistics"
        );
    }
}
