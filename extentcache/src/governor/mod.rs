//! Span governors: incremental loading of time ranges per consumer.
//!
//! A consumer asks its governor for the spans it wants. The governor fetches
//! only what is neither loaded nor already in flight, and evicts exactly the
//! spans a clear removes.
//!
//! ```text
//! GovernorManager<K> ──► SpanGovernor (per key) ──► GovernorBackend
//!                                                     │
//!                                       RegistryGovernorBackend ──► DataRegistry
//! ```

mod backend;
mod error;
mod manager;
mod span_governor;

pub use backend::{GovernorBackend, RegistryGovernorBackend};
pub use error::GovernorError;
pub use manager::GovernorManager;
pub use span_governor::{
    GovernorConfig, PlannedFetch, RequestPlan, RequestReport, SpanGovernor,
    DEFAULT_MAX_CONCURRENT_FETCHES,
};
