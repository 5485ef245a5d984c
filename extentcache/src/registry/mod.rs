//! Data registry: provider resolution, satisfaction, dedup and storage.
//!
//! # Architecture
//!
//! ```text
//! DataQuery ──► DataRegistry ──► SatisfactionEngine (stored coverage)
//!                   │                    │
//!                   │              remainder pieces
//!                   │                    │
//!                   ├── in-flight table ─┤ (attach or register)
//!                   │                    ▼
//!                   │              DataProvider::query ──► DepositReceiver
//!                   │                                          │
//!                   ◄─────────── ingest + coverage ◄───────────┘
//!                   │
//!                   ▼
//!             QueryTracker (watch channel)
//! ```
//!
//! Satisfaction, dedup and ingest run under one lock, so concurrent
//! queries for the same remainder start exactly one fetch and every other
//! query attaches to it.

mod category;
mod config;
mod data_registry;
mod deposit;
mod error;
mod provider;
mod query;
mod stats;
mod store;
mod tracker;

pub use category::{CategoryField, DataModelCategory};
pub use config::{RegistryConfig, DEFAULT_SATISFACTION};
pub use data_registry::DataRegistry;
pub use deposit::{CacheDeposit, DepositError, DepositMode, Expiration};
pub use error::{ProviderError, RegistryError};
pub use provider::{BoxFuture, DataProvider, DepositReceiver, ProviderHandle, ProviderQuery};
pub use query::{DataQuery, OrderSpecifier, SortDirection};
pub use stats::{RegistryStats, RegistryStatsSnapshot};
pub use store::ModelId;
pub use tracker::{QueryOutcome, QueryStatus, QueryTracker};
