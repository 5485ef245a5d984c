//! ExtentCache - interval-aware caching of remote data
//!
//! Consumers ask for data over time spans and geographic regions. The
//! registry answers what it already holds, fetches only the uncovered
//! remainder from registered providers, and makes concurrent requests for
//! the same remainder share a single fetch. Span governors sit on top and
//! track what each consumer has loaded so only the delta is ever requested.
//!
//! # High-Level API
//!
//! ```ignore
//! use extentcache::governor::{GovernorConfig, GovernorManager, RegistryGovernorBackend};
//! use extentcache::registry::{DataModelCategory, DataRegistry, RegistryConfig};
//!
//! let registry = DataRegistry::new(RegistryConfig::default())?;
//! let _handle = registry.register_provider(Arc::new(MyProvider::new()));
//!
//! let manager = GovernorManager::new(GovernorConfig::default(), move |layer: &String| {
//!     Arc::new(RegistryGovernorBackend::new(
//!         registry.clone(),
//!         DataModelCategory::new("weather", "radar", layer),
//!         PropertyDescriptor::time("valid_time"),
//!     )) as Arc<dyn GovernorBackend>
//! });
//!
//! manager.request_data(&"reflectivity".to_string(), &[TimeSpan::new(0, 3_600_000)?]).await;
//! ```

pub mod config;
pub mod geo;
pub mod governor;
pub mod interval;
pub mod logging;
pub mod property;
pub mod registry;
pub mod satisfaction;
pub mod span;
