//! Registry and provider errors.

use std::time::Duration;

use thiserror::Error;

use super::DataModelCategory;

/// Failure reported by a provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The provider could not fetch the data.
    #[error("Fetch failed: {0}")]
    Failed(String),

    /// The call exceeded the registry's query timeout.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled; late deposits are discarded.
    #[error("Operation cancelled")]
    Cancelled,

    /// The registry was dropped while the provider was running.
    #[error("Registry is closed")]
    RegistryClosed,
}

/// Failure of a registry query as seen by its waiters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("No provider registered for category {0}")]
    NoProvider(DataModelCategory),

    #[error("Provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Query cancelled")]
    Cancelled,

    /// The in-flight operation ended without publishing a status.
    #[error("Operation abandoned")]
    Abandoned,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}
