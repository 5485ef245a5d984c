//! Settings structs and defaults for `config.ini`.

use std::path::PathBuf;
use std::time::Duration;

use super::file::config_directory;
use crate::governor::{GovernorConfig, DEFAULT_MAX_CONCURRENT_FETCHES};
use crate::registry::{RegistryConfig, DEFAULT_SATISFACTION};
use crate::satisfaction::SatisfactionStrategy;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "extentcache.log";

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub registry: RegistrySettings,
    pub governor: GovernorSettings,
    pub logging: LoggingSettings,
}

/// `[registry]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    pub satisfaction: SatisfactionStrategy,
    /// `None` means deposits never expire unless they say so.
    pub default_expiration_secs: Option<u64>,
    /// `None` means provider calls are not timed out.
    pub query_timeout_secs: Option<u64>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            satisfaction: DEFAULT_SATISFACTION,
            default_expiration_secs: None,
            query_timeout_secs: None,
        }
    }
}

/// `[governor]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernorSettings {
    pub max_concurrent_fetches: usize,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("logs"),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// Runtime configuration for a [`DataRegistry`](crate::registry::DataRegistry).
    pub fn registry_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::default().with_satisfaction(self.registry.satisfaction);
        if let Some(secs) = self.registry.default_expiration_secs {
            config = config.with_default_expiration(Duration::from_secs(secs));
        }
        if let Some(secs) = self.registry.query_timeout_secs {
            config = config.with_query_timeout(Duration::from_secs(secs));
        }
        config
    }

    /// Runtime configuration for span governors.
    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig::default().with_max_concurrent_fetches(self.governor.max_concurrent_fetches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conversions() {
        let config = ConfigFile::default();
        assert_eq!(config.registry_config(), RegistryConfig::default());
        assert_eq!(config.governor_config(), GovernorConfig::default());
    }

    #[test]
    fn test_registry_durations() {
        let mut config = ConfigFile::default();
        config.registry.default_expiration_secs = Some(60);
        config.registry.query_timeout_secs = Some(5);
        config.registry.satisfaction = SatisfactionStrategy::Single;

        let runtime = config.registry_config();
        assert_eq!(runtime.default_expiration, Some(Duration::from_secs(60)));
        assert_eq!(runtime.query_timeout, Some(Duration::from_secs(5)));
        assert_eq!(runtime.satisfaction, SatisfactionStrategy::Single);
    }
}
