//! Configuration key access and validation.
//!
//! Type-safe get/set of configuration values by `section.key` name.

use std::str::FromStr;
use thiserror::Error;

use super::parser::{expand_tilde, parse_optional_secs};
use super::settings::ConfigFile;
use crate::satisfaction::SatisfactionStrategy;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    RegistrySatisfaction,
    RegistryDefaultExpirationSecs,
    RegistryQueryTimeoutSecs,
    GovernorMaxConcurrentFetches,
    LoggingDirectory,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::RegistrySatisfaction,
            ConfigKey::RegistryDefaultExpirationSecs,
            ConfigKey::RegistryQueryTimeoutSecs,
            ConfigKey::GovernorMaxConcurrentFetches,
            ConfigKey::LoggingDirectory,
            ConfigKey::LoggingFile,
        ]
    }

    /// Canonical key name (e.g., "registry.satisfaction").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::RegistrySatisfaction => "registry.satisfaction",
            ConfigKey::RegistryDefaultExpirationSecs => "registry.default_expiration_secs",
            ConfigKey::RegistryQueryTimeoutSecs => "registry.query_timeout_secs",
            ConfigKey::GovernorMaxConcurrentFetches => "governor.max_concurrent_fetches",
            ConfigKey::LoggingDirectory => "logging.directory",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Section name (e.g., "registry").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Key name within the section (e.g., "satisfaction").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::RegistrySatisfaction => config.registry.satisfaction.to_string(),
            ConfigKey::RegistryDefaultExpirationSecs => config
                .registry
                .default_expiration_secs
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ConfigKey::RegistryQueryTimeoutSecs => config
                .registry
                .query_timeout_secs
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ConfigKey::GovernorMaxConcurrentFetches => {
                config.governor.max_concurrent_fetches.to_string()
            }
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
            ConfigKey::LoggingFile => config.logging.file.clone(),
        }
    }

    /// Validate and set the value in a config file.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        match self {
            ConfigKey::RegistrySatisfaction => {
                config.registry.satisfaction = value
                    .parse::<SatisfactionStrategy>()
                    .map_err(|reason| self.failed(reason))?;
            }
            ConfigKey::RegistryDefaultExpirationSecs => {
                config.registry.default_expiration_secs = self.optional_secs(value)?;
            }
            ConfigKey::RegistryQueryTimeoutSecs => {
                config.registry.query_timeout_secs = self.optional_secs(value)?;
            }
            ConfigKey::GovernorMaxConcurrentFetches => {
                config.governor.max_concurrent_fetches = match value.trim().parse::<usize>() {
                    Ok(n) if n >= 1 => n,
                    _ => return Err(self.failed("must be a positive integer")),
                };
            }
            ConfigKey::LoggingDirectory => {
                if value.trim().is_empty() {
                    return Err(self.failed("must not be empty"));
                }
                config.logging.directory = expand_tilde(value.trim());
            }
            ConfigKey::LoggingFile => {
                if value.trim().is_empty() {
                    return Err(self.failed("must not be empty"));
                }
                config.logging.file = value.trim().to_string();
            }
        }
        Ok(())
    }

    fn optional_secs(&self, value: &str) -> Result<Option<u64>, ConfigKeyError> {
        parse_optional_secs(self.section(), self.name(), value)
            .map_err(|_| self.failed("expected whole seconds or empty"))
    }

    fn failed(&self, reason: impl Into<String>) -> ConfigKeyError {
        ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_round_trip() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "registry.colour".parse::<ConfigKey>(),
            Err(ConfigKeyError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_get_and_set() {
        let mut config = ConfigFile::default();
        let key = ConfigKey::RegistryQueryTimeoutSecs;

        assert_eq!(key.get(&config), "");
        key.set(&mut config, "15").unwrap();
        assert_eq!(key.get(&config), "15");
        key.set(&mut config, "").unwrap();
        assert_eq!(config.registry.query_timeout_secs, None);
    }

    #[test]
    fn test_set_validates() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::RegistrySatisfaction.set(&mut config, "eager").is_err());
        assert!(ConfigKey::GovernorMaxConcurrentFetches.set(&mut config, "0").is_err());
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_section() {
        assert_eq!(ConfigKey::GovernorMaxConcurrentFetches.section(), "governor");
    }
}
