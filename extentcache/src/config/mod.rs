//! INI configuration for the registry, governors and logging.
//!
//! # Example
//!
//! ```
//! use extentcache::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let registry = config.registry_config();
//! let governor = config.governor_config();
//! assert_eq!(governor.max_concurrent_fetches, 4);
//! assert!(registry.query_timeout.is_none());
//! ```

mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    ConfigFile, GovernorSettings, LoggingSettings, RegistrySettings, DEFAULT_LOG_FILE,
};
