//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use extentcache::config::ConfigFileError;
use extentcache::registry::RegistryError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Registry could not be created
    Registry(RegistryError),
    /// Failed to render output
    Output(serde_json::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) = self {
            eprintln!();
            eprintln!("Fix the value in the file shown by 'extentcache config path',");
            eprintln!("or reset it with 'extentcache config set <key> <value>'.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Registry(e) => write!(f, "Failed to create registry: {}", e),
            CliError::Output(e) => write!(f, "Failed to render output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Registry(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Registry(e)
    }
}
