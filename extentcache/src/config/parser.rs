//! INI parsing: `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [registry] section
    if let Some(section) = ini.section(Some("registry")) {
        if let Some(v) = section.get("satisfaction") {
            config.registry.satisfaction = v.parse().map_err(|_| {
                invalid("registry", "satisfaction", v, "must be one of: fine, single")
            })?;
        }
        if let Some(v) = section.get("default_expiration_secs") {
            config.registry.default_expiration_secs =
                parse_optional_secs("registry", "default_expiration_secs", v)?;
        }
        if let Some(v) = section.get("query_timeout_secs") {
            config.registry.query_timeout_secs =
                parse_optional_secs("registry", "query_timeout_secs", v)?;
        }
    }

    // [governor] section
    if let Some(section) = ini.section(Some("governor")) {
        if let Some(v) = section.get("max_concurrent_fetches") {
            config.governor.max_concurrent_fetches = match v.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(invalid(
                        "governor",
                        "max_concurrent_fetches",
                        v,
                        "must be a positive integer",
                    ))
                }
            };
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Empty means "not set".
pub(super) fn parse_optional_secs(
    section: &str,
    key: &str,
    value: &str,
) -> Result<Option<u64>, ConfigFileError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| invalid(section, key, value, "expected whole seconds or empty"))
}

pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
