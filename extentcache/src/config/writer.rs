//! INI serialization: `ConfigFile` → commented INI string.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let expiration = optional_to_string(config.registry.default_expiration_secs);
    let timeout = optional_to_string(config.registry.query_timeout_secs);

    format!(
        r#"[registry]
; How partially covered requests are fetched:
;   fine   - fetch only the uncovered remainder
;   single - refetch the whole request unless fully covered
satisfaction = {}
; Seconds before deposits without their own expiration go stale (empty = never)
default_expiration_secs = {}
; Seconds before a provider call is abandoned (empty = no limit)
query_timeout_secs = {}

[governor]
; Maximum concurrent span fetches per governor
max_concurrent_fetches = {}

[logging]
directory = {}
file = {}
"#,
        config.registry.satisfaction,
        expiration,
        timeout,
        config.governor.max_concurrent_fetches,
        config.logging.directory.display(),
        config.logging.file,
    )
}

fn optional_to_string(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
