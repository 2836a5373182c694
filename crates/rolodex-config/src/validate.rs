//! Validation helpers and parsing utilities for configuration values.

use crate::defaults::MAX_COPY_CHUNK_BYTES;
use crate::error::{ConfigError, ConfigResult};
use crate::model::RolodexConfig;

/// Check a fully merged configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails validation.
pub fn validate_config(config: &RolodexConfig) -> ConfigResult<()> {
    let policy = &config.import;

    if policy.storage_root.as_os_str().is_empty() {
        return Err(ConfigError::invalid("import", "storage_root", None, "empty"));
    }
    if policy.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid("import", "cache_dir", None, "empty"));
    }
    if policy.cache_prefix.trim().is_empty() {
        return Err(ConfigError::invalid("import", "cache_prefix", None, "empty"));
    }
    if policy.cache_prefix.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            "import",
            "cache_prefix",
            Some(policy.cache_prefix.clone()),
            "contains_path_separator",
        ));
    }
    if policy.file_suffix.trim().is_empty() {
        return Err(ConfigError::invalid("import", "file_suffix", None, "empty"));
    }
    check_chunk_bytes(policy.copy_chunk_bytes)?;
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::invalid("logging", "level", None, "empty"));
    }
    Ok(())
}

fn check_chunk_bytes(value: usize) -> ConfigResult<()> {
    if value == 0 || value > MAX_COPY_CHUNK_BYTES {
        return Err(ConfigError::invalid(
            "import",
            "copy_chunk_bytes",
            Some(value.to_string()),
            "out_of_range",
        ));
    }
    Ok(())
}

pub(crate) fn parse_flag(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "not_a_boolean",
        )),
    }
}

pub(crate) fn parse_chunk_bytes(value: &str) -> ConfigResult<usize> {
    let parsed = value.trim().parse::<usize>().map_err(|_| {
        ConfigError::invalid(
            "import",
            "copy_chunk_bytes",
            Some(value.to_string()),
            "not_an_integer",
        )
    })?;
    check_chunk_bytes(parsed)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RolodexConfig::default()).is_ok());
    }

    #[test]
    fn rejects_prefix_with_separator() {
        let mut config = RolodexConfig::default();
        config.import.cache_prefix = "nested/prefix".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "cache_prefix",
                reason: "contains_path_separator",
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_roots_and_suffix() {
        let mut config = RolodexConfig::default();
        config.import.storage_root = PathBuf::new();
        assert!(validate_config(&config).is_err());

        let mut config = RolodexConfig::default();
        config.import.file_suffix = "  ".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn chunk_bytes_must_be_in_range() {
        assert_eq!(parse_chunk_bytes("4096").ok(), Some(4096));
        assert!(parse_chunk_bytes("0").is_err());
        assert!(parse_chunk_bytes("lots").is_err());
        assert!(parse_chunk_bytes(&(MAX_COPY_CHUNK_BYTES + 1).to_string()).is_err());
    }

    #[test]
    fn flags_accept_common_spellings() {
        for truthy in ["1", "true", "YES", " on "] {
            assert_eq!(parse_flag("import", "flag", truthy).ok(), Some(true));
        }
        for falsy in ["0", "false", "No", "off"] {
            assert_eq!(parse_flag("import", "flag", falsy).ok(), Some(false));
        }
        assert!(parse_flag("import", "flag", "maybe").is_err());
    }
}
