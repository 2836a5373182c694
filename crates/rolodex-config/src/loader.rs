//! Configuration loading from an optional JSON document plus environment overrides.
//!
//! # Design
//! - Environment lookups go through an injected closure so tests never touch
//!   process-wide state.
//! - Precedence: defaults, then the JSON file named by `ROLODEX_CONFIG`, then
//!   individual `ROLODEX_*` variables.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::RolodexConfig;
use crate::validate::{parse_chunk_bytes, parse_flag, validate_config};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "ROLODEX_";
/// Environment variable naming an optional JSON configuration file.
pub const ENV_CONFIG_PATH: &str = "ROLODEX_CONFIG";

const ENV_STORAGE_ROOT: &str = "ROLODEX_STORAGE_ROOT";
const ENV_CACHE_DIR: &str = "ROLODEX_CACHE_DIR";
const ENV_CACHE_PREFIX: &str = "ROLODEX_CACHE_PREFIX";
const ENV_FILE_SUFFIX: &str = "ROLODEX_FILE_SUFFIX";
const ENV_COPY_CHUNK_BYTES: &str = "ROLODEX_COPY_CHUNK_BYTES";
const ENV_ABORT_ON_FIRST_UNSUPPORTED: &str = "ROLODEX_ABORT_ON_FIRST_UNSUPPORTED";
const ENV_IMPORT_ALL: &str = "ROLODEX_IMPORT_ALL";
const ENV_ALLOW_SELECT_ALL: &str = "ROLODEX_ALLOW_SELECT_ALL";
const ENV_LOG_LEVEL: &str = "ROLODEX_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "ROLODEX_LOG_FORMAT";

/// Loads and validates [`RolodexConfig`] from a key lookup.
pub struct ConfigLoader<F> {
    lookup: F,
}

impl ConfigLoader<fn(&str) -> Option<String>> {
    /// Loader backed by the process environment.
    #[must_use]
    pub const fn from_env() -> Self {
        Self {
            lookup: env_lookup,
        }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Loader backed by an arbitrary key lookup.
    pub const fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Merge defaults, the optional file and overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when any
    /// value fails validation.
    pub fn load(&self) -> ConfigResult<RolodexConfig> {
        let mut config = match self.value(ENV_CONFIG_PATH) {
            Some(path) => load_file(Path::new(&path))?,
            None => RolodexConfig::default(),
        };
        self.apply_overrides(&mut config)?;
        validate_config(&config)?;
        debug!(
            storage_root = %config.import.storage_root.display(),
            cache_dir = %config.import.cache_dir.display(),
            abort_on_first_unsupported = config.import.abort_on_first_unsupported,
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut RolodexConfig) -> ConfigResult<()> {
        let policy = &mut config.import;
        if let Some(value) = self.value(ENV_STORAGE_ROOT) {
            policy.storage_root = PathBuf::from(value);
        }
        if let Some(value) = self.value(ENV_CACHE_DIR) {
            policy.cache_dir = PathBuf::from(value);
        }
        if let Some(value) = self.value(ENV_CACHE_PREFIX) {
            policy.cache_prefix = value;
        }
        if let Some(value) = self.value(ENV_FILE_SUFFIX) {
            policy.file_suffix = value;
        }
        if let Some(value) = self.value(ENV_COPY_CHUNK_BYTES) {
            policy.copy_chunk_bytes = parse_chunk_bytes(&value)?;
        }
        if let Some(value) = self.value(ENV_ABORT_ON_FIRST_UNSUPPORTED) {
            policy.abort_on_first_unsupported =
                parse_flag("import", "abort_on_first_unsupported", &value)?;
        }
        if let Some(value) = self.value(ENV_IMPORT_ALL) {
            policy.import_all_automatically =
                parse_flag("import", "import_all_automatically", &value)?;
        }
        if let Some(value) = self.value(ENV_ALLOW_SELECT_ALL) {
            policy.allow_select_all = parse_flag("import", "allow_select_all", &value)?;
        }
        if let Some(value) = self.value(ENV_LOG_LEVEL) {
            config.logging.level = value;
        }
        if let Some(value) = self.value(ENV_LOG_FORMAT) {
            config.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn value(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }
}

/// Read a JSON configuration document without applying overrides.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not valid JSON.
pub fn load_file(path: &Path) -> ConfigResult<RolodexConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogFormatSetting;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn loader(pairs: &[(&str, &str)]) -> ConfigLoader<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ConfigLoader::with_lookup(move |key: &str| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() -> Result<()> {
        let config = loader(&[]).load()?;
        assert_eq!(config, RolodexConfig::default());
        Ok(())
    }

    #[test]
    fn environment_overrides_file_values() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("rolodex.json");
        fs::write(
            &path,
            r#"{"import":{"storage_root":"/mnt/card","copy_chunk_bytes":1024},"logging":{"format":"json"}}"#,
        )?;
        let path_value = path.display().to_string();

        let config = loader(&[
            (ENV_CONFIG_PATH, path_value.as_str()),
            ("ROLODEX_COPY_CHUNK_BYTES", "2048"),
            ("ROLODEX_ABORT_ON_FIRST_UNSUPPORTED", "false"),
            ("ROLODEX_LOG_LEVEL", "debug"),
        ])
        .load()?;

        assert_eq!(config.import.storage_root, PathBuf::from("/mnt/card"));
        assert_eq!(config.import.copy_chunk_bytes, 2048);
        assert!(!config.import.abort_on_first_unsupported);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormatSetting::Json);
        Ok(())
    }

    #[test]
    fn blank_values_are_ignored() -> Result<()> {
        let config = loader(&[("ROLODEX_CACHE_PREFIX", "   ")]).load()?;
        assert_eq!(config.import.cache_prefix, "import_tmp_");
        Ok(())
    }

    #[test]
    fn invalid_override_is_reported() {
        let err = loader(&[("ROLODEX_IMPORT_ALL", "sometimes")])
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "import_all_automatically",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = loader(&[(ENV_CONFIG_PATH, "/definitely/missing/rolodex.json")])
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_surfaces_json_error() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("broken.json");
        fs::write(&path, "{not json")?;
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        Ok(())
    }
}
