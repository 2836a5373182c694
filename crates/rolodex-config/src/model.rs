//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; IO lives in `loader.rs`, checks live in `validate.rs`.
//! - Every section deserialises with defaults so partial documents are accepted.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CACHE_PREFIX, DEFAULT_COPY_CHUNK_BYTES, DEFAULT_FILE_SUFFIX, DEFAULT_LOG_LEVEL,
    DEFAULT_STORAGE_ROOT, default_cache_dir,
};
use crate::error::ConfigError;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolodexConfig {
    /// Import pipeline policy.
    pub import: ImportPolicy,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Policy snapshot describing how the import pipeline behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportPolicy {
    /// Root directory scanned for candidate files.
    pub storage_root: PathBuf,
    /// Directory holding pipeline-local cache files.
    pub cache_dir: PathBuf,
    /// Private prefix used to name (and sweep) cache files.
    pub cache_prefix: String,
    /// Case-insensitive file name suffix of importable files.
    pub file_suffix: String,
    /// Buffer size used while copying sources.
    pub copy_chunk_bytes: usize,
    /// Abort the whole run on the first file no dialect recognises.
    pub abort_on_first_unsupported: bool,
    /// Import every discovered file without asking the user.
    pub import_all_automatically: bool,
    /// Offer the one/multiple/all choice instead of a single-file picker.
    pub allow_select_all: bool,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            cache_dir: default_cache_dir(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            copy_chunk_bytes: DEFAULT_COPY_CHUNK_BYTES,
            abort_on_first_unsupported: true,
            import_all_automatically: false,
            allow_select_all: true,
        }
    }
}

/// Logging settings consumed by the telemetry crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormatSetting,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormatSetting::Auto,
        }
    }
}

/// Requested log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// Pick based on the build profile.
    Auto,
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

impl LogFormatSetting {
    /// Stable string form used in documents and env vars.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormatSetting {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid(
                "logging",
                "format",
                Some(value.to_string()),
                "unknown_format",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fall_back_to_defaults() -> anyhow::Result<()> {
        let parsed: RolodexConfig =
            serde_json::from_str(r#"{"import":{"abort_on_first_unsupported":false}}"#)?;
        assert!(!parsed.import.abort_on_first_unsupported);
        assert_eq!(parsed.import.file_suffix, ".vcf");
        assert_eq!(parsed.import.copy_chunk_bytes, DEFAULT_COPY_CHUNK_BYTES);
        assert_eq!(parsed.logging, LoggingSettings::default());
        Ok(())
    }

    #[test]
    fn log_format_parses_and_formats() {
        assert_eq!("JSON".parse::<LogFormatSetting>().ok(), Some(LogFormatSetting::Json));
        assert_eq!(" pretty ".parse::<LogFormatSetting>().ok(), Some(LogFormatSetting::Pretty));
        assert!("xml".parse::<LogFormatSetting>().is_err());
        assert_eq!(LogFormatSetting::Auto.as_str(), "auto");
    }
}
