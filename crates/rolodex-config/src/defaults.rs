//! Baseline values applied when neither the config file nor the environment
//! supplies a setting.

use std::path::PathBuf;

/// Shared external storage mount scanned when no root is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "/sdcard";
/// Directory name created under the system temp dir for cached sources.
pub const DEFAULT_CACHE_DIR_NAME: &str = "rolodex-import-cache";
/// Private prefix carried by every pipeline-local cache file.
pub const DEFAULT_CACHE_PREFIX: &str = "import_tmp_";
/// File name suffix (case-insensitive) that marks an importable file.
pub const DEFAULT_FILE_SUFFIX: &str = ".vcf";
/// Buffer size used when copying sources into the cache.
pub const DEFAULT_COPY_CHUNK_BYTES: usize = 8 * 1024;
/// Upper bound accepted for the copy buffer.
pub const MAX_COPY_CHUNK_BYTES: usize = 64 * 1024 * 1024;
/// Default log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default cache directory below the platform temp directory.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME)
}
