//! # Design
//!
//! - Centralize application-level errors for bootstrap and the import flow.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;
use uuid::Uuid;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: rolodex_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: rolodex_telemetry::TelemetryError,
    },
    /// Import pipeline operations failed.
    #[error("import operation failed")]
    Import {
        /// Operation identifier.
        operation: &'static str,
        /// Source import error.
        source: rolodex_import::ImportError,
    },
    /// The run was cancelled before it produced a dispatch.
    #[error("import cancelled")]
    Cancelled {
        /// Cancelled run.
        run_id: Uuid,
    },
    /// Serialising the dispatch failed.
    #[error("dispatch serialisation failed")]
    Serialize {
        /// Operation identifier.
        operation: &'static str,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: rolodex_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: rolodex_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn import(operation: &'static str, source: rolodex_import::ImportError) -> Self {
        Self::Import { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn helpers_build_variants_with_sources() {
        let config = AppError::config(
            "load",
            rolodex_config::ConfigError::InvalidField {
                section: "import",
                field: "copy_chunk_bytes",
                value: Some("0".to_string()),
                reason: "out_of_range",
            },
        );
        assert!(matches!(config, AppError::Config { operation: "load", .. }));
        assert!(config.source().is_some());

        let import = AppError::import(
            "scan",
            rolodex_import::ImportError::NoRuntime { operation: "scan" },
        );
        assert_eq!(import.to_string(), "import operation failed");

        let cancelled = AppError::Cancelled { run_id: Uuid::nil() };
        assert!(cancelled.source().is_none());
    }
}
