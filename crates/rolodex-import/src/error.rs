//! # Design
//!
//! - Provide structured, constant-message errors for the import pipeline.
//! - Capture operation context (paths, locators, fields) so failures are reproducible in tests.
//! - Map every variant onto the small outcome taxonomy through [`ImportError::kind`].

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use rolodex_events::PipelineState;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Result type for import pipeline operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Outcome class of an error, as reported to the invoking context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// User- or system-initiated cancellation.
    Cancelled,
    /// Read, write, or listing failure, including buffer allocation failure.
    IoError,
    /// No known dialect accepted a file.
    Unsupported,
    /// A file broke the card structure.
    Malformed,
    /// The storage root is missing or cannot be listed.
    StorageUnavailable,
    /// Caller-supplied selection or locator was invalid.
    InvalidInput,
    /// Pipeline invariant violated, worker lost, or consumer gone.
    Internal,
}

impl ErrorKind {
    /// Stable label used in events and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::IoError => "io_error",
            Self::Unsupported => "unsupported",
            Self::Malformed => "malformed",
            Self::StorageUnavailable => "storage_unavailable",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal",
        }
    }
}

/// Errors produced by the import pipeline.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Work stopped after a cancellation request.
    #[error("import cancelled")]
    Cancelled {
        /// Operation that observed the cancellation.
        operation: &'static str,
    },
    /// The storage root could not be scanned.
    #[error("storage unavailable")]
    StorageUnavailable {
        /// Root that was requested.
        path: PathBuf,
        /// Static reason for the failure.
        reason: &'static str,
        /// Underlying IO error when one was observed.
        source: Option<io::Error>,
    },
    /// IO failures while interacting with the filesystem.
    #[error("import io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// IO failures while opening or reading a source.
    #[error("import source failure")]
    Source {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Locator of the failing source.
        locator: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("import walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The copy buffer could not be allocated.
    #[error("copy buffer allocation failed")]
    BufferAllocation {
        /// Requested buffer size in bytes.
        requested: usize,
        /// Underlying reservation error.
        source: TryReserveError,
    },
    /// Neither probe recognised a file.
    #[error("unsupported vcard file")]
    Unsupported {
        /// Cached file that was rejected.
        path: PathBuf,
    },
    /// Every cached file was rejected while unsupported files were tolerated.
    #[error("no supported vcard file")]
    AllUnsupported {
        /// Number of rejected files.
        files: usize,
    },
    /// A file broke the card structure.
    #[error("malformed vcard file")]
    Malformed {
        /// Cached file that failed.
        path: PathBuf,
        /// Line on which the fault was detected.
        line: u64,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Input validation failures.
    #[error("import invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// A run attempted a transition its state machine forbids.
    #[error("invalid pipeline state transition")]
    InvalidTransition {
        /// State the run was in.
        from: PipelineState,
        /// State that was requested.
        to: PipelineState,
    },
    /// The downstream consumer stopped accepting dispatches.
    #[error("import consumer closed")]
    ConsumerClosed {
        /// Run whose dispatch was rejected.
        run_id: Uuid,
    },
    /// A background worker ended without delivering an outcome.
    #[error("import worker lost")]
    WorkerLost {
        /// Operation the worker was running.
        operation: &'static str,
        /// Panic or join detail.
        detail: String,
    },
    /// Background work was requested outside a Tokio runtime.
    #[error("no async runtime available")]
    NoRuntime {
        /// Operation that needed the runtime.
        operation: &'static str,
    },
}

impl ImportError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn source_io(
        operation: &'static str,
        locator: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::Source {
            operation,
            locator: locator.into(),
            source,
        }
    }

    pub(crate) fn invalid_input(
        field: &'static str,
        reason: &'static str,
        value: impl Into<Option<String>>,
    ) -> Self {
        Self::InvalidInput {
            field,
            reason,
            value: value.into(),
        }
    }

    /// Taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            Self::Io { .. }
            | Self::Source { .. }
            | Self::Walkdir { .. }
            | Self::BufferAllocation { .. } => ErrorKind::IoError,
            Self::Unsupported { .. } | Self::AllUnsupported { .. } => ErrorKind::Unsupported,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidTransition { .. }
            | Self::ConsumerClosed { .. }
            | Self::WorkerLost { .. }
            | Self::NoRuntime { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the error only reports a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Text of the underlying cause chain, joined with `": "`.
    ///
    /// `None` when the error carries no cause. A lost worker reports its
    /// join failure here.
    #[must_use]
    pub fn source_detail(&self) -> Option<String> {
        if let Self::WorkerLost { detail, .. } = self {
            return Some(detail.clone());
        }
        let mut parts = Vec::new();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            parts.push(err.to_string());
            cause = std::error::Error::source(err);
        }
        (!parts.is_empty()).then(|| parts.join(": "))
    }
}
