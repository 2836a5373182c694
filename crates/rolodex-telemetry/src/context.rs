//! Span helpers for the application and for individual pipeline runs.

use tracing::span::EnteredSpan;
use tracing::{Span, field};
use uuid::Uuid;

use crate::init::build_sha;

/// Keeps the `app` span entered until dropped, so every log line carries the
/// application mode and build SHA.
pub struct GlobalContextGuard {
    _span: EnteredSpan,
}

impl GlobalContextGuard {
    /// Enter an `app` span tagged with `mode`.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span = tracing::info_span!("app", mode = %mode, build_sha = build_sha());
        Self {
            _span: span.entered(),
        }
    }
}

/// Overwrite the `mode` field on the current span.
pub fn record_app_mode(mode: &str) {
    Span::current().record("mode", field::display(mode));
}

/// Span wrapping the work of one pipeline run; `phase` is `scan` or `import`.
#[must_use]
pub fn run_span(run_id: Uuid, phase: &'static str) -> Span {
    tracing::info_span!("import_run", run_id = %run_id, phase)
}
