//! Event payload types carried across the pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed pipeline events.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Discovery started below a storage root.
    ScanStarted {
        /// Run performing the scan.
        run_id: Uuid,
        /// Root directory being scanned.
        root: String,
    },
    /// Discovery finished with at least one candidate.
    ScanCompleted {
        /// Run that performed the scan.
        run_id: Uuid,
        /// Number of candidate files found.
        candidates: usize,
    },
    /// Discovery finished without any candidate.
    ScanNotFound {
        /// Run that performed the scan.
        run_id: Uuid,
    },
    /// Caching of the selected sources started.
    ImportStarted {
        /// Run performing the import.
        run_id: Uuid,
        /// Number of selected sources.
        sources: usize,
    },
    /// Run moved into a new lifecycle state.
    StateChanged {
        /// Run whose state changed.
        run_id: Uuid,
        /// State entered.
        state: PipelineState,
    },
    /// A pipeline step finished.
    StepProgress {
        /// Run executing the step.
        run_id: Uuid,
        /// Step label.
        step: String,
    },
    /// One source was copied into the cache.
    FileCached {
        /// Run owning the cache file.
        run_id: Uuid,
        /// Position of the source within the selection.
        source_index: usize,
        /// Bytes copied.
        bytes: u64,
    },
    /// Cached files and their meta information were handed to the consumer.
    ImportDispatched {
        /// Run that dispatched.
        run_id: Uuid,
        /// Number of dispatched files.
        files: usize,
        /// Sum of the estimated entry counts.
        entries: u64,
    },
    /// Run stopped after a cancellation request.
    RunCancelled {
        /// Run that was cancelled.
        run_id: Uuid,
    },
    /// Run terminated with an error.
    RunFailed {
        /// Run that failed.
        run_id: Uuid,
        /// Taxonomy label of the error.
        kind: String,
        /// Constant error message.
        message: String,
        /// Underlying cause text, when the error carries one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for subscribers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::ScanCompleted { .. } => "scan_completed",
            Self::ScanNotFound { .. } => "scan_not_found",
            Self::ImportStarted { .. } => "import_started",
            Self::StateChanged { .. } => "state_changed",
            Self::StepProgress { .. } => "step_progress",
            Self::FileCached { .. } => "file_cached",
            Self::ImportDispatched { .. } => "import_dispatched",
            Self::RunCancelled { .. } => "run_cancelled",
            Self::RunFailed { .. } => "run_failed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }

    /// Run the event belongs to, when it is run-scoped.
    #[must_use]
    pub const fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::ScanStarted { run_id, .. }
            | Self::ScanCompleted { run_id, .. }
            | Self::ScanNotFound { run_id }
            | Self::ImportStarted { run_id, .. }
            | Self::StateChanged { run_id, .. }
            | Self::StepProgress { run_id, .. }
            | Self::FileCached { run_id, .. }
            | Self::ImportDispatched { run_id, .. }
            | Self::RunCancelled { run_id }
            | Self::RunFailed { run_id, .. } => Some(*run_id),
            Self::HealthChanged { .. } => None,
        }
    }
}

/// Lifecycle states of one pipeline run.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Run constructed, no work started.
    Created,
    /// Scanning the storage root.
    Discovering,
    /// Candidates listed, waiting for the user's choice.
    AwaitingSelection,
    /// Copying sources into the cache.
    Caching,
    /// Probing cached files.
    CollectingMetaInfo,
    /// Handed off to the consumer.
    Dispatched,
    /// Terminated with an error.
    Failed,
    /// Terminated by a cancellation request.
    Cancelled,
    /// Discovery found nothing to import.
    NotFound,
}

impl PipelineState {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Discovering => "discovering",
            Self::AwaitingSelection => "awaiting_selection",
            Self::Caching => "caching",
            Self::CollectingMetaInfo => "collecting_meta_info",
            Self::Dispatched => "dispatched",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::NotFound => "not_found",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Dispatched | Self::Failed | Self::Cancelled | Self::NotFound
        )
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_type_tag() -> Result<(), serde_json::Error> {
        let event = Event::FileCached {
            run_id: Uuid::nil(),
            source_index: 2,
            bytes: 512,
        };
        let json = serde_json::to_value(&event)?;
        assert_eq!(json["type"], "file_cached");
        assert_eq!(json["source_index"], 2);

        let state = serde_json::to_value(Event::StateChanged {
            run_id: Uuid::nil(),
            state: PipelineState::CollectingMetaInfo,
        })?;
        assert_eq!(state["state"], "collecting_meta_info");
        Ok(())
    }

    #[test]
    fn run_scoped_events_expose_run_id() {
        let run_id = Uuid::from_u128(7);
        assert_eq!(Event::RunCancelled { run_id }.run_id(), Some(run_id));
        assert_eq!(
            Event::HealthChanged {
                degraded: vec!["import".into()]
            }
            .run_id(),
            None
        );
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = [
            PipelineState::Created,
            PipelineState::Discovering,
            PipelineState::AwaitingSelection,
            PipelineState::Caching,
            PipelineState::CollectingMetaInfo,
            PipelineState::Dispatched,
            PipelineState::Failed,
            PipelineState::Cancelled,
            PipelineState::NotFound,
        ]
        .into_iter()
        .filter(|state| state.is_terminal())
        .map(PipelineState::as_str)
        .collect();
        assert_eq!(terminal, ["dispatched", "failed", "cancelled", "not_found"]);
    }
}
