//! Per-run state: the pipeline state machine and what each stage produced.

use rolodex_events::PipelineState;
use uuid::Uuid;

use crate::cancel::CancellationFlag;
use crate::error::{ErrorKind, ImportError, ImportResult};
use crate::model::{CachedEntry, CandidateFile};

/// Whether `to` may follow `from`.
#[must_use]
pub const fn transition_allowed(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState as S;
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (S::Created, S::Discovering | S::Caching)
            | (S::Discovering, S::AwaitingSelection | S::NotFound)
            | (S::AwaitingSelection, S::Caching)
            | (S::Caching, S::CollectingMetaInfo)
            | (S::CollectingMetaInfo, S::Dispatched)
            | (_, S::Failed | S::Cancelled)
    )
}

/// One execution of the pipeline. Not shared across threads; the owning
/// worker moves it between stages.
#[derive(Debug)]
pub struct PipelineRun {
    run_id: Uuid,
    state: PipelineState,
    history: Vec<PipelineState>,
    candidates: Vec<CandidateFile>,
    entries: Vec<CachedEntry>,
    cancel: CancellationFlag,
    failure: Option<ErrorKind>,
}

impl PipelineRun {
    /// Fresh run in [`PipelineState::Created`].
    #[must_use]
    pub fn new(cancel: CancellationFlag) -> Self {
        Self::with_id(Uuid::new_v4(), cancel)
    }

    /// Fresh run with a caller-chosen id.
    #[must_use]
    pub fn with_id(run_id: Uuid, cancel: CancellationFlag) -> Self {
        Self {
            run_id,
            state: PipelineState::Created,
            history: vec![PipelineState::Created],
            candidates: Vec::new(),
            entries: Vec::new(),
            cancel,
            failure: None,
        }
    }

    /// Run identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Whether the run ever entered `state`.
    #[must_use]
    pub fn visited(&self, state: PipelineState) -> bool {
        self.history.contains(&state)
    }

    /// Move to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidTransition`] when the state machine does
    /// not allow the move; the state is left unchanged.
    pub fn transition(&mut self, to: PipelineState) -> ImportResult<()> {
        if !transition_allowed(self.state, to) {
            return Err(ImportError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to `Cancelled` or `Failed` according to `error`. Only the first
    /// failure is recorded; later calls on a terminal run change nothing.
    pub fn fail(&mut self, error: &ImportError) {
        let target = if error.is_cancelled() {
            PipelineState::Cancelled
        } else {
            PipelineState::Failed
        };
        if self.failure.is_none() {
            self.failure = Some(error.kind());
        }
        if transition_allowed(self.state, target) {
            self.state = target;
            self.history.push(target);
        }
    }

    /// Class of the first recorded failure.
    #[must_use]
    pub const fn failure(&self) -> Option<ErrorKind> {
        self.failure
    }

    /// Cancellation flag shared with the run's handle.
    #[must_use]
    pub const fn cancel_flag(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Discovered candidates.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateFile] {
        &self.candidates
    }

    pub(crate) fn set_candidates(&mut self, candidates: Vec<CandidateFile>) {
        self.candidates = candidates;
    }

    /// Cached entries.
    #[must_use]
    pub fn entries(&self) -> &[CachedEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [CachedEntry] {
        &mut self.entries
    }

    pub(crate) fn set_entries(&mut self, entries: Vec<CachedEntry>) {
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState as S;

    #[test]
    fn happy_path_is_accepted() -> ImportResult<()> {
        let mut run = PipelineRun::new(CancellationFlag::new());
        for state in [
            S::Discovering,
            S::AwaitingSelection,
            S::Caching,
            S::CollectingMetaInfo,
            S::Dispatched,
        ] {
            run.transition(state)?;
        }
        assert_eq!(run.state(), S::Dispatched);
        assert_eq!(run.history().len(), 6);
        Ok(())
    }

    #[test]
    fn direct_invocation_skips_discovery() -> ImportResult<()> {
        let mut run = PipelineRun::new(CancellationFlag::new());
        run.transition(S::Caching)?;
        assert!(!run.visited(S::Discovering));
        Ok(())
    }

    #[test]
    fn skipping_stages_is_internal_error() {
        let mut run = PipelineRun::new(CancellationFlag::new());
        let err = run.transition(S::Dispatched).err();
        assert!(matches!(
            err,
            Some(ImportError::InvalidTransition {
                from: S::Created,
                to: S::Dispatched
            })
        ));
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Internal));
        assert_eq!(run.state(), S::Created);
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [S::Dispatched, S::Failed, S::Cancelled, S::NotFound] {
            for next in [S::Discovering, S::Failed, S::Cancelled] {
                assert!(!transition_allowed(terminal, next));
            }
        }
    }

    #[test]
    fn first_error_wins() {
        let mut run = PipelineRun::new(CancellationFlag::new());
        run.fail(&ImportError::Cancelled {
            operation: "copy_sources",
        });
        run.fail(&ImportError::AllUnsupported { files: 1 });
        assert_eq!(run.state(), S::Cancelled);
        assert_eq!(run.failure(), Some(ErrorKind::Cancelled));
        assert_eq!(run.history().last(), Some(&S::Cancelled));
    }
}
