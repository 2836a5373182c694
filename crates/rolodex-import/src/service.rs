//! Import service wiring discovery, caching, meta collection, and dispatch.
//!
//! # Design
//! - Every stage runs as a recorded step: a progress event on start and a
//!   `pipeline_steps_total{step,status}` increment on start and on completion.
//! - Synchronous entry points do the work on the calling thread; the async
//!   entry points move it onto `spawn_blocking` with a supervising task that
//!   turns a lost worker into a failed outcome and delivers exactly one outcome.
//! - Keep-awake, active-run metrics, and cache files are owned by guards so
//!   every exit path, unwinding included, releases them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rolodex_config::ImportPolicy;
use rolodex_events::{Event, EventBus, PipelineState};
use rolodex_telemetry::{Metrics, run_span};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::CacheCopier;
use crate::cancel::CancellationFlag;
use crate::discovery::{DiscoveryOutcome, FileDiscovery};
use crate::dispatch::{ImportConsumer, ImportDispatcher};
use crate::error::{ImportError, ImportResult};
use crate::keep_awake::{KeepAwake, KeepAwakeGuard, NoopKeepAwake};
use crate::meta::MetaInfoCollector;
use crate::model::{Account, ImportDispatch, SourceLocator};
use crate::run::PipelineRun;
use crate::selection::{Selection, SelectionPrompt, selection_prompt};
use crate::source::{FileSourceOpener, SourceOpener};
use crate::vcard::VcardProbe;

const HEALTH_COMPONENT: &str = "import";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    DiscoverFiles,
    SweepCache,
    CopySources,
    CollectMeta,
    Dispatch,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::DiscoverFiles => "discover_files",
            Self::SweepCache => "sweep_cache",
            Self::CopySources => "copy_sources",
            Self::CollectMeta => "collect_meta",
            Self::Dispatch => "dispatch",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

enum Settled {
    Cancelled,
    Failed(ImportError),
}

/// Result of a scan.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Candidates were found; the run waits for a selection.
    Found {
        /// Run in [`PipelineState::AwaitingSelection`], carrying the candidates.
        run: PipelineRun,
        /// How the invoking context should ask for a selection.
        prompt: SelectionPrompt,
    },
    /// The scan completed without a match.
    NotFound {
        /// Finished run.
        run_id: Uuid,
    },
    /// The scan was cancelled; no partial list is reported.
    Cancelled {
        /// Cancelled run.
        run_id: Uuid,
    },
    /// The scan failed.
    Failed {
        /// Failed run.
        run_id: Uuid,
        /// What went wrong.
        error: ImportError,
    },
}

/// Result of an import.
#[derive(Debug)]
pub enum ImportOutcome {
    /// The consumer accepted the dispatch.
    Dispatched(ImportDispatch),
    /// The import was cancelled and its cache files removed.
    Cancelled {
        /// Cancelled run.
        run_id: Uuid,
    },
    /// The import failed and its cache files were removed.
    Failed {
        /// Failed run.
        run_id: Uuid,
        /// What went wrong.
        error: ImportError,
    },
}

/// Sources and target account for one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Sources to copy, in order.
    pub locators: Vec<SourceLocator>,
    /// Target account; `None` keeps contacts on the phone.
    pub account: Option<Account>,
}

impl ImportRequest {
    /// Request for explicit locators.
    #[must_use]
    pub const fn new(locators: Vec<SourceLocator>, account: Option<Account>) -> Self {
        Self { locators, account }
    }

    /// Request for the candidates `selection` picks out of a scanned run.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidInput`] when the selection does not fit
    /// the run's candidates.
    pub fn from_selection(
        run: &PipelineRun,
        selection: &Selection,
        account: Option<Account>,
    ) -> ImportResult<Self> {
        let locators = selection
            .resolve(run.candidates())?
            .into_iter()
            .map(|candidate| candidate.locator())
            .collect();
        Ok(Self::new(locators, account))
    }
}

/// Handle to a background scan.
#[derive(Debug)]
pub struct ScanHandle {
    run_id: Uuid,
    cancel: CancellationFlag,
    outcome: oneshot::Receiver<ScanOutcome>,
}

impl ScanHandle {
    /// Run identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request cancellation; the worker stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the single outcome of the scan.
    pub async fn wait(self) -> ScanOutcome {
        let run_id = self.run_id;
        self.outcome.await.unwrap_or_else(|_| ScanOutcome::Failed {
            run_id,
            error: lost_outcome("scan"),
        })
    }
}

/// Handle to a background import.
#[derive(Debug)]
pub struct ImportHandle {
    run_id: Uuid,
    cancel: CancellationFlag,
    outcome: oneshot::Receiver<ImportOutcome>,
}

impl ImportHandle {
    /// Run identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request cancellation; the worker stops at its next chunk or file boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the single outcome of the import.
    pub async fn wait(self) -> ImportOutcome {
        let run_id = self.run_id;
        self.outcome.await.unwrap_or_else(|_| ImportOutcome::Failed {
            run_id,
            error: lost_outcome("import"),
        })
    }
}

fn lost_outcome(operation: &'static str) -> ImportError {
    ImportError::WorkerLost {
        operation,
        detail: "outcome channel closed".to_string(),
    }
}

struct ActiveRun<'a> {
    metrics: &'a Metrics,
}

impl<'a> ActiveRun<'a> {
    fn start(metrics: &'a Metrics) -> Self {
        metrics.run_started();
        Self { metrics }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.metrics.run_finished();
    }
}

/// Runs the import pipeline and reports progress on the shared event bus.
#[derive(Clone)]
pub struct ImportService {
    policy: Arc<ImportPolicy>,
    events: EventBus,
    metrics: Metrics,
    discovery: FileDiscovery,
    copier: CacheCopier,
    collector: MetaInfoCollector,
    opener: Arc<dyn SourceOpener>,
    consumer: Arc<dyn ImportConsumer>,
    keep_awake: Arc<dyn KeepAwake>,
    health_degraded: Arc<Mutex<bool>>,
}

impl ImportService {
    /// Service reading local files and handing dispatches to `consumer`.
    #[must_use]
    pub fn new(
        policy: ImportPolicy,
        events: EventBus,
        metrics: Metrics,
        consumer: Arc<dyn ImportConsumer>,
    ) -> Self {
        Self {
            discovery: FileDiscovery::new(&policy.file_suffix),
            copier: CacheCopier::from_policy(&policy),
            collector: MetaInfoCollector::new(policy.abort_on_first_unsupported),
            policy: Arc::new(policy),
            events,
            metrics,
            opener: Arc::new(FileSourceOpener),
            consumer,
            keep_awake: Arc::new(NoopKeepAwake),
            health_degraded: Arc::new(Mutex::new(false)),
        }
    }

    /// Replace the source opener.
    #[must_use]
    pub fn with_source_opener(mut self, opener: Arc<dyn SourceOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Replace the keep-awake provider.
    #[must_use]
    pub fn with_keep_awake(mut self, keep_awake: Arc<dyn KeepAwake>) -> Self {
        self.keep_awake = keep_awake;
        self
    }

    /// Replace the primary and fallback probes.
    #[must_use]
    pub fn with_probes(mut self, primary: Arc<dyn VcardProbe>, fallback: Arc<dyn VcardProbe>) -> Self {
        self.collector = MetaInfoCollector::with_probes(
            primary,
            fallback,
            self.policy.abort_on_first_unsupported,
        );
        self
    }

    /// Policy the service was built with.
    #[must_use]
    pub fn policy(&self) -> &ImportPolicy {
        &self.policy
    }

    /// Scan `root` on the calling thread.
    pub fn run_scan(&self, root: &Path, cancel: CancellationFlag) -> ScanOutcome {
        self.scan_run(PipelineRun::new(cancel), root)
    }

    /// Copy, inspect, and dispatch the sources in `request` on the calling thread.
    ///
    /// `run` is either fresh (direct invocation) or a run returned by a scan.
    pub fn run_import(&self, mut run: PipelineRun, request: &ImportRequest) -> ImportOutcome {
        let run_id = run.run_id();
        let span = run_span(run_id, "import");
        let _entered = span.enter();
        let _active = ActiveRun::start(&self.metrics);
        self.publish_event(Event::ImportStarted {
            run_id,
            sources: request.locators.len(),
        });

        match self.execute_import(&mut run, request) {
            Ok(dispatch) => {
                self.mark_recovered();
                self.metrics.inc_run_outcome("dispatched");
                ImportOutcome::Dispatched(dispatch)
            }
            Err(error) => match self.settle(&mut run, error) {
                Settled::Cancelled => ImportOutcome::Cancelled { run_id },
                Settled::Failed(error) => ImportOutcome::Failed { run_id, error },
            },
        }
    }

    /// Scan `root` on a blocking worker.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::NoRuntime`] outside a Tokio runtime.
    pub fn scan(&self, root: PathBuf) -> ImportResult<ScanHandle> {
        let cancel = CancellationFlag::new();
        let run = PipelineRun::new(cancel.clone());
        let run_id = run.run_id();
        let worker = self.clone();
        let supervisor = self.clone();
        let outcome = spawn_supervised(
            "scan",
            run_id,
            move || worker.scan_run(run, &root),
            move |error| match supervisor.settle_lost(run_id, error) {
                Settled::Cancelled => ScanOutcome::Cancelled { run_id },
                Settled::Failed(error) => ScanOutcome::Failed { run_id, error },
            },
        )?;
        Ok(ScanHandle {
            run_id,
            cancel,
            outcome,
        })
    }

    /// Import the candidates `selection` picks out of a scanned run, on a
    /// blocking worker.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidInput`] for a selection that does not fit
    /// the run, and [`ImportError::NoRuntime`] outside a Tokio runtime.
    pub fn import_selected(
        &self,
        run: PipelineRun,
        selection: &Selection,
        account: Option<Account>,
    ) -> ImportResult<ImportHandle> {
        let request = ImportRequest::from_selection(&run, selection, account)?;
        self.spawn_import(run, request)
    }

    /// Import caller-supplied locators without a scan, on a blocking worker.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::NoRuntime`] outside a Tokio runtime.
    pub fn import_locators(
        &self,
        locators: Vec<SourceLocator>,
        account: Option<Account>,
    ) -> ImportResult<ImportHandle> {
        let run = PipelineRun::new(CancellationFlag::new());
        self.spawn_import(run, ImportRequest::new(locators, account))
    }

    fn spawn_import(&self, run: PipelineRun, request: ImportRequest) -> ImportResult<ImportHandle> {
        let run_id = run.run_id();
        let cancel = run.cancel_flag().clone();
        let worker = self.clone();
        let supervisor = self.clone();
        let outcome = spawn_supervised(
            "import",
            run_id,
            move || worker.run_import(run, &request),
            move |error| match supervisor.settle_lost(run_id, error) {
                Settled::Cancelled => ImportOutcome::Cancelled { run_id },
                Settled::Failed(error) => ImportOutcome::Failed { run_id, error },
            },
        )?;
        Ok(ImportHandle {
            run_id,
            cancel,
            outcome,
        })
    }

    fn scan_run(&self, mut run: PipelineRun, root: &Path) -> ScanOutcome {
        let run_id = run.run_id();
        let span = run_span(run_id, "scan");
        let _entered = span.enter();
        let _active = ActiveRun::start(&self.metrics);
        self.publish_event(Event::ScanStarted {
            run_id,
            root: root.display().to_string(),
        });

        match self.execute_scan(&mut run, root) {
            Ok(Some(prompt)) => ScanOutcome::Found { run, prompt },
            Ok(None) => {
                info!(root = %root.display(), "no importable files found");
                self.metrics.inc_run_outcome("not_found");
                ScanOutcome::NotFound { run_id }
            }
            Err(error) => match self.settle(&mut run, error) {
                Settled::Cancelled => ScanOutcome::Cancelled { run_id },
                Settled::Failed(error) => ScanOutcome::Failed { run_id, error },
            },
        }
    }

    fn execute_scan(&self, run: &mut PipelineRun, root: &Path) -> ImportResult<Option<SelectionPrompt>> {
        let run_id = run.run_id();
        self.advance(run, PipelineState::Discovering)?;

        let outcome = {
            let _awake = KeepAwakeGuard::acquire(self.keep_awake.as_ref(), "discovery");
            let cancel = run.cancel_flag();
            self.execute_step(run_id, StepKind::DiscoverFiles, || {
                self.discovery.discover(root, cancel)
            })?
        };

        match outcome {
            DiscoveryOutcome::Found(candidates) => {
                let count = candidates.len();
                self.metrics.add_files_discovered(count as u64);
                run.set_candidates(candidates);
                self.publish_event(Event::ScanCompleted {
                    run_id,
                    candidates: count,
                });
                self.advance(run, PipelineState::AwaitingSelection)?;
                info!(candidates = count, "scan completed");
                Ok(Some(selection_prompt(count, &self.policy)))
            }
            DiscoveryOutcome::NotFound => {
                self.advance(run, PipelineState::NotFound)?;
                self.publish_event(Event::ScanNotFound { run_id });
                Ok(None)
            }
        }
    }

    fn execute_import(&self, run: &mut PipelineRun, request: &ImportRequest) -> ImportResult<ImportDispatch> {
        let run_id = run.run_id();
        if request.locators.is_empty() {
            return Err(ImportError::invalid_input("locators", "empty", None));
        }
        self.advance(run, PipelineState::Caching)?;
        let cancel = run.cancel_flag().clone();

        let session = {
            let _awake = KeepAwakeGuard::acquire(self.keep_awake.as_ref(), "import");
            self.execute_step(run_id, StepKind::SweepCache, || {
                self.copier.sweep_stale().map(|_| ())
            })?;

            let mut session = self.copier.begin(run_id)?;
            let entries = self.execute_step(run_id, StepKind::CopySources, || {
                self.copier.copy_all(
                    &mut session,
                    self.opener.as_ref(),
                    &request.locators,
                    &cancel,
                    |source_index, bytes| {
                        self.metrics.add_bytes_cached(bytes);
                        self.publish_event(Event::FileCached {
                            run_id,
                            source_index,
                            bytes,
                        });
                    },
                )
            })?;
            run.set_entries(entries);

            self.advance(run, PipelineState::CollectingMetaInfo)?;
            let summary = self.execute_step(run_id, StepKind::CollectMeta, || {
                self.collector.collect(run.entries_mut(), &cancel)
            })?;
            self.metrics.add_entries_detected(summary.entries);
            debug!(
                supported = summary.supported,
                unsupported = summary.unsupported,
                entries = summary.entries,
                "meta info collected"
            );
            session
        };

        let dispatch = ImportDispatcher::build(run_id, run.entries(), request.account.as_ref());
        self.execute_step(run_id, StepKind::Dispatch, || {
            cancel.check("dispatch")?;
            self.consumer.consume(dispatch.clone())
        })?;
        let committed = session.commit();
        self.advance(run, PipelineState::Dispatched)?;
        self.publish_event(Event::ImportDispatched {
            run_id,
            files: dispatch.len(),
            entries: dispatch.total_entries(),
        });
        info!(
            files = dispatch.len(),
            cached = committed.len(),
            entries = dispatch.total_entries(),
            "import dispatched"
        );
        Ok(dispatch)
    }

    fn execute_step<T, F>(&self, run_id: Uuid, step: StepKind, op: F) -> ImportResult<T>
    where
        F: FnOnce() -> ImportResult<T>,
    {
        self.publish_event(Event::StepProgress {
            run_id,
            step: step.as_str().to_string(),
        });
        self.metrics
            .inc_pipeline_step(step.as_str(), StepStatus::Started.as_str());

        let result = op();
        let status = match &result {
            Ok(_) => StepStatus::Completed,
            Err(err) if err.is_cancelled() => StepStatus::Cancelled,
            Err(_) => StepStatus::Failed,
        };
        self.metrics.inc_pipeline_step(step.as_str(), status.as_str());
        debug!(step = step.as_str(), status = status.as_str(), "pipeline step finished");
        result
    }

    fn advance(&self, run: &mut PipelineRun, state: PipelineState) -> ImportResult<()> {
        run.transition(state)?;
        self.publish_event(Event::StateChanged {
            run_id: run.run_id(),
            state,
        });
        Ok(())
    }

    fn settle(&self, run: &mut PipelineRun, error: ImportError) -> Settled {
        let run_id = run.run_id();
        run.fail(&error);
        self.publish_event(Event::StateChanged {
            run_id,
            state: run.state(),
        });
        self.settle_lost(run_id, error)
    }

    fn settle_lost(&self, run_id: Uuid, error: ImportError) -> Settled {
        if error.is_cancelled() {
            info!(run_id = %run_id, "import run cancelled");
            self.metrics.inc_run_outcome("cancelled");
            self.publish_event(Event::RunCancelled { run_id });
            return Settled::Cancelled;
        }

        let kind = error.kind();
        let cause = error.source_detail();
        let detail = format!("{error}: {error:?}");
        warn!(
            run_id = %run_id,
            kind = kind.as_str(),
            error = %error,
            cause = cause.as_deref().unwrap_or_default(),
            detail = %detail,
            "import run failed"
        );
        self.mark_degraded(&detail);
        self.metrics.inc_run_outcome("failed");
        self.publish_event(Event::RunFailed {
            run_id,
            kind: kind.as_str().to_string(),
            message: error.to_string(),
            detail: cause,
        });
        Settled::Failed(error)
    }

    fn mark_degraded(&self, detail: &str) {
        let mut guard = self.lock_health_flag();
        if *guard {
            drop(guard);
            debug!(component = HEALTH_COMPONENT, detail, "import pipeline still degraded");
        } else {
            *guard = true;
            drop(guard);
            warn!(component = HEALTH_COMPONENT, detail, "import pipeline degraded");
            self.publish_event(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&self) {
        let mut guard = self.lock_health_flag();
        if std::mem::take(&mut *guard) {
            drop(guard);
            self.publish_event(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "import pipeline recovered");
        }
    }

    fn publish_event(&self, event: Event) {
        let kind = event.kind();
        self.metrics.inc_event(kind);
        if let Err(error) = self.events.publish(event) {
            debug!(
                event_id = error.event_id(),
                event_kind = error.event_kind(),
                "event retained for replay without live subscribers"
            );
        }
    }

    fn lock_health_flag(&self) -> MutexGuard<'_, bool> {
        match self.health_degraded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("import health mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

fn spawn_supervised<T, W, L>(
    operation: &'static str,
    run_id: Uuid,
    work: W,
    on_lost: L,
) -> ImportResult<oneshot::Receiver<T>>
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    L: FnOnce(ImportError) -> T + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|_| ImportError::NoRuntime { operation })?;
    let (sender, receiver) = oneshot::channel();
    let worker = runtime.spawn_blocking(work);
    runtime.spawn(async move {
        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!(run_id = %run_id, operation, error = %join_error, "import worker lost");
                on_lost(ImportError::WorkerLost {
                    operation,
                    detail: join_error.to_string(),
                })
            }
        };
        if sender.send(outcome).is_err() {
            debug!(run_id = %run_id, operation, "outcome receiver dropped before delivery");
        }
    });
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ChannelConsumer;
    use anyhow::{Result, bail};
    use rolodex_test_support::fixtures::{scratch_dir, vcard_v21, write_tree};

    fn service(cache_dir: &Path) -> Result<(ImportService, tokio::sync::mpsc::UnboundedReceiver<ImportDispatch>)> {
        let policy = ImportPolicy {
            cache_dir: cache_dir.to_path_buf(),
            ..ImportPolicy::default()
        };
        let (consumer, receiver) = ChannelConsumer::new();
        let service = ImportService::new(policy, EventBus::new(), Metrics::new()?, Arc::new(consumer));
        Ok((service, receiver))
    }

    #[test]
    fn empty_request_is_invalid_input() -> Result<()> {
        let cache = scratch_dir("service-empty")?;
        let (service, _receiver) = service(cache.path())?;
        let outcome = service.run_import(
            PipelineRun::new(CancellationFlag::new()),
            &ImportRequest::new(Vec::new(), None),
        );
        let ImportOutcome::Failed { error, .. } = outcome else {
            bail!("expected failure");
        };
        assert!(matches!(error, ImportError::InvalidInput { field: "locators", .. }));
        Ok(())
    }

    #[test]
    fn steps_are_counted_per_status() -> Result<()> {
        let storage = scratch_dir("service-steps")?;
        let cache = scratch_dir("service-steps-cache")?;
        write_tree(storage.path(), &[("a.vcf", &vcard_v21("A"))])?;
        let (service, mut receiver) = service(cache.path())?;

        let ScanOutcome::Found { run, .. } = service.run_scan(storage.path(), CancellationFlag::new()) else {
            bail!("expected candidates");
        };
        let request = ImportRequest::from_selection(&run, &Selection::All, None)?;
        let outcome = service.run_import(run, &request);
        assert!(matches!(outcome, ImportOutcome::Dispatched(_)));
        assert!(receiver.try_recv().is_ok());

        for step in ["discover_files", "sweep_cache", "copy_sources", "collect_meta", "dispatch"] {
            assert_eq!(service.metrics.pipeline_step_count(step, "started"), 1, "{step}");
            assert_eq!(service.metrics.pipeline_step_count(step, "completed"), 1, "{step}");
        }
        assert_eq!(service.metrics.run_outcome_count("dispatched"), 1);
        assert_eq!(service.metrics.snapshot().active_runs, 0);
        Ok(())
    }

    #[test]
    fn closed_consumer_fails_and_removes_cache_files() -> Result<()> {
        let storage = scratch_dir("service-closed")?;
        let cache = scratch_dir("service-closed-cache")?;
        let files = write_tree(storage.path(), &[("a.vcf", &vcard_v21("A"))])?;
        let (service, receiver) = service(cache.path())?;
        drop(receiver);

        let locators = files.iter().map(|path| SourceLocator::from_path(path)).collect();
        let outcome = service.run_import(
            PipelineRun::new(CancellationFlag::new()),
            &ImportRequest::new(locators, None),
        );
        let ImportOutcome::Failed { error, .. } = outcome else {
            bail!("expected failure");
        };
        assert!(matches!(error, ImportError::ConsumerClosed { .. }));
        assert_eq!(std::fs::read_dir(cache.path())?.count(), 0);
        assert_eq!(service.metrics.pipeline_step_count("dispatch", "failed"), 1);
        Ok(())
    }

    #[test]
    fn scan_outside_runtime_is_rejected() -> Result<()> {
        let cache = scratch_dir("service-runtime")?;
        let (service, _receiver) = service(cache.path())?;
        let err = service.scan(cache.path().to_path_buf()).err();
        assert!(matches!(err, Some(ImportError::NoRuntime { operation: "scan" })));
        Ok(())
    }
}
