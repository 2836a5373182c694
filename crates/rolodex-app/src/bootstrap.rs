use std::io::{self, Write};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use rolodex_config::{ConfigLoader, LogFormatSetting, RolodexConfig};
use rolodex_events::EventBus;
use rolodex_import::{
    AccountChoice, AccountRegistry, CandidateFile, ChannelConsumer, ImportDispatch, ImportOutcome,
    ImportService, ScanOutcome, Selection, SelectionPrompt, StaticAccountRegistry,
    resolve_account,
};
use rolodex_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, record_app_mode};
use tracing::{info, warn};

const BUILD_SHA: &str = match option_env!("ROLODEX_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to run one import.
pub struct BootstrapDependencies {
    config: RolodexConfig,
    events: EventBus,
    metrics: Metrics,
    accounts: Arc<dyn AccountRegistry>,
}

impl BootstrapDependencies {
    /// Wire dependencies around an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the metrics registry cannot be built.
    pub fn new(config: RolodexConfig, accounts: Arc<dyn AccountRegistry>) -> AppResult<Self> {
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            events: EventBus::new(),
            metrics,
            accounts,
        })
    }

    /// Construct production dependencies from the environment for the binary entrypoint.
    ///
    /// No account provider exists on a plain host, so contacts stay phone-local.
    ///
    /// # Errors
    ///
    /// Returns an error when configuration loading or metrics setup fails.
    pub fn from_env() -> AppResult<Self> {
        let config = ConfigLoader::from_env()
            .load()
            .map_err(|err| AppError::config("config.load", err))?;
        Self::new(config, Arc::new(StaticAccountRegistry::default()))
    }
}

/// Entry point for the binary: load, log, import, print.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, the import run, or
/// writing the dispatch fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = &dependencies.config.logging;
    let format = match logging.format {
        LogFormatSetting::Auto => LogFormat::infer(),
        LogFormatSetting::Pretty => LogFormat::Pretty,
        LogFormatSetting::Json => LogFormat::Json,
    };
    rolodex_telemetry::init_logging(&LoggingConfig {
        level: &logging.level,
        format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    let Some(dispatch) = run_app_with(dependencies).await? else {
        return Ok(());
    };
    let rendered = serde_json::to_string_pretty(&dispatch).map_err(|source| AppError::Serialize {
        operation: "dispatch.render",
        source,
    })?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|source| AppError::Io {
        operation: "dispatch.write",
        source,
    })
}

/// Non-interactive import flow over injected dependencies.
///
/// Returns `None` when the storage root holds no importable file.
///
/// # Errors
///
/// Returns an error when the scan or the import fails or is cancelled.
pub async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<Option<ImportDispatch>> {
    let BootstrapDependencies {
        config,
        events,
        metrics,
        accounts,
    } = dependencies;
    record_app_mode("import");

    let root = config.import.storage_root.clone();
    info!(root = %root.display(), "rolodex import starting");
    let (consumer, _dispatches) = ChannelConsumer::new();
    let service = ImportService::new(config.import, events, metrics, Arc::new(consumer));

    let scan = service
        .scan(root)
        .map_err(|err| AppError::import("import.scan", err))?;
    let (run, prompt) = match scan.wait().await {
        ScanOutcome::Found { run, prompt } => (run, prompt),
        ScanOutcome::NotFound { run_id } => {
            info!(run_id = %run_id, "no vcard files found");
            return Ok(None);
        }
        ScanOutcome::Cancelled { run_id } => return Err(AppError::Cancelled { run_id }),
        ScanOutcome::Failed { error, .. } => return Err(AppError::import("import.scan", error)),
    };

    let selection = choose_selection(prompt, run.candidates());
    let account = match resolve_account(None, accounts.as_ref()) {
        AccountChoice::Use(account) => account,
        AccountChoice::Choose(choices) => {
            warn!(accounts = choices.len(), "several writable accounts; using the first");
            choices.into_iter().next()
        }
    };

    let handle = service
        .import_selected(run, &selection, account)
        .map_err(|err| AppError::import("import.select", err))?;
    match handle.wait().await {
        ImportOutcome::Dispatched(dispatch) => Ok(Some(dispatch)),
        ImportOutcome::Cancelled { run_id } => Err(AppError::Cancelled { run_id }),
        ImportOutcome::Failed { error, .. } => Err(AppError::import("import.run", error)),
    }
}

/// Selection made without a user: everything when a type choice is offered,
/// the most recently modified file when only a single pick is allowed.
fn choose_selection(prompt: SelectionPrompt, candidates: &[CandidateFile]) -> Selection {
    match prompt {
        SelectionPrompt::ImportAll | SelectionPrompt::ChooseImportType => Selection::All,
        SelectionPrompt::ChooseOne => candidates
            .iter()
            .enumerate()
            .max_by_key(|(_, candidate)| candidate.last_modified_ms)
            .map_or(Selection::All, |(index, _)| Selection::One(index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use rolodex_config::ImportPolicy;
    use rolodex_import::Account;
    use rolodex_test_support::fixtures::{scratch_dir, vcard_v21, vcard_v30, write_tree};
    use std::path::Path;

    fn config(storage: &Path, cache: &Path) -> RolodexConfig {
        RolodexConfig {
            import: ImportPolicy {
                storage_root: storage.to_path_buf(),
                cache_dir: cache.to_path_buf(),
                ..ImportPolicy::default()
            },
            ..RolodexConfig::default()
        }
    }

    fn candidate(name: &str, last_modified_ms: i64) -> CandidateFile {
        CandidateFile {
            display_name: name.to_string(),
            canonical_path: format!("/sdcard/{name}").into(),
            last_modified_ms,
        }
    }

    #[test]
    fn single_pick_prefers_newest_file() {
        let candidates = [candidate("old.vcf", 10), candidate("new.vcf", 30), candidate("mid.vcf", 20)];
        assert_eq!(
            choose_selection(SelectionPrompt::ChooseOne, &candidates),
            Selection::One(1)
        );
        assert_eq!(
            choose_selection(SelectionPrompt::ChooseImportType, &candidates),
            Selection::All
        );
    }

    #[tokio::test]
    async fn imports_everything_into_single_account() -> Result<()> {
        let storage = scratch_dir("app-storage")?;
        let cache = scratch_dir("app-cache")?;
        write_tree(
            storage.path(),
            &[("a.vcf", &vcard_v21("A")), ("b.vcf", &vcard_v30("B"))],
        )?;
        let accounts = StaticAccountRegistry::new(vec![Account::new("me@example.com", "com.example")]);
        let dependencies = BootstrapDependencies::new(config(storage.path(), cache.path()), Arc::new(accounts))?;

        let Some(dispatch) = run_app_with(dependencies).await? else {
            bail!("expected a dispatch");
        };
        assert_eq!(dispatch.len(), 2);
        assert_eq!(dispatch.use_v30, vec![false, true]);
        assert_eq!(dispatch.account_type.as_deref(), Some("com.example"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_storage_yields_no_dispatch() -> Result<()> {
        let storage = scratch_dir("app-empty")?;
        let cache = scratch_dir("app-empty-cache")?;
        let dependencies = BootstrapDependencies::new(
            config(storage.path(), cache.path()),
            Arc::new(StaticAccountRegistry::default()),
        )?;
        assert!(run_app_with(dependencies).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn missing_storage_is_an_import_error() -> Result<()> {
        let storage = scratch_dir("app-missing")?;
        let cache = scratch_dir("app-missing-cache")?;
        let dependencies = BootstrapDependencies::new(
            config(&storage.path().join("unmounted"), cache.path()),
            Arc::new(StaticAccountRegistry::default()),
        )?;
        let err = run_app_with(dependencies).await.err();
        assert!(matches!(err, Some(AppError::Import { operation: "import.scan", .. })));
        Ok(())
    }
}
