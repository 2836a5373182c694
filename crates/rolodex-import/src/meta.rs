//! Per-file meta information collection with a 2.1 to 3.0 fallback.
//!
//! # Design
//! - Each probe opens its own reader and drops it before anything else is
//!   opened, so at most one cache file handle is live at a time.
//! - A version mismatch from the primary probe triggers exactly one fallback
//!   probe; mismatches from both mark the file unsupported.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cancel::CancellationFlag;
use crate::error::{ImportError, ImportResult};
use crate::model::CachedEntry;
use crate::vcard::{ProbeOutcome, StructuralProbe, VcardProbe};

/// Totals gathered across one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Files accepted by a probe.
    pub supported: usize,
    /// Files rejected by both probes.
    pub unsupported: usize,
    /// Top-level cards across supported files.
    pub entries: u64,
}

/// Fills in format, charset, source type, and entry count for cached files.
#[derive(Clone)]
pub struct MetaInfoCollector {
    primary: Arc<dyn VcardProbe>,
    fallback: Arc<dyn VcardProbe>,
    abort_on_first_unsupported: bool,
}

impl std::fmt::Debug for MetaInfoCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaInfoCollector")
            .field("primary", &self.primary.version())
            .field("fallback", &self.fallback.version())
            .field("abort_on_first_unsupported", &self.abort_on_first_unsupported)
            .finish()
    }
}

impl MetaInfoCollector {
    /// Collector using the built-in 2.1 probe with a 3.0 fallback.
    #[must_use]
    pub fn new(abort_on_first_unsupported: bool) -> Self {
        Self::with_probes(
            Arc::new(StructuralProbe::v21()),
            Arc::new(StructuralProbe::v30()),
            abort_on_first_unsupported,
        )
    }

    /// Collector with caller-supplied probes.
    #[must_use]
    pub fn with_probes(
        primary: Arc<dyn VcardProbe>,
        fallback: Arc<dyn VcardProbe>,
        abort_on_first_unsupported: bool,
    ) -> Self {
        Self {
            primary,
            fallback,
            abort_on_first_unsupported,
        }
    }

    /// Probe every entry in order and record what was learned.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cancelled`] between files after cancellation,
    /// [`ImportError::Malformed`] on the first structural fault,
    /// [`ImportError::Unsupported`] on the first unrecognised file when
    /// aborting is enabled, [`ImportError::AllUnsupported`] when it is not and
    /// no file was recognised, and an IO error when a cache file cannot be read.
    pub fn collect(
        &self,
        entries: &mut [CachedEntry],
        cancel: &CancellationFlag,
    ) -> ImportResult<CollectionSummary> {
        let mut summary = CollectionSummary::default();
        for entry in entries.iter_mut() {
            cancel.check("collect_meta")?;
            if self.collect_one(entry)? {
                summary.supported += 1;
                summary.entries += entry.entry_count;
            } else {
                summary.unsupported += 1;
            }
        }
        if summary.supported == 0 && summary.unsupported > 0 {
            return Err(ImportError::AllUnsupported {
                files: summary.unsupported,
            });
        }
        Ok(summary)
    }

    fn collect_one(&self, entry: &mut CachedEntry) -> ImportResult<bool> {
        let path = entry.destination_path.clone();
        let mut outcome = probe_file(self.primary.as_ref(), &path)?;
        if let ProbeOutcome::VersionMismatch { found } = &outcome {
            debug!(
                path = %path.display(),
                found = found.as_deref().unwrap_or("none"),
                primary = self.primary.version().as_str(),
                "version mismatch, retrying with fallback probe"
            );
            outcome = probe_file(self.fallback.as_ref(), &path)?;
        }

        match outcome {
            ProbeOutcome::Parsed(meta) => {
                debug!(
                    path = %path.display(),
                    version = meta.version.as_str(),
                    charset = %meta.charset,
                    entries = meta.entry_count,
                    "meta info collected"
                );
                entry.record_meta(meta, false);
                Ok(true)
            }
            ProbeOutcome::Nested(meta) => {
                warn!(
                    path = %path.display(),
                    version = meta.version.as_str(),
                    "nested vcard detected; keeping collected meta info"
                );
                entry.record_meta(meta, true);
                Ok(true)
            }
            ProbeOutcome::VersionMismatch { .. } | ProbeOutcome::Unsupported => {
                entry.mark_unsupported();
                if self.abort_on_first_unsupported {
                    return Err(ImportError::Unsupported { path });
                }
                warn!(path = %path.display(), "unsupported file left out of dispatch");
                Ok(false)
            }
            ProbeOutcome::Malformed { line, reason } => Err(ImportError::Malformed {
                path,
                line,
                reason: reason.as_str(),
            }),
            ProbeOutcome::IoFailure(source) => {
                Err(ImportError::io("collect_meta.read", path, source))
            }
        }
    }
}

fn probe_file(probe: &dyn VcardProbe, path: &Path) -> ImportResult<ProbeOutcome> {
    let file = File::open(path).map_err(|source| ImportError::io("collect_meta.open", path, source))?;
    let mut reader = BufReader::new(file);
    Ok(probe.probe(&mut reader))
}
