//! Recursive scan of a storage root for importable files.
//!
//! # Design
//! - Symlinks are followed; a canonical-path visited set keeps each file and
//!   directory to one visit, so link cycles terminate.
//! - Entries are visited sorted by file name, so a static tree always yields
//!   the same order.
//! - Unlistable directories and dangling links are skipped, any other IO error
//!   aborts the scan.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancellationFlag;
use crate::error::{ImportError, ImportResult};
use crate::model::CandidateFile;

/// Result of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// At least one candidate, in traversal order.
    Found(Vec<CandidateFile>),
    /// The scan completed without a match.
    NotFound,
}

/// Scanner matching file names against a case-insensitive suffix.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    suffix: String,
}

impl FileDiscovery {
    /// Scanner for names ending in `suffix` (compared case-insensitively).
    #[must_use]
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_lowercase(),
        }
    }

    /// Scan `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cancelled`] when `cancel` fires (no partial list
    /// is returned), [`ImportError::StorageUnavailable`] when the root cannot
    /// be listed, and an IO-class error for any other traversal failure.
    pub fn discover(
        &self,
        root: &Path,
        cancel: &CancellationFlag,
    ) -> ImportResult<DiscoveryOutcome> {
        self.walk(root, cancel, |_| {})
    }

    /// Scan with `on_entry` called for every entry that passed the
    /// cancellation check, before it is resolved.
    pub(crate) fn walk<F>(
        &self,
        root: &Path,
        cancel: &CancellationFlag,
        mut on_entry: F,
    ) -> ImportResult<DiscoveryOutcome>
    where
        F: FnMut(&Path),
    {
        check_root(root)?;

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut candidates = Vec::new();
        let mut walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            cancel.check("discovery")?;
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    skip_or_fail(root, err)?;
                    continue;
                }
            };
            on_entry(entry.path());

            let canonical = match fs::canonicalize(entry.path()) {
                Ok(path) => path,
                Err(err) if skippable(&err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping unresolvable entry");
                    continue;
                }
                Err(source) => {
                    return Err(ImportError::io(
                        "discovery.canonicalize",
                        entry.path(),
                        source,
                    ));
                }
            };
            if !visited.insert(canonical.clone()) {
                debug!(path = %canonical.display(), "already visited");
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            if entry.file_type().is_file()
                && self.matches(&entry)
                && let Some(candidate) = candidate(&entry, canonical)?
            {
                candidates.push(candidate);
            }
        }

        debug!(root = %root.display(), found = candidates.len(), "discovery finished");
        if candidates.is_empty() {
            Ok(DiscoveryOutcome::NotFound)
        } else {
            Ok(DiscoveryOutcome::Found(candidates))
        }
    }

    fn matches(&self, entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_string_lossy()
            .to_lowercase()
            .ends_with(&self.suffix)
    }
}

fn check_root(root: &Path) -> ImportResult<()> {
    let metadata = fs::metadata(root).map_err(|source| ImportError::StorageUnavailable {
        path: root.to_path_buf(),
        reason: "missing",
        source: Some(source),
    })?;
    if !metadata.is_dir() {
        return Err(ImportError::StorageUnavailable {
            path: root.to_path_buf(),
            reason: "not_a_directory",
            source: None,
        });
    }
    fs::read_dir(root).map_err(|source| ImportError::StorageUnavailable {
        path: root.to_path_buf(),
        reason: "unreadable",
        source: Some(source),
    })?;
    Ok(())
}

fn skippable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
    )
}

fn skip_or_fail(root: &Path, err: walkdir::Error) -> ImportResult<()> {
    let path = err.path().unwrap_or(root).to_path_buf();
    if let Some(ancestor) = err.loop_ancestor() {
        debug!(path = %path.display(), ancestor = %ancestor.display(), "symlink cycle skipped");
        return Ok(());
    }
    if err.depth() > 0 && err.io_error().is_some_and(skippable) {
        warn!(path = %path.display(), error = %err, "skipping unreadable entry");
        return Ok(());
    }
    Err(ImportError::Walkdir {
        operation: "discovery.walk",
        path,
        source: err,
    })
}

fn candidate(entry: &DirEntry, canonical: PathBuf) -> ImportResult<Option<CandidateFile>> {
    match File::open(entry.path()) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %entry.path().display(), "skipping unreadable file");
            return Ok(None);
        }
        Err(source) => return Err(ImportError::io("discovery.open", entry.path(), source)),
    }
    let metadata = entry
        .metadata()
        .map_err(|source| ImportError::Walkdir {
            operation: "discovery.metadata",
            path: entry.path().to_path_buf(),
            source,
        })?;
    let last_modified_ms = metadata
        .modified()
        .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
        .unwrap_or_default();
    Ok(Some(CandidateFile {
        display_name: entry.file_name().to_string_lossy().into_owned(),
        canonical_path: canonical,
        last_modified_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rolodex_test_support::fixtures::{scratch_dir, vcard_v21, write_tree};

    fn names(outcome: &DiscoveryOutcome) -> Vec<String> {
        match outcome {
            DiscoveryOutcome::Found(found) => {
                found.iter().map(|c| c.display_name.clone()).collect()
            }
            DiscoveryOutcome::NotFound => Vec::new(),
        }
    }

    #[test]
    fn suffix_match_ignores_case_and_depth() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        let card = vcard_v21("A");
        let card = card.as_str();
        write_tree(
            temp.path(),
            &[
                ("a.vcf", card),
                ("deep/er/still/B.VCF", card),
                ("notes.txt", "x"),
                ("deep/c.vcf.bak", "x"),
            ],
        )?;
        let outcome = FileDiscovery::new(".vcf").discover(temp.path(), &CancellationFlag::new())?;
        let mut found = names(&outcome);
        found.sort();
        assert_eq!(found, ["B.VCF", "a.vcf"]);
        Ok(())
    }

    #[test]
    fn order_is_stable_for_a_static_tree() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        write_tree(
            temp.path(),
            &[("z.vcf", ""), ("m/y.vcf", ""), ("a.vcf", "")],
        )?;
        let discovery = FileDiscovery::new(".vcf");
        let first = discovery.discover(temp.path(), &CancellationFlag::new())?;
        let second = discovery.discover(temp.path(), &CancellationFlag::new())?;
        assert_eq!(first, second);
        assert_eq!(names(&first), ["a.vcf", "y.vcf", "z.vcf"]);
        Ok(())
    }

    #[test]
    fn empty_tree_is_not_found() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        write_tree(temp.path(), &[("readme.txt", "x")])?;
        let outcome = FileDiscovery::new(".vcf").discover(temp.path(), &CancellationFlag::new())?;
        assert_eq!(outcome, DiscoveryOutcome::NotFound);
        Ok(())
    }

    #[test]
    fn missing_root_is_storage_unavailable() {
        let err = FileDiscovery::new(".vcf")
            .discover(Path::new("/definitely/not/mounted"), &CancellationFlag::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::StorageUnavailable {
                reason: "missing",
                ..
            }
        ));
    }

    #[test]
    fn file_root_is_storage_unavailable() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        let paths = write_tree(temp.path(), &[("a.vcf", "")])?;
        let err = FileDiscovery::new(".vcf")
            .discover(&paths[0], &CancellationFlag::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::StorageUnavailable {
                reason: "not_a_directory",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn pre_cancelled_scan_returns_nothing() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        write_tree(temp.path(), &[("a.vcf", "")])?;
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = FileDiscovery::new(".vcf")
            .discover(temp.path(), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
        Ok(())
    }

    #[test]
    fn cancelling_mid_walk_discards_collected_candidates() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        write_tree(
            temp.path(),
            &[("a.vcf", ""), ("b.vcf", ""), ("c.vcf", ""), ("d/e.vcf", ""), ("f.vcf", "")],
        )?;
        let cancel = CancellationFlag::new();
        let mut seen = Vec::new();
        let err = FileDiscovery::new(".vcf")
            .walk(temp.path(), &cancel, |path| {
                seen.push(path.to_path_buf());
                if seen.len() == 3 {
                    cancel.cancel();
                }
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(seen.len(), 3);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_directory_is_skipped() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = scratch_dir("discovery-")?;
        write_tree(temp.path(), &[("open/a.vcf", ""), ("locked/b.vcf", ""), ("c.vcf", "")])?;
        let locked = temp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;
        if fs::read_dir(&locked).is_ok() {
            // Privileged users list the directory regardless of mode.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let outcome = FileDiscovery::new(".vcf").discover(temp.path(), &CancellationFlag::new());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        assert_eq!(names(&outcome?), ["c.vcf", "a.vcf"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_listed_once() -> Result<()> {
        let temp = scratch_dir("discovery-")?;
        let paths = write_tree(temp.path(), &[("real/a.vcf", "")])?;
        std::os::unix::fs::symlink(&paths[0], temp.path().join("alias.vcf"))?;
        std::os::unix::fs::symlink(temp.path().join("missing.vcf"), temp.path().join("dangling.vcf"))?;
        let outcome = FileDiscovery::new(".vcf").discover(temp.path(), &CancellationFlag::new())?;
        let DiscoveryOutcome::Found(found) = outcome else {
            panic!("expected candidates");
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_path, paths[0].canonicalize()?);
        Ok(())
    }
}
