//! Copying single-read sources into pipeline-local cache files.
//!
//! # Design
//! - Cache files carry a private prefix so leftovers from crashed runs can be
//!   swept before a new run starts.
//! - Files created by a run are owned by a [`CacheSession`]; dropping an
//!   uncommitted session deletes them, committing hands them to the consumer.
//! - Clones of a copier share one claim set. A path is claimed before its file
//!   is created and released on commit or drop; the sweep never touches a
//!   claimed path, so overlapping runs keep each other's files.
//! - The copy buffer is reserved fallibly so allocation failure surfaces as an
//!   IO-class error.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rolodex_config::ImportPolicy;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::cancel::CancellationFlag;
use crate::error::{ImportError, ImportResult};
use crate::model::{CachedEntry, SourceLocator};
use crate::source::SourceOpener;

const CACHE_FILE_SUFFIX: &str = ".vcf";

type ClaimSet = Arc<Mutex<HashSet<PathBuf>>>;

fn lock_claims(claims: &ClaimSet) -> MutexGuard<'_, HashSet<PathBuf>> {
    match claims.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("cache claim mutex poisoned; continuing with recovered guard");
            poisoned.into_inner()
        }
    }
}

/// Copies sources into the cache directory.
#[derive(Debug, Clone)]
pub struct CacheCopier {
    cache_dir: PathBuf,
    prefix: String,
    chunk_bytes: usize,
    claims: ClaimSet,
}

impl CacheCopier {
    /// Copier writing `<prefix><uuid>.vcf` files into `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, prefix: impl Into<String>, chunk_bytes: usize) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            prefix: prefix.into(),
            chunk_bytes: chunk_bytes.max(1),
            claims: Arc::default(),
        }
    }

    /// Copier configured from the import policy.
    #[must_use]
    pub fn from_policy(policy: &ImportPolicy) -> Self {
        Self::new(
            &policy.cache_dir,
            policy.cache_prefix.as_str(),
            policy.copy_chunk_bytes,
        )
    }

    /// Cache directory the copier writes to.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Delete every unclaimed file in the cache directory that carries the
    /// private prefix.
    ///
    /// Files still owned by an open [`CacheSession`] of this copier (or a
    /// clone) are skipped. A missing cache directory counts as clean. Running
    /// it twice in a row is the same as running it once.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the directory cannot be listed or a file
    /// cannot be removed.
    pub fn sweep_stale(&self) -> ImportResult<usize> {
        let listing = match fs::read_dir(&self.cache_dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(ImportError::io("sweep_cache.list", &self.cache_dir, source)),
        };
        let mut removed = 0;
        for entry in listing {
            let entry =
                entry.map_err(|source| ImportError::io("sweep_cache.entry", &self.cache_dir, source))?;
            if !entry.file_name().to_string_lossy().starts_with(&self.prefix) {
                continue;
            }
            let path = entry.path();
            if lock_claims(&self.claims).contains(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(ImportError::io("sweep_cache.remove", path, source)),
            }
        }
        debug!(dir = %self.cache_dir.display(), removed, "stale cache files swept");
        Ok(removed)
    }

    /// Open a session that owns the files created for `run_id`.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the cache directory cannot be created.
    pub fn begin(&self, run_id: Uuid) -> ImportResult<CacheSession> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|source| ImportError::io("copy_sources.create_dir", &self.cache_dir, source))?;
        Ok(CacheSession {
            run_id,
            files: Vec::new(),
            claims: Arc::clone(&self.claims),
            committed: false,
        })
    }

    /// Copy every source in order, opening each exactly once.
    ///
    /// `on_copied` receives the source index and byte count after each file.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cancelled`] at the first chunk boundary after
    /// cancellation, and an IO-class error when a source, the destination, or
    /// the copy buffer fails.
    pub fn copy_all<F>(
        &self,
        session: &mut CacheSession,
        opener: &dyn SourceOpener,
        locators: &[SourceLocator],
        cancel: &CancellationFlag,
        mut on_copied: F,
    ) -> ImportResult<Vec<CachedEntry>>
    where
        F: FnMut(usize, u64),
    {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(self.chunk_bytes)
            .map_err(|source| ImportError::BufferAllocation {
                requested: self.chunk_bytes,
                source,
            })?;
        buffer.resize(self.chunk_bytes, 0);

        let mut entries = Vec::with_capacity(locators.len());
        for (index, locator) in locators.iter().enumerate() {
            cancel.check("copy_sources")?;
            let destination = self.destination_path();
            let bytes = {
                let mut source = opener
                    .open(locator)
                    .map_err(|source| ImportError::source_io("copy_sources.open", locator.as_str(), source))?;
                session.track(destination.clone());
                let mut sink = File::create(&destination)
                    .map_err(|source| ImportError::io("copy_sources.create", &destination, source))?;
                copy_chunks(&mut *source, &mut sink, &mut buffer, cancel, locator, &destination)?
            };
            debug!(index, bytes, destination = %destination.display(), "source cached");
            on_copied(index, bytes);
            entries.push(CachedEntry::new(index, destination));
        }
        Ok(entries)
    }

    fn destination_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}{CACHE_FILE_SUFFIX}", self.prefix, Uuid::new_v4()))
    }
}

fn copy_chunks(
    source: &mut dyn Read,
    sink: &mut File,
    buffer: &mut [u8],
    cancel: &CancellationFlag,
    locator: &SourceLocator,
    destination: &Path,
) -> ImportResult<u64> {
    let mut total = 0_u64;
    loop {
        cancel.check("copy_sources")?;
        let read = match source.read(buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(ImportError::source_io(
                    "copy_sources.read",
                    locator.as_str(),
                    err,
                ));
            }
        };
        sink.write_all(&buffer[..read])
            .map_err(|source| ImportError::io("copy_sources.write", destination, source))?;
        total += read as u64;
    }
    sink.sync_data()
        .map_err(|source| ImportError::io("copy_sources.sync", destination, source))?;
    Ok(total)
}

/// Owner of the cache files created by one run.
#[derive(Debug)]
pub struct CacheSession {
    run_id: Uuid,
    files: Vec<PathBuf>,
    claims: ClaimSet,
    committed: bool,
}

impl CacheSession {
    /// Files created so far.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Hand the files over to the consumer; they survive the session.
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.committed = true;
        let files = std::mem::take(&mut self.files);
        self.release(&files);
        files
    }

    fn track(&mut self, path: PathBuf) {
        lock_claims(&self.claims).insert(path.clone());
        self.files.push(path);
    }

    fn release(&self, files: &[PathBuf]) {
        let mut claims = lock_claims(&self.claims);
        for path in files {
            claims.remove(path);
        }
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.files {
            if let Err(err) = fs::remove_file(path)
                && err.kind() != io::ErrorKind::NotFound
            {
                warn!(
                    run_id = %self.run_id,
                    path = %path.display(),
                    error = %err,
                    "failed to remove cache file"
                );
            }
        }
        self.release(&self.files);
        if !self.files.is_empty() {
            debug!(run_id = %self.run_id, files = self.files.len(), "discarded cache files");
        }
    }
}
