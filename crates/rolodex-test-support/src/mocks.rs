//! Instrumented readers for exercising single-read sources.

use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared open/close counters for reader handles.
#[derive(Debug, Clone, Default)]
pub struct HandleCounter {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl HandleCounter {
    /// Fresh counter with both tallies at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of handles dropped so far.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether every opened handle was dropped.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.opened() == self.closed()
    }

    /// Wrap `inner` so its lifetime is counted.
    pub fn track<R: Read>(&self, inner: R) -> TrackedReader<R> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        TrackedReader {
            inner,
            counter: self.clone(),
        }
    }
}

/// Reader that bumps [`HandleCounter::closed`] when dropped.
#[derive(Debug)]
pub struct TrackedReader<R> {
    inner: R,
    counter: HandleCounter,
}

impl<R: Read> Read for TrackedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for TrackedReader<R> {
    fn drop(&mut self) {
        self.counter.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reader that yields a prefix and then fails.
#[derive(Debug)]
pub struct FailingReader {
    prefix: Cursor<Vec<u8>>,
}

impl FailingReader {
    /// Yield `prefix` before failing every subsequent read.
    #[must_use]
    pub fn after(prefix: &[u8]) -> Self {
        Self {
            prefix: Cursor::new(prefix.to_vec()),
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf)? {
            0 => Err(io::Error::other("source went away mid-read")),
            read => Ok(read),
        }
    }
}

/// Reader that calls a hook after every successful read.
pub struct InspectReader<R, F> {
    inner: R,
    hook: F,
}

impl<R, F> InspectReader<R, F>
where
    R: Read,
    F: FnMut(usize),
{
    /// Wrap `inner`, passing the size of every read to `hook`.
    pub const fn new(inner: R, hook: F) -> Self {
        Self { inner, hook }
    }
}

impl<R, F> Read for InspectReader<R, F>
where
    R: Read,
    F: FnMut(usize),
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        (self.hook)(read);
        Ok(read)
    }
}
