//! Cooperative cancellation shared between a worker and its handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ImportError, ImportResult};

/// Shared flag polled by workers at safe points.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with [`ImportError::Cancelled`] once cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cancelled`] tagged with `operation`.
    pub fn check(&self, operation: &'static str) -> ImportResult<()> {
        if self.is_cancelled() {
            return Err(ImportError::Cancelled { operation });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(flag.check("scan").is_ok());
        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(
            flag.check("scan"),
            Err(ImportError::Cancelled { operation: "scan" })
        ));
    }
}
