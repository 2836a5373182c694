//! Keep-awake hook held while discovery or copying runs.

use tracing::debug;

/// Host facility that keeps the device from suspending.
pub trait KeepAwake: Send + Sync {
    /// Take one hold.
    fn acquire(&self, reason: &'static str);
    /// Release one hold taken by [`KeepAwake::acquire`].
    fn release(&self, reason: &'static str);
}

/// Implementation for hosts without a suspend facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn acquire(&self, reason: &'static str) {
        debug!(reason, "keep-awake acquired");
    }

    fn release(&self, reason: &'static str) {
        debug!(reason, "keep-awake released");
    }
}

/// Hold released on drop, so every exit path (including unwinding) balances.
pub struct KeepAwakeGuard<'a> {
    provider: &'a dyn KeepAwake,
    reason: &'static str,
}

impl<'a> KeepAwakeGuard<'a> {
    /// Acquire a hold on `provider`.
    #[must_use]
    pub fn acquire(provider: &'a dyn KeepAwake, reason: &'static str) -> Self {
        provider.acquire(reason);
        Self { provider, reason }
    }
}

impl Drop for KeepAwakeGuard<'_> {
    fn drop(&mut self) {
        self.provider.release(self.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Default)]
    struct Balance(AtomicI32);

    impl KeepAwake for Balance {
        fn acquire(&self, _reason: &'static str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self, _reason: &'static str) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_releases_on_drop_and_unwind() {
        let balance = Balance::default();
        {
            let _guard = KeepAwakeGuard::acquire(&balance, "test");
            assert_eq!(balance.0.load(Ordering::SeqCst), 1);
        }
        assert_eq!(balance.0.load(Ordering::SeqCst), 0);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = KeepAwakeGuard::acquire(&balance, "panic");
            panic!("worker blew up");
        }));
        assert!(result.is_err());
        assert_eq!(balance.0.load(Ordering::SeqCst), 0);
    }
}
