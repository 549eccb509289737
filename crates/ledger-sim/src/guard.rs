//! Reentrancy protection as an entry/exit state machine.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::SimError;

/// A per-instance guard over a protected call region.
///
/// The guard holds one of two states, `NOT_ENTERED` or `ENTERED`, and starts
/// out `NOT_ENTERED`. Exactly one logical thread of protected execution may
/// hold it at a time: concurrent entry attempts race on a compare-exchange
/// and the loser fails immediately with [`SimError::ReentrantCall`] — there
/// is no queuing, blocking or backoff. Nested entry on the same instance is
/// rejected the same way.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    /// Creates a guard in the `NOT_ENTERED` state.
    pub const fn new() -> Self {
        Self { entered: AtomicBool::new(false) }
    }

    /// Transitions `NOT_ENTERED` -> `ENTERED`.
    ///
    /// Fails with [`SimError::ReentrantCall`] if the guard is already
    /// entered. Callers must pair every successful `enter` with an
    /// [`exit`](Self::exit) on every exit path; prefer
    /// [`lock`](Self::lock), which releases on drop.
    pub fn enter(&self) -> Result<(), SimError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| SimError::ReentrantCall)
    }

    /// Unconditionally resets the guard to `NOT_ENTERED`.
    pub fn exit(&self) {
        self.entered.store(false, Ordering::Release);
    }

    /// Reports whether a protected region is currently active. Diagnostic
    /// accessor for composing layers.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    /// Enters the guard and returns a region token that exits on drop.
    ///
    /// This is the scoped-acquisition form of the enter/exit pair: the exit
    /// runs on every path out of the region, including early returns and
    /// unwinding.
    pub fn lock(&self) -> Result<GuardedRegion<'_>, SimError> {
        self.enter()?;
        Ok(GuardedRegion { guard: self })
    }
}

/// An active protected region; exits its guard when dropped.
#[derive(Debug)]
#[must_use = "dropping the region immediately re-opens the guard"]
pub struct GuardedRegion<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardedRegion<'_> {
    fn drop(&mut self) {
        self.guard.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_is_rejected() {
        let guard = ReentrancyGuard::new();
        guard.enter().unwrap();
        assert_eq!(guard.enter(), Err(SimError::ReentrantCall));
        assert!(guard.is_entered());
    }

    #[test]
    fn test_enter_exit_enter_succeeds() {
        let guard = ReentrancyGuard::new();
        guard.enter().unwrap();
        guard.exit();
        guard.enter().unwrap();
        assert!(guard.is_entered());
    }

    #[test]
    fn test_lock_releases_on_drop() {
        let guard = ReentrancyGuard::new();
        {
            let _region = guard.lock().unwrap();
            assert!(guard.is_entered());
            assert_eq!(guard.enter(), Err(SimError::ReentrantCall));
        }
        assert!(!guard.is_entered());
        assert!(guard.lock().is_ok());
    }

    #[test]
    fn test_lock_releases_on_unwind() {
        let guard = ReentrancyGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _region = guard.lock().unwrap();
            panic!("body failed");
        }));
        assert!(result.is_err());
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_concurrent_entry_has_exactly_one_winner() {
        use std::sync::{atomic::AtomicUsize, Arc, Barrier};

        let guard = Arc::new(ReentrancyGuard::new());
        let barrier = Arc::new(Barrier::new(8));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    barrier.wait();
                    if guard.enter().is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(guard.is_entered());
    }
}
