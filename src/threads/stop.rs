//! Cooperative stop signalling for kernel threads.
//!
//! Thread bodies receive a [`StopToken`] and either poll it or sleep on it.
//! Sleeping wakes up as soon as a stop is requested instead of burning CPU
//! in a poll loop.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::Interrupted;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Shared cancellation flag with blocking waits.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    inner: Arc<Inner>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        // A poisoned flag still holds a meaningful bool.
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request a stop and wake every sleeper.
    pub fn cancel(&self) {
        *self.flag() = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Return `Err(Interrupted)` if a stop was requested.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with `Interrupted` on stop.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.flag();
        loop {
            if *cancelled {
                return Err(Interrupted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cancelled = guard;
        }
    }

    /// Block until a stop is requested.
    pub fn wait_cancelled(&self) {
        let mut cancelled = self.flag();
        while !*cancelled {
            cancelled = self
                .inner
                .cond
                .wait(cancelled)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }
}
