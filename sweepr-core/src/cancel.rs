use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// One-way stop signal shared between a run and its background loops.
///
/// Loops check it at iteration boundaries; `sleep` wakes early once cancelled so a
/// loop never waits out a full interval after the run is over.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleeps for `interval` or until cancelled. Returns `true` if cancelled.
    pub async fn sleep(&self, interval: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag so a concurrent `cancel` cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return true;
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => self.is_cancelled(),
            () = notified => true,
        }
    }
}
