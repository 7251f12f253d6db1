use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;

/// Operator interrupt shared by the Ctrl-C listener and the sweep.
///
/// An interrupt that lands in a cooldown ends that cooldown and the sweep carries on.
/// Any other interrupt aborts the sweep: the current run is dropped unfinished and no
/// further run starts.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    abort: CancellationToken,
    cooldown: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.end_cooldown() {
            tracing::warn!("operator abort");
            self.abort.cancel();
        }
    }

    /// Ends the cooldown in progress, if any. Never aborts.
    pub fn end_cooldown(&self) -> bool {
        match self.slot().take() {
            Some(cooldown) => {
                cooldown.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    pub(crate) async fn aborted(&self) {
        self.abort.cancelled().await;
    }

    /// Sleeps for `period`. Returns `true` if an interrupt cut it short.
    pub(crate) async fn cooldown(&self, period: Duration) -> bool {
        if self.is_aborted() {
            return true;
        }
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        let cut = token.sleep(period).await;
        *self.slot() = None;
        cut
    }

    /// Forwards every Ctrl-C to [`Interrupt::trigger`] until the listener is dropped.
    pub fn listen_for_ctrl_c(&self) -> CtrlCListener {
        let interrupt = self.clone();
        let task = tokio::spawn(async move {
            loop {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %err, "cannot listen for Ctrl-C");
                    return;
                }
                interrupt.trigger();
            }
        });
        CtrlCListener { task }
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cooldown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct CtrlCListener {
    task: JoinHandle<()>,
}

impl Drop for CtrlCListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn trigger_outside_cooldown_aborts() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.end_cooldown());
        assert!(!interrupt.is_aborted());

        interrupt.clone().trigger();
        assert!(interrupt.is_aborted());
    }

    #[tokio::test]
    async fn trigger_during_cooldown_only_ends_it() {
        let interrupt = Interrupt::new();
        let operator = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            operator.trigger();
        });

        let started = Instant::now();
        assert!(interrupt.cooldown(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!interrupt.is_aborted());
    }

    #[tokio::test]
    async fn finished_cooldown_leaves_no_slot_behind() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.cooldown(Duration::from_millis(5)).await);
        assert!(!interrupt.end_cooldown());
    }

    #[tokio::test]
    async fn aborted_interrupt_skips_cooldown() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        assert!(interrupt.cooldown(Duration::from_secs(30)).await);
        interrupt.aborted().await;
    }
}
