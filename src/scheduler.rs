use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Trailing-edge debounce over spawned work.
///
/// Each `schedule` aborts whatever is still pending, so a burst of triggers
/// collapses into the last one, which runs after the full delay. This is the
/// cancellable-timer seam the redirect engine leans on for race avoidance;
/// test code drives it with tokio's paused clock instead of real timers.
pub struct Debounce {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `work` to run after the delay, cancelling any pending run.
    pub async fn schedule(&self, work: BoxFuture<'static, ()>) {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop whatever is pending without running it.
    pub async fn cancel(&self) {
        if let Some(handle) = self.pending.lock().await.take() {
            handle.abort();
        }
    }
}
