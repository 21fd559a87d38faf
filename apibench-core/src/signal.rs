use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Run-scoped stop flag shared by every simulated user and the discovery
/// loop. Setting it is idempotent; waiters are woken exactly once.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub async fn cancelled(&self) {
        while !self.is_stopped() {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before the re-check so a concurrent `stop` cannot
            // slip between the flag load and the wait.
            notified.as_mut().enable();
            if self.is_stopped() {
                break;
            }
            notified.await;
        }
    }
}
