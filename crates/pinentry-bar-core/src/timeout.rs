//! Session watchdog.
//!
//! [`TimeoutGuard`] replaces an alarm signal with a timer task on the same
//! runtime as the session loop. On expiry the task sets one atomic flag and
//! wakes the loop; the loop observes the flag at its next checkpoint and
//! moves the session to `TimedOut`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs in the timer task: no allocation, no I/O, no locks.
fn expire(fired: &AtomicBool, wake: &Notify) {
    fired.store(true, Ordering::Release);
    wake.notify_one();
}

/// Optional watchdog that requests session termination after a timeout.
#[derive(Debug)]
pub struct TimeoutGuard {
    fired: Arc<AtomicBool>,
    wake: Arc<Notify>,
    timeout: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl TimeoutGuard {
    /// A guard that never fires.
    pub fn disarmed() -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            timeout: None,
            task: None,
        }
    }

    /// Arm a watchdog firing after `timeout`. A zero timeout disarms.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime (the timer task has to be
    /// spawned somewhere).
    pub fn arm(timeout: Duration) -> Self {
        let mut guard = Self::disarmed();
        if timeout.is_zero() {
            return guard;
        }

        let fired = Arc::clone(&guard.fired);
        let wake = Arc::clone(&guard.wake);
        guard.task = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            expire(&fired, &wake);
        }));
        guard.timeout = Some(timeout);

        debug!(timeout_secs = timeout.as_secs(), "Timeout armed");
        guard
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the watchdog has expired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Resolve once the watchdog has expired; never resolves when disarmed.
    ///
    /// Cancel-safe: the wake-up is stored as a permit if nobody is waiting.
    pub async fn expired(&self) {
        if self.task.is_none() {
            return std::future::pending().await;
        }
        if self.has_fired() {
            return;
        }
        self.wake.notified().await;
    }
}

impl Default for TimeoutGuard {
    fn default() -> Self {
        Self::disarmed()
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
