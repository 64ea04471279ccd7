//! # Background Worker Lifecycle
//!
//! Cooperative start/stop handling shared by every periodic background
//! task in the bridge (delivery queue worker, GPS simulator).
//!
//! Shutdown is cooperative: the worker polls a shared running flag and is
//! given a bounded window to exit on its own. If it does not, the task is
//! aborted. Nothing the workers hold is durable, so a forced abort loses
//! at most the in-flight step.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Handle to a spawned background worker
pub struct WorkerHandle {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker task
    ///
    /// The body receives the shared running flag and must poll it at a
    /// bounded interval so a stop request is observed promptly.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(body(running.clone()));
        debug!("{} worker started", name);

        Self {
            name,
            running,
            handle,
        }
    }

    /// Whether the worker task is still alive
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Clear the running flag without waiting for the worker to exit
    ///
    /// Callers that hold a wake signal (e.g. the queue's notify) should
    /// call this, wake the worker, then [`join`](WorkerHandle::join).
    pub fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait up to `wait` for the worker to exit, aborting it afterwards
    ///
    /// Returns `true` when the worker exited on its own, `false` when it
    /// had to be aborted.
    pub async fn join(mut self, wait: Duration) -> bool {
        match timeout(wait, &mut self.handle).await {
            Ok(Ok(())) => {
                debug!("{} worker stopped", self.name);
                true
            }
            Ok(Err(e)) => {
                warn!("{} worker task failed: {}", self.name, e);
                true
            }
            Err(_) => {
                warn!(
                    "{} worker did not stop within {:?}, aborting",
                    self.name, wait
                );
                self.handle.abort();
                false
            }
        }
    }

    /// Clear the running flag and wait for the worker to exit
    pub async fn shutdown(self, wait: Duration) -> bool {
        self.signal_stop();
        self.join(wait).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_cooperative_worker_stops_gracefully() {
        let worker = WorkerHandle::spawn("test", |running| async move {
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        assert!(worker.is_running());
        let graceful = worker.shutdown(Duration::from_millis(500)).await;
        assert!(graceful, "cooperative worker should exit within the wait");
    }

    #[tokio::test]
    async fn test_stuck_worker_is_aborted() {
        let worker = WorkerHandle::spawn("stuck", |_running| async move {
            // Ignores the running flag entirely
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });

        let start = std::time::Instant::now();
        let graceful = worker.shutdown(Duration::from_millis(100)).await;
        assert!(!graceful, "stuck worker should be reported as aborted");
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "shutdown must be bounded by the wait"
        );
    }

    #[tokio::test]
    async fn test_finished_worker_reports_not_running() {
        let worker = WorkerHandle::spawn("oneshot", |_running| async move {});

        // Give the task a moment to finish
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!worker.is_running());
        assert!(worker.shutdown(Duration::from_millis(100)).await);
    }
}
