use std::{future::Future, time::Duration};

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

/// Supervised home for per-interaction background work.
///
/// Tasks outlive the HTTP request that started them. On shutdown, in-flight
/// follow-ups get a grace period before the rest are cancelled.
#[derive(Clone, Default)]
pub struct TaskSupervisor {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` as a tracked task. It is dropped at its next suspension point
    /// if the supervisor is cancelled.
    pub fn spawn<F>(&self, name: &str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let name = name.to_string();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(task = %name, "task cancelled before completion");
                }
                _ = fut => {
                    debug!(task = %name, "task finished");
                }
            }
        });
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for in-flight tasks, cancelling whatever is left after `grace`.
    ///
    /// Returns `true` if every task finished on its own.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, grace_secs = grace.as_secs(), "draining interaction tasks");
        }

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return true;
        }

        warn!(
            remaining = self.tracker.len(),
            "grace period elapsed; cancelling interaction tasks"
        );
        self.cancel.cancel();
        self.tracker.wait().await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drain_waits_for_running_tasks() {
        let sup = TaskSupervisor::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            sup.spawn("work", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(sup.in_flight(), 3);

        assert!(sup.drain(Duration::from_secs(5)).await);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(sup.in_flight(), 0);
        assert!(!sup.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_cancels_after_grace() {
        let sup = TaskSupervisor::new();
        let done = Arc::new(AtomicUsize::new(0));

        let d = done.clone();
        sup.spawn("stuck", async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            d.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!sup.drain(Duration::from_secs(1)).await);
        assert!(sup.is_cancelled());
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert_eq!(sup.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_with_nothing_running_is_immediate() {
        let sup = TaskSupervisor::new();
        assert!(sup.drain(Duration::from_millis(1)).await);
    }
}
