use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Tracks the background work spawned per event callback so shutdown can
/// wait for it instead of killing it mid-write.
///
/// `drain` is bounded: tasks still running when the timeout fires are
/// aborted and counted, never awaited forever.
#[derive(Default)]
pub struct TaskGroup {
    tasks: Mutex<JoinSet<()>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        tasks.spawn(future);
        // Finished tasks are reaped opportunistically on every spawn so the
        // set does not grow with the lifetime of the process.
        while tasks.try_join_next().is_some() {}
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    /// Waits up to `timeout` for in-flight tasks, then aborts stragglers.
    /// Returns the number of tasks that were abandoned.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let mut tasks = self.tasks.lock().await;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = tasks.len();
            if remaining == 0 {
                debug!("task group drained");
                return 0;
            }
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(result)) => {
                    if let Err(error) = result {
                        if !error.is_cancelled() {
                            warn!(%error, "background task panicked");
                        }
                    }
                }
                Ok(None) => {
                    debug!("task group drained");
                    return 0;
                }
                Err(_) => {
                    warn!(abandoned = remaining, "drain timed out; aborting remaining tasks");
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return remaining;
                }
            }
        }
    }
}
