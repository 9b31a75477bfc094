//! Periodic eviction of expired tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::store::TaskStore;

/// Background loop that calls [`TaskStore::cleanup_expired_tasks`] every
/// cleanup interval.
///
/// A sweep that panics is logged and the loop keeps going. The loop exits
/// as soon as its shutdown token fires, including in the middle of a sleep.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use docmcp_tasks::{TaskCleanupService, TaskConfig, TaskStore};
/// # use tokio_util::sync::CancellationToken;
/// # async fn demo() {
/// let config = TaskConfig::default();
/// let store = Arc::new(TaskStore::new(config.clone()));
/// let shutdown = CancellationToken::new();
///
/// let handle = TaskCleanupService::new(store, config.cleanup_interval()).spawn(shutdown.clone());
/// // ...
/// shutdown.cancel();
/// handle.await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TaskCleanupService {
    store: Arc<TaskStore>,
    interval: Duration,
}

impl TaskCleanupService {
    /// Creates a service sweeping `store` every `interval`.
    pub fn new(store: Arc<TaskStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Starts the loop on the tokio runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Runs the loop until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval = ?self.interval, "task cleanup service started");
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            let store = Arc::clone(&self.store);
            match tokio::task::spawn_blocking(move || store.cleanup_expired_tasks()).await {
                Ok(removed) => debug!(removed, "cleanup sweep finished"),
                Err(err) => error!(error = %err, "cleanup sweep failed"),
            }
        }
        info!("task cleanup service stopped");
    }
}
