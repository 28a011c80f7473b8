//! Supervised periodic workers
//!
//! Collectors and the coordinator run on independent background tasks. Each
//! worker ticks at a fixed interval and listens for a shutdown broadcast;
//! `stop()` lets the in-flight step complete and joins with a bounded
//! timeout, logging and proceeding when the join does not finish in time.

use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Bound on how long `stop()` waits for the worker task to exit
const JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Handle to a running periodic worker
pub struct WorkerHandle {
    name: String,
    shutdown: broadcast::Sender<()>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerHandle {
    /// Signal the worker to stop after its current step and wait for it,
    /// bounded by the join timeout. Best-effort: a task that fails to stop
    /// in time is logged and left behind.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(());
        let handle = self.join.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!(worker = %self.name, "worker stopped"),
                Ok(Err(e)) => warn!(worker = %self.name, error = %e, "worker task failed"),
                Err(_) => warn!(
                    worker = %self.name,
                    timeout_secs = JOIN_TIMEOUT.as_secs(),
                    "worker did not stop within join timeout"
                ),
            }
        }
    }

    /// Whether `stop()` has not yet consumed the task handle
    pub async fn is_running(&self) -> bool {
        self.join.lock().await.is_some()
    }
}

/// Spawn a named periodic worker running `body` once per tick
pub fn spawn_periodic<F, Fut>(name: impl Into<String>, period: Duration, mut body: F) -> WorkerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let name = name.into();
    let (shutdown, mut shutdown_rx) = broadcast::channel(1);

    let task_name = name.clone();
    let handle = tokio::spawn(async move {
        info!(worker = %task_name, period_secs = period.as_secs(), "worker started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    body().await;
                }
                _ = shutdown_rx.recv() => {
                    debug!(worker = %task_name, "shutdown received");
                    break;
                }
            }
        }
    });

    WorkerHandle {
        name,
        shutdown,
        join: Mutex::new(Some(handle)),
    }
}
