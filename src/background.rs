use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

/// Fire-and-forget jobs owned by the application.
///
/// `spawn` returns immediately. At most `max_in_flight` jobs run at once,
/// the rest wait for a permit. [`Background::shutdown`] waits until every
/// spawned job has finished.
#[derive(Clone)]
pub struct Background {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl Background {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Runs `job` in the background. Errors and panics are logged, never propagated.
    pub fn spawn<F>(&self, name: &'static str, job: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                error!(job = name, "background pool closed, job dropped");
                return;
            };
            match tokio::spawn(job).await {
                Ok(Ok(())) => debug!(job = name, "background job finished"),
                Ok(Err(e)) => error!(job = name, error = %e, "background job failed"),
                Err(e) if e.is_panic() => error!(job = name, "background job panicked"),
                Err(e) => error!(job = name, error = %e, "background job cancelled"),
            }
        });
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the group and waits for every spawned job to finish. Called once, at shutdown.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(pending = self.in_flight(), "completing background tasks");
        self.tracker.wait().await;
        info!("background tasks completed");
    }
}
