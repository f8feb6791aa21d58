//! Background sweep of expired rate limit windows

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::store::RateLimitStore;

/// Default period between sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to a running sweep task
///
/// The task runs until [`SweepTask::shutdown`] is awaited or the handle is
/// dropped.
pub struct SweepTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Start sweeping `store` every `period`
    pub fn spawn(store: Arc<dyn RateLimitStore>, period: Duration) -> Self {
        info!(
            "Starting rate limit sweep task (interval: {}s)",
            period.as_secs()
        );

        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);

            // Skip the first tick (which fires immediately)
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        match store.sweep(Utc::now()).await {
                            Ok(0) => {}
                            Ok(removed) => debug!("Swept {} expired rate limit records", removed),
                            Err(e) => warn!("Error during rate limit sweep: {}", e),
                        }
                    }
                }
            }

            debug!("Rate limit sweep task stopped");
        });

        Self { stop, handle }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already exited
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!("Rate limit sweep task ended abnormally: {}", e);
        }
    }
}
