//! Shutdown coordination.

use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::RelayService;

/// Upper bound on how long shutdown waits for in-flight jobs
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl RelayService {
    /// Gracefully shut down the service
    ///
    /// 1. Stops accepting new jobs ([`submit`](Self::submit) returns `ShuttingDown`)
    /// 2. Waits up to 30 seconds for in-flight jobs to finish
    /// 3. Emits [`Event::Shutdown`]
    ///
    /// Jobs still running after the timeout are not cancelled; they keep their
    /// slot until the runtime stops.
    pub async fn shutdown(&self) {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT).await;
    }

    pub(crate) async fn shutdown_with_timeout(&self, timeout: Duration) {
        tracing::info!("Initiating graceful shutdown");

        self.state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        match tokio::time::timeout(timeout, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All in-flight jobs completed"),
            Err(_) => tracing::warn!(
                active_jobs = self.active_jobs(),
                "Timeout waiting for jobs to complete, proceeding with shutdown"
            ),
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active = self.active_jobs();
            if active == 0 {
                return;
            }
            tracing::debug!(active_jobs = active, "Waiting for in-flight jobs");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
