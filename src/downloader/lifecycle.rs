//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::time::Duration;

use super::Downloader;

/// How long shutdown waits for cancelled tasks to reach a checkpoint
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Downloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new launches
    /// 2. Stops background services (scheduler loop, event stream client)
    /// 3. Cancels all running tasks (using their cancellation tokens)
    /// 4. Reconciles with a timeout (30 seconds)
    /// 5. Closes database connections
    ///
    /// Tasks that have not reached a cancellation checkpoint by the deadline
    /// are left to finish on their own.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new launches
        self.tasks
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);

        // 2. Stop background services
        self.shutdown_token.cancel();

        // 3. Cancel running tasks
        self.cancel_all().await;

        // 4. Wait for them with a timeout
        let summary = self.reconcile(SHUTDOWN_TIMEOUT).await;
        if summary.still_running == 0 {
            tracing::info!(
                finished = summary.finished.len(),
                "All running downloads stopped"
            );
        } else {
            tracing::warn!(
                still_running = summary.still_running,
                "Timeout waiting for downloads to stop, proceeding with shutdown"
            );
        }

        // 5. Emit shutdown event
        self.emit_event(Event::Shutdown);

        // 6. Close database connections
        self.db.close().await;

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal cancellation to every running task
    pub(crate) async fn cancel_all(&self) {
        let running = self.tasks.running.lock().await;
        tracing::debug!(active_count = running.len(), "Cancelling all running downloads");

        for (url, task) in running.iter() {
            tracing::debug!(url = %url, "Signaling cancellation");
            task.cancel.cancel();
        }
    }

    /// Whether shutdown has started
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
