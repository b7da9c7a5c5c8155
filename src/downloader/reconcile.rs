//! Bounded wait over running tasks.

use crate::types::{ReconcileSummary, TaskOutcome};
use std::time::Duration;

use super::{Downloader, RunningTask};

impl Downloader {
    /// Wait up to `timeout` for every running task, then drop the finished ones
    ///
    /// Tasks still running at the deadline are neither cancelled nor
    /// forgotten: they stay tracked and are waited on again by the next call.
    /// The running-task lock is only held to snapshot and to remove entries,
    /// never across the wait.
    pub async fn reconcile(&self, timeout: Duration) -> ReconcileSummary {
        let waiters: Vec<_> = {
            let running = self.tasks.running.lock().await;
            running.values().map(|task| task.done.clone()).collect()
        };

        if !waiters.is_empty() {
            tracing::debug!(count = waiters.len(), ?timeout, "Waiting for running downloads");
            let all_done = futures::future::join_all(waiters.iter().map(|done| done.cancelled()));
            if tokio::time::timeout(timeout, all_done).await.is_err() {
                tracing::debug!("Reconcile deadline reached, unfinished downloads stay tracked");
            }
        }

        let (finished, still_running): (Vec<(String, RunningTask)>, usize) = {
            let mut running = self.tasks.running.lock().await;
            let urls: Vec<String> = running
                .iter()
                .filter(|(_, task)| task.done.is_cancelled())
                .map(|(url, _)| url.clone())
                .collect();
            let finished = urls
                .into_iter()
                .filter_map(|url| running.remove(&url).map(|task| (url, task)))
                .collect();
            (finished, running.len())
        };

        let mut summary = ReconcileSummary {
            finished: Vec::with_capacity(finished.len()),
            still_running,
        };

        for (url, task) in finished {
            let outcome = match task.handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Completion handling never ran; drop the destinations it would have consumed
                    tracing::error!(url = %url, error = %e, "Download task panicked");
                    if let Err(e) = self.db.delete_completions(&url).await {
                        tracing::error!(url = %url, error = %e, "Failed to delete completion destinations");
                    }
                    TaskOutcome::Failed(format!("download task panicked: {e}"))
                }
            };
            tracing::debug!(url = %url, ?outcome, "Reconciled download");
            summary.finished.push((url, outcome));
        }

        summary
    }
}
