//! Post-fetch handling: remux and completion notifications.

use crate::fetch::FetchOutput;
use crate::types::{Event, TaskOutcome};
use tokio_util::sync::CancellationToken;

use super::Downloader;

impl Downloader {
    /// Remux a finished live capture
    ///
    /// Failures are logged; they never turn a successful fetch into a failure.
    pub(crate) async fn remux_capture(&self, url: &str, output: &FetchOutput) {
        match self.engine.remux(output).await {
            Ok(()) => tracing::debug!(url = %url, files = output.files.len(), "Remux complete"),
            Err(e) => tracing::warn!(url = %url, error = %e, "Remux failed, keeping original files"),
        }
    }

    /// Consume the completion destinations registered for `url`
    ///
    /// Each destination is messaged at most once and its row is deleted after
    /// the send returns, whether or not delivery succeeded.
    ///
    /// `done` is cancelled under the running-task lock once a re-read finds no
    /// destinations left. A launch that attached a destination to this task
    /// while it was finishing either sees `done` still unset (and the
    /// destination is picked up by the re-read) or sees it set and starts a
    /// new task.
    pub(crate) async fn finish_task(
        &self,
        url: &str,
        notify: bool,
        outcome: &TaskOutcome,
        done: &CancellationToken,
    ) {
        match outcome {
            TaskOutcome::Completed => tracing::info!(url = %url, "Finished download"),
            TaskOutcome::Cancelled => tracing::info!(url = %url, "Download cancelled"),
            TaskOutcome::Failed(error) => tracing::error!(url = %url, error = %error, "Download failed"),
        }

        let message = outcome.message(url);
        loop {
            let consumed = self.consume_destinations(url, notify, &message).await;

            let running = self.tasks.running.lock().await;
            // Rows that could not be deleted would be re-read forever
            if consumed {
                match self.db.get_completions(url).await {
                    Ok(late) if !late.is_empty() => {
                        tracing::debug!(url = %url, count = late.len(), "Destinations attached while finishing");
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(url = %url, error = %e, "Failed to re-check completion destinations");
                    }
                }
            }
            done.cancel();
            drop(running);
            break;
        }

        self.emit_event(Event::TaskFinished {
            url: url.to_string(),
            outcome: outcome.clone(),
        });
    }

    /// Message and delete every destination currently stored for `url`
    ///
    /// Returns false if the rows could not be loaded or one could not be deleted.
    async fn consume_destinations(&self, url: &str, notify: bool, message: &str) -> bool {
        let destinations = match self.db.get_completions(url).await {
            Ok(destinations) => destinations,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to load completion destinations");
                return false;
            }
        };

        let mut consumed = true;

        for destination in destinations {
            if notify {
                if let Err(e) = self
                    .notifier
                    .send_message(destination.guild_id, destination.channel_id, message)
                    .await
                {
                    tracing::warn!(
                        url = %url,
                        guild_id = destination.guild_id,
                        channel_id = destination.channel_id,
                        error = %e,
                        "Completion notification failed"
                    );
                }
            }

            if let Err(e) = self.db.delete_completion(destination, url).await {
                tracing::error!(url = %url, error = %e, "Failed to delete completion destination");
                consumed = false;
            }
        }
        consumed
    }
}
