//! Background service starters: scheduler loop and event stream client.

use crate::error::Result;
use crate::event_stream::EventStreamClient;
use crate::scheduler_task::SchedulerTask;

use super::Downloader;

impl Downloader {
    /// Start the scheduler loop that dispatches deferred downloads
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let scheduler_task = SchedulerTask::new(std::sync::Arc::new(self.clone()));

        let handle = tokio::spawn(async move {
            scheduler_task.run().await;
        });

        tracing::info!(
            poll_interval = ?self.config.scheduler.poll_interval,
            "Scheduler task started"
        );

        handle
    }

    /// Start the event feed client
    ///
    /// Returns a finished no-op task when no feed is configured. The client
    /// stops when the downloader shuts down.
    pub fn start_event_client(&self) -> Result<tokio::task::JoinHandle<()>> {
        let Some(feed) = self.config.event_feed.clone() else {
            tracing::info!("No event feed configured, skipping event stream client");
            return Ok(tokio::spawn(async {}));
        };

        let url = feed.stream_url();
        let client = EventStreamClient::new(self.clone(), feed)?;
        let shutdown = self.shutdown_token.clone();

        let handle = tokio::spawn(async move {
            client.listen(shutdown).await;
        });

        tracing::info!(url = %url, "Event stream client started");

        Ok(handle)
    }

    /// Start every configured background service
    pub fn start_services(&self) -> Result<Vec<tokio::task::JoinHandle<()>>> {
        Ok(vec![self.start_scheduler(), self.start_event_client()?])
    }
}
