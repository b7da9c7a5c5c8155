//! Launching fetches and the body of a running task.

use crate::error::{Error, Result};
use crate::fetch::FetchRequest;
use crate::types::{Destination, Event, FetchMode, Launch, TaskOutcome};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::{Downloader, RunningTask};

impl Downloader {
    /// Launch a fetch for `url`
    ///
    /// The destination, if given, is registered before anything else so the
    /// requester is notified when the fetch finishes. If `url` already has an
    /// unfinished task no second fetch is spawned and
    /// [`Launch::AlreadyRunning`] is returned; the destination is then served
    /// by the existing task.
    ///
    /// With `notify = false` the task still consumes its destinations on
    /// completion but sends no messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once shutdown has started, or a database
    /// error if the destination could not be registered.
    pub async fn launch(
        &self,
        url: &str,
        destination: Option<Destination>,
        notify: bool,
        mode: FetchMode,
    ) -> Result<Launch> {
        if !self.tasks.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        if let Some(destination) = destination {
            self.db.add_completion(destination, url).await?;
        }

        let mut running = self.tasks.running.lock().await;

        if let Some(existing) = running.get(url) {
            if !existing.done.is_cancelled() {
                tracing::debug!(url = %url, mode = existing.mode.as_str(), "Download already running");
                return Ok(Launch::AlreadyRunning);
            }
            // Finished but not yet reconciled; the new task takes its slot
            tracing::debug!(url = %url, "Replacing finished task that was not yet reconciled");
        }

        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let done_guard = done.clone().drop_guard();

        self.emit_event(Event::TaskStarted {
            url: url.to_string(),
            mode,
        });

        let downloader = self.clone();
        let task_url = url.to_string();
        let task_cancel = cancel.clone();
        let task_done = done.clone();
        let handle = tokio::spawn(async move {
            let _done = done_guard;
            downloader
                .run_task(&task_url, mode, notify, task_cancel, &task_done)
                .await
        });

        running.insert(
            url.to_string(),
            RunningTask {
                mode,
                cancel,
                done,
                handle,
            },
        );

        tracing::info!(url = %url, mode = mode.as_str(), notify, "Download launched");
        Ok(Launch::Started)
    }

    /// Body of a spawned task: fetch, optional remux, then completion handling
    async fn run_task(
        &self,
        url: &str,
        mode: FetchMode,
        notify: bool,
        cancel: CancellationToken,
        done: &CancellationToken,
    ) -> TaskOutcome {
        let outcome = self.execute_fetch(url, mode, &cancel).await;
        self.finish_task(url, notify, &outcome, done).await;
        outcome
    }

    /// Wait for a concurrency permit, then run the fetch engine
    async fn execute_fetch(
        &self,
        url: &str,
        mode: FetchMode,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(url = %url, "Cancelled while waiting for a download slot");
                return TaskOutcome::Cancelled;
            }
            permit = self.tasks.concurrent_limit.clone().acquire_owned() => permit,
        };
        let Ok(_permit) = permit else {
            return TaskOutcome::Failed("download slots are closed".into());
        };

        let request = FetchRequest {
            mode,
            output_dir: self.config.download.output_dir.clone(),
            extra_args: self.config.download.extra_args.clone(),
            live_wait_for_video: self.config.download.live_wait_for_video,
        };

        tracing::info!(url = %url, engine = self.engine.name(), "Initiating download");

        match self.engine.fetch(url, &request, cancel.clone()).await {
            Ok(output) => {
                if mode == FetchMode::LiveCapture {
                    self.remux_capture(url, &output).await;
                }
                TaskOutcome::Completed
            }
            Err(e) if e.is_cancelled() => TaskOutcome::Cancelled,
            Err(e) => TaskOutcome::Failed(e.to_string()),
        }
    }
}
