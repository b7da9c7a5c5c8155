//! Download control: user requests, deferral, cancel, introspection.

use crate::db::DeferredEntry;
use crate::error::{Error, Result};
use crate::prober;
use crate::types::{Destination, Event, FetchMode, Launch, RequestOutcome, Verdict};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;

use super::Downloader;

impl Downloader {
    /// Probe `url` and start, defer or reject it
    ///
    /// - available now: launched immediately in standard mode
    /// - upcoming: deferred until the announced start in live-capture mode
    /// - probe error: nothing is stored, the message is returned
    ///
    /// The destination is registered in the first two cases.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use stream_dl::*;
    /// # async fn example(downloader: Downloader) -> Result<()> {
    /// match downloader
    ///     .request_download("https://www.youtube.com/watch?v=abc", Destination::new(1, 10))
    ///     .await?
    /// {
    ///     RequestOutcome::Started(_) => println!("downloading"),
    ///     RequestOutcome::Scheduled(at) => println!("scheduled for {at}"),
    ///     RequestOutcome::Unavailable(reason) => println!("cannot download: {reason}"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request_download(
        &self,
        url: &str,
        destination: Destination,
    ) -> Result<RequestOutcome> {
        if !self.tasks.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        match prober::probe(self.engine.clone(), url).await {
            Verdict::Now => {
                let launch = self
                    .launch(url, Some(destination), true, FetchMode::Standard)
                    .await?;
                Ok(RequestOutcome::Started(launch))
            }
            Verdict::Future(at) => {
                self.schedule_at(url, at, Some(destination), FetchMode::LiveCapture)
                    .await?;
                Ok(RequestOutcome::Scheduled(at))
            }
            Verdict::Error(reason) => {
                tracing::info!(url = %url, reason = %reason, "Download request rejected");
                Ok(RequestOutcome::Unavailable(reason))
            }
        }
    }

    /// Defer a download of `url` until `at`
    ///
    /// Replaces any existing entry for the URL, re-arming it if it had been
    /// cancelled. The scheduler loop launches it once it falls inside the
    /// grace window.
    pub async fn schedule_at(
        &self,
        url: &str,
        at: DateTime<Utc>,
        destination: Option<Destination>,
        mode: FetchMode,
    ) -> Result<()> {
        tracing::info!(url = %url, due_at = %at, mode = mode.as_str(), "Deferring download");

        self.db.upsert_deferred(url, at.timestamp(), mode).await?;
        if let Some(destination) = destination {
            self.db.add_completion(destination, url).await?;
        }

        self.emit_event(Event::Deferred {
            url: url.to_string(),
            due_at: at,
        });
        Ok(())
    }

    /// Cancel a running or deferred download
    ///
    /// A running task gets its cancellation flag set; it stops at the fetch
    /// engine's next progress checkpoint and is reconciled as cancelled. A
    /// valid deferred entry is marked invalid rather than deleted, so a late
    /// feed event cannot re-arm it.
    ///
    /// Returns false if `url` is neither running nor validly deferred.
    pub async fn cancel(&self, url: &str) -> Result<bool> {
        {
            let running = self.tasks.running.lock().await;
            if let Some(task) = running.get(url) {
                if !task.done.is_cancelled() {
                    tracing::info!(url = %url, "Signaling cancellation");
                    task.cancel.cancel();
                    return Ok(true);
                }
            }
        }

        let invalidated = self.db.invalidate_deferred(url).await?;
        if invalidated {
            tracing::info!(url = %url, "Deferred download cancelled");
        }
        Ok(invalidated)
    }

    /// Snapshot of the URLs the task manager is tracking
    ///
    /// Includes tasks that finished but have not been reconciled yet.
    pub async fn running_urls(&self) -> BTreeSet<String> {
        let running = self.tasks.running.lock().await;
        running.keys().cloned().collect()
    }

    /// Valid deferred downloads, soonest first
    pub async fn scheduled_downloads(&self) -> Result<Vec<DeferredEntry>> {
        self.db.get_scheduled_downloads().await
    }

    /// Launch every valid deferred entry due before `horizon`
    ///
    /// Entries leave the store in the same transaction that selects them, so
    /// a URL is never dispatched twice. Store errors propagate.
    pub(crate) async fn dispatch_due(&self, horizon: DateTime<Utc>) -> Result<usize> {
        let due = self.db.take_due_deferred(horizon.timestamp()).await?;
        if due.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = due.len(), "Dispatching due downloads");
        let mut launched = 0;
        for entry in due {
            self.emit_event(Event::DeferredDispatched {
                url: entry.url.clone(),
            });
            match self.launch(&entry.url, None, true, entry.mode).await {
                Ok(Launch::Started) => launched += 1,
                Ok(Launch::AlreadyRunning) => {
                    tracing::debug!(url = %entry.url, "Due download already running")
                }
                Err(Error::ShuttingDown) => {
                    // Put it back so the next run picks it up
                    tracing::info!(url = %entry.url, "Shutdown in progress, returning entry to the store");
                    self.db
                        .insert_deferred_if_absent(&entry.url, entry.due_at.timestamp(), entry.mode)
                        .await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(launched)
    }
}
