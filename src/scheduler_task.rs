//! Scheduler loop for deferred downloads
//!
//! This module provides the background task that drains due deferred entries
//! into the task manager, reconciles running downloads, and sweeps stale
//! entries.
//!
//! # Features
//!
//! - Fixed-interval ticks (missed ticks are delayed, not bunched)
//! - Grace window so entries due between two ticks are not started late
//! - Bounded reconcile so a long download never stalls the loop
//! - Graceful shutdown handling
//!
//! # Example
//!
//! ```no_run
//! use stream_dl::{Config, Downloader};
//! use stream_dl::scheduler_task::SchedulerTask;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Arc::new(Downloader::new(Config::default()).await?);
//! let task = SchedulerTask::new(downloader.clone());
//!
//! // Run scheduler task (returns on shutdown or a store failure)
//! tokio::spawn(async move {
//!     task.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::Downloader;
use crate::error::Result;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Scheduler task that periodically dispatches due deferred downloads
pub struct SchedulerTask {
    /// Reference to downloader for dispatching, reconciling and shutdown status
    downloader: Arc<Downloader>,
}

impl SchedulerTask {
    /// Creates a new scheduler task
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self { downloader }
    }

    /// Starts the scheduler task
    ///
    /// Runs one [`tick`](Self::tick) per poll interval until shutdown. A store
    /// failure ends the loop: the deferred queue can no longer be trusted.
    pub async fn run(self) {
        let poll_interval = self.downloader.config.scheduler.poll_interval;
        info!(?poll_interval, "Scheduler task started");

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.downloader.shutdown_token.cancelled() => {
                    info!("Scheduler task shutting down");
                    break;
                }
                _ = interval.tick() => {}
            }

            if let Err(e) = self.tick(Utc::now()).await {
                error!(error = %e, "Store failure in scheduler loop, stopping");
                break;
            }
        }
    }

    /// Run a single scheduler pass as of `now`
    ///
    /// 1. Take valid entries due before `now + grace_window` out of the store
    /// 2. Launch each with its stored mode, notifying destinations on completion
    /// 3. Reconcile running downloads, waiting at most one poll interval
    /// 4. Delete entries overdue by more than `stale_after`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        let scheduler = &self.downloader.config.scheduler;

        let horizon = offset(now, scheduler.grace_window, true);
        let launched = self.downloader.dispatch_due(horizon).await?;
        if launched > 0 {
            debug!(launched, "Launched due downloads");
        }

        let summary = self.downloader.reconcile(scheduler.poll_interval).await;
        if !summary.finished.is_empty() || summary.still_running > 0 {
            debug!(
                finished = summary.finished.len(),
                still_running = summary.still_running,
                "Reconciled running downloads"
            );
        }

        // Shutdown closes the store; skip the sweep rather than fail on it
        if self.downloader.is_shutting_down() {
            return Ok(());
        }

        let cutoff = offset(now, scheduler.stale_after, false);
        let swept = self.downloader.db.delete_stale_deferred(cutoff.timestamp()).await?;
        if swept > 0 {
            info!(swept, "Removed stale deferred downloads");
        }

        Ok(())
    }
}

/// `now` shifted forward or back by `by`, saturating at the representable range
fn offset(now: DateTime<Utc>, by: Duration, forward: bool) -> DateTime<Utc> {
    let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
    let shifted = if forward {
        now.checked_add_signed(delta)
    } else {
        now.checked_sub_signed(delta)
    };
    shifted.unwrap_or(if forward {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}
