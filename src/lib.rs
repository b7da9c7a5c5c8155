//! # stream-dl
//!
//! Deferred-download scheduler and concurrent task manager for streamed media.
//!
//! ## Design Philosophy
//!
//! stream-dl is designed to be:
//! - **Restart-safe** - Deferred downloads and pending notifications live in SQLite
//! - **Bounded** - A fixed number of fetches run at once, the rest wait for a slot
//! - **Library-first** - The chat or command layer calls into [`Downloader`]
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use stream_dl::{Config, Destination, Downloader, RequestOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = Downloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Scheduler loop and (if configured) the live event feed
//!     downloader.start_services()?;
//!
//!     let outcome = downloader
//!         .request_download("https://www.youtube.com/watch?v=abc", Destination::new(1, 10))
//!         .await?;
//!     if let RequestOutcome::Scheduled(at) = outcome {
//!         println!("premiere scheduled for {at}");
//!     }
//!
//!     stream_dl::run_with_shutdown(downloader).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Live event feed client
pub mod event_stream;
/// Fetch engine abstraction and yt-dlp implementation
pub mod fetch;
/// Completion notifications
pub mod notifier;
/// Availability probing
pub mod prober;
/// Deferred download scheduler loop
pub mod scheduler_task;
/// Channel subscription registry
pub mod subscriptions;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, EventFeedConfig};
pub use db::{Database, DeferredEntry, Subscription};
pub use downloader::Downloader;
pub use error::{DatabaseError, Error, FetchError, Result};
pub use event_stream::{EventStreamClient, FeedEvent, RoomState};
pub use fetch::{CliFetchEngine, FetchEngine, NoOpFetchEngine};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use subscriptions::SubscriptionRegistry;
pub use types::{
    Destination, Event, FetchMode, Launch, MediaInfo, ReconcileSummary, RequestOutcome, RoomKind,
    TaskOutcome, Verdict,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which cancels running downloads and waits (bounded) for them to wind down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use stream_dl::{Config, Downloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Downloader::new(Config::default()).await?;
///     downloader.start_services()?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: Downloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
