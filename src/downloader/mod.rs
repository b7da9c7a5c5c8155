//! Task manager split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by domain:
//! - [`tasks`] - Launching fetches and the per-task body
//! - [`completion`] - Remux and completion notifications
//! - [`control`] - Cancel, deferral and user download requests
//! - [`reconcile`] - Bounded wait over running tasks
//! - [`lifecycle`] - Shutdown coordination
//! - [`services`] - Background service starters (scheduler loop, event stream)

mod completion;
mod control;
mod lifecycle;
mod reconcile;
mod services;
mod tasks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::{CliFetchEngine, FetchEngine, NoOpFetchEngine};
use crate::notifier::{self, Notifier};
use crate::subscriptions::SubscriptionRegistry;
use crate::types::{Event, FetchMode, TaskOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A fetch the task manager is tracking
pub(crate) struct RunningTask {
    /// How the URL is being fetched
    pub(crate) mode: FetchMode,
    /// Cooperative cancellation flag handed to the fetch engine
    pub(crate) cancel: CancellationToken,
    /// Cancelled when the spawned task ends for any reason (including panic)
    pub(crate) done: CancellationToken,
    /// Completion handle yielding the task's outcome
    pub(crate) handle: JoinHandle<TaskOutcome>,
}

/// Running-task bookkeeping
#[derive(Clone)]
pub(crate) struct TaskState {
    /// Tasks keyed by URL; entries stay until `reconcile` observes them finished
    pub(crate) running: Arc<tokio::sync::Mutex<HashMap<String, RunningTask>>>,
    /// Semaphore to limit concurrent fetches (respects max_concurrent_downloads config)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Flag to indicate whether new launches are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<std::sync::atomic::AtomicBool>,
}

impl TaskState {
    pub(crate) fn new(max_concurrent_downloads: usize) -> Self {
        Self {
            running: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(max_concurrent_downloads)),
            accepting_new: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query deferred entries and destinations
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Content fetch engine (trait object for pluggable implementations)
    pub(crate) engine: Arc<dyn FetchEngine>,
    /// Where completion messages are delivered
    pub(crate) notifier: Arc<dyn Notifier>,
    /// Running tasks and concurrency limit
    pub(crate) tasks: TaskState,
    /// Cancelled on shutdown; background services watch it
    pub(crate) shutdown_token: CancellationToken,
}

impl Downloader {
    /// Create a new Downloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Selects the fetch engine from the tools configuration
    /// - Selects the notifier from the notification configuration
    pub async fn new(config: Config) -> Result<Self> {
        let engine = select_engine(&config);
        let notifier = notifier::from_config(&config.notifications);
        Self::with_components(config, engine, notifier).await
    }

    /// Create a Downloader with an explicit fetch engine and notifier
    pub async fn with_components(
        config: Config,
        engine: Arc<dyn FetchEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;

        // Ensure the output directory exists
        tokio::fs::create_dir_all(&config.download.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.download.output_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        tracing::info!(
            engine = engine.name(),
            notifier = notifier.name(),
            max_concurrent = config.download.max_concurrent_downloads,
            "Downloader initialized"
        );

        Ok(Self {
            db: Arc::new(db),
            event_tx,
            tasks: TaskState::new(config.download.max_concurrent_downloads),
            config: Arc::new(config),
            engine,
            notifier,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Subscribe to downloader events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stream_dl::{Config, Downloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = Downloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "downloader event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Subscription registry sharing this downloader's database
    pub fn subscriptions(&self) -> SubscriptionRegistry {
        SubscriptionRegistry::new(Arc::clone(&self.db))
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}

/// Choose the fetch engine described by the tools configuration
fn select_engine(config: &Config) -> Arc<dyn FetchEngine> {
    let tools = &config.tools;
    let ffmpeg = tools
        .ffmpeg_path
        .clone()
        .or_else(|| tools.search_path.then(|| which::which("ffmpeg").ok()).flatten());

    let engine: Arc<dyn FetchEngine> = if let Some(ref ytdlp_path) = tools.ytdlp_path {
        // Use explicitly configured binary path
        Arc::new(CliFetchEngine::new(ytdlp_path.clone(), ffmpeg))
    } else if tools.search_path {
        // Search PATH for yt-dlp binary
        match which::which("yt-dlp") {
            Ok(ytdlp) => Arc::new(CliFetchEngine::new(ytdlp, ffmpeg)),
            Err(_) => {
                tracing::warn!("yt-dlp not found in PATH, downloads are disabled");
                Arc::new(NoOpFetchEngine)
            }
        }
    } else {
        // No binary configured and PATH search disabled
        Arc::new(NoOpFetchEngine)
    };

    engine
}
