//! Configuration types for stream-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Deferred-download scheduler configuration
///
/// Controls how often the scheduler loop wakes up and which deferred entries
/// it considers due.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between scheduler ticks (default: 60 seconds)
    ///
    /// Also used as the bound for each tick's reconcile wait.
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Entries due within this window are pulled early (default: 120 seconds)
    #[serde(default = "default_grace_window", with = "duration_serde")]
    pub grace_window: Duration,

    /// Entries overdue by more than this are swept (default: 24 hours)
    #[serde(default = "default_stale_after", with = "duration_serde")]
    pub stale_after: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            grace_window: default_grace_window(),
            stale_after: default_stale_after(),
        }
    }
}

/// Download behavior configuration (output location, concurrency, engine arguments)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory downloaded media is written to (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum fetches executing at once (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Extra arguments passed verbatim to the fetch engine for every download
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Minimum and maximum seconds between "is it live yet" retries in live-capture mode
    /// (default: 15, 60)
    #[serde(default = "default_live_wait_for_video")]
    pub live_wait_for_video: (u64, u64),
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            extra_args: vec![],
            live_wait_for_video: default_live_wait_for_video(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable used for remuxing live captures (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Completion notification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook that receives `{guild_id, channel_id, content}` messages.
    /// When unset, messages are only written to the log.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Optional authentication header value
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Timeout for webhook requests (default: 30 seconds)
    #[serde(default = "default_webhook_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            auth_header: None,
            timeout: default_webhook_timeout(),
        }
    }
}

/// External event feed (server-sent events) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventFeedConfig {
    /// Base URL of the feed service; the client connects to `{base_url}/live?new_only=true`
    pub base_url: String,

    /// Delay before reconnecting after the stream ends or fails (default: 30 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,

    /// Timeout for establishing the connection (default: 60 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Longest silence tolerated on an open stream before reconnecting (default: 60 seconds)
    #[serde(default = "default_read_timeout", with = "duration_serde")]
    pub read_timeout: Duration,

    /// Prefix joined with a video id when an event carries no explicit URL
    #[serde(default = "default_watch_url_prefix")]
    pub watch_url_prefix: String,
}

impl EventFeedConfig {
    /// Create a feed configuration with default timings for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retry_delay: default_retry_delay(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            watch_url_prefix: default_watch_url_prefix(),
        }
    }

    /// URL of the live event stream endpoint
    pub fn stream_url(&self) -> String {
        format!("{}/live?new_only=true", self.base_url.trim_end_matches('/'))
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./stream-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for [`Downloader`](crate::Downloader)
///
/// Every section has sensible defaults, so an empty document deserializes
/// into a working configuration (minus the optional event feed).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Scheduler loop timing
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Completion notifications
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// External event feed (disabled when None)
    #[serde(default)]
    pub event_feed: Option<EventFeedConfig>,
}

impl Config {
    /// Check settings that would otherwise make the scheduler spin or stall
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".into(),
                key: Some("scheduler.poll_interval".into()),
            });
        }
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".into(),
                key: Some("download.max_concurrent_downloads".into()),
            });
        }
        let (min, max) = self.download.live_wait_for_video;
        if min > max {
            return Err(Error::Config {
                message: format!("live_wait_for_video minimum {min} exceeds maximum {max}"),
                key: Some("download.live_wait_for_video".into()),
            });
        }
        if let Some(feed) = &self.event_feed {
            if feed.base_url.is_empty() {
                return Err(Error::Config {
                    message: "event feed base_url must not be empty".into(),
                    key: Some("event_feed.base_url".into()),
                });
            }
        }
        Ok(())
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_grace_window() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_stale_after() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_live_wait_for_video() -> (u64, u64) {
    (15, 60)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./stream-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_watch_url_prefix() -> String {
    "https://www.youtube.com/watch?v=".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
