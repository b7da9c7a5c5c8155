//! Core types for stream-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat destination that receives notifications about a download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Destination {
    /// Guild (server) id
    pub guild_id: i64,
    /// Text channel id within the guild
    pub channel_id: i64,
}

impl Destination {
    /// Create a new destination
    pub fn new(guild_id: i64, channel_id: i64) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

/// How a download should be fetched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Plain download of already-available content
    #[default]
    Standard,
    /// Capture of a live stream or premiere; waits for the stream to start and
    /// remuxes the result afterwards
    LiveCapture,
}

impl FetchMode {
    /// Stable string used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMode::Standard => "standard",
            FetchMode::LiveCapture => "live_capture",
        }
    }

    /// Parse the database representation; unknown values fall back to `Standard`
    pub fn from_db(value: &str) -> Self {
        match value {
            "live_capture" => FetchMode::LiveCapture,
            _ => FetchMode::Standard,
        }
    }
}

/// Kind of upcoming content a subscription is interested in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    /// Live streams
    #[serde(rename = "streams")]
    Stream,
    /// Scheduled premieres of uploaded videos
    #[serde(rename = "videos")]
    Premiere,
}

impl RoomKind {
    /// Stable string used in the database and on the event feed
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Stream => "streams",
            RoomKind::Premiere => "videos",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "streams" | "stream" => Ok(RoomKind::Stream),
            "videos" | "video" | "premiere" | "premieres" => Ok(RoomKind::Premiere),
            other => Err(crate::Error::Other(format!("unknown room kind: {other}"))),
        }
    }
}

/// Availability of a content item, as decided by the prober
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The item can be fetched right now
    Now,
    /// The item goes live at the given instant
    Future(DateTime<Utc>),
    /// Probing failed; the message is suitable for showing to the requester
    Error(String),
}

/// Subset of the fetch engine's metadata that decides availability
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MediaInfo {
    /// Live status, e.g. "is_upcoming", "is_live", "was_live", "not_live"
    #[serde(default)]
    pub live_status: Option<String>,
    /// Announced start as UTC epoch seconds (upcoming items only)
    #[serde(default)]
    pub release_timestamp: Option<i64>,
}

/// Result of asking the task manager to launch a download
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Launch {
    /// A new fetch was spawned
    Started,
    /// The URL was already running; the destination (if any) was attached to it
    AlreadyRunning,
}

/// Result of a user download request after probing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Item was available and a fetch is running for it
    Started(Launch),
    /// Item is upcoming; a deferred entry was stored for the given instant
    Scheduled(DateTime<Utc>),
    /// Probing failed
    Unavailable(String),
}

/// How a running task ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Fetch finished successfully
    Completed,
    /// Fetch failed
    Failed(String),
    /// Fetch stopped after observing its cancellation token
    Cancelled,
}

impl TaskOutcome {
    /// Message sent to completion destinations
    pub fn message(&self, url: &str) -> String {
        match self {
            TaskOutcome::Completed => format!("Finished downloading {url}"),
            TaskOutcome::Failed(error) => format!("Download of {url} failed: {error}"),
            TaskOutcome::Cancelled => format!("Cancelled download of {url}"),
        }
    }
}

/// What a call to `reconcile` observed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Tasks that finished and were removed, with their outcomes
    pub finished: Vec<(String, TaskOutcome)>,
    /// Tasks still running after the deadline; they stay tracked
    pub still_running: usize,
}

/// Events emitted by the downloader
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A fetch was spawned
    TaskStarted {
        /// Content URL
        url: String,
        /// Fetch mode
        mode: FetchMode,
    },

    /// A fetch finished (successfully, with an error, or cancelled)
    TaskFinished {
        /// Content URL
        url: String,
        /// How it ended
        outcome: TaskOutcome,
    },

    /// A download was deferred until a future instant
    Deferred {
        /// Content URL
        url: String,
        /// When the download becomes due
        due_at: DateTime<Utc>,
    },

    /// The scheduler pulled a due entry out of the store
    DeferredDispatched {
        /// Content URL
        url: String,
    },

    /// Downloader is shutting down
    Shutdown,
}
