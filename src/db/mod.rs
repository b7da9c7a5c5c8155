//! Database layer for stream-dl
//!
//! Handles SQLite persistence for deferred downloads, completion destinations,
//! and subscriptions.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`deferred`]: Deferred download entries and the scheduler hand-off
//! - [`completions`]: Completion destinations consumed when a download finishes
//! - [`subscriptions`]: Source channel subscriptions

use crate::types::{Destination, FetchMode, RoomKind};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod completions;
mod deferred;
mod migrations;
mod subscriptions;

/// Deferred download record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct DeferredRow {
    /// Content URL (unique)
    pub url: String,
    /// Unix timestamp the download becomes due
    pub due_at: i64,
    /// Whether the entry is still armed (0 = logically cancelled)
    pub valid: i64,
    /// Fetch mode ("standard" or "live_capture")
    pub mode: String,
}

/// Deferred download entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredEntry {
    /// Content URL
    pub url: String,
    /// Instant the download becomes due
    pub due_at: DateTime<Utc>,
    /// False once the entry has been cancelled without being deleted
    pub valid: bool,
    /// How the download should be fetched once due
    pub mode: FetchMode,
}

impl From<DeferredRow> for DeferredEntry {
    fn from(row: DeferredRow) -> Self {
        DeferredEntry {
            url: row.url,
            due_at: Utc
                .timestamp_opt(row.due_at, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            valid: row.valid != 0,
            mode: FetchMode::from_db(&row.mode),
        }
    }
}

/// Subscription record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    /// Guild that subscribed
    pub guild_id: i64,
    /// Channel that receives notifications
    pub channel_id: i64,
    /// Lowercased id of the watched source channel
    pub source_channel_id: String,
    /// Room kind ("streams" or "videos")
    pub kind: String,
}

/// Subscription of a chat destination to a source channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Destination notified about matching events
    pub destination: Destination,
    /// Lowercased id of the watched source channel
    pub source_channel_id: String,
    /// Kind of content subscribed to
    pub kind: RoomKind,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = crate::Error;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            destination: Destination::new(row.guild_id, row.channel_id),
            source_channel_id: row.source_channel_id,
            kind: row.kind.parse()?,
        })
    }
}

/// Database handle for stream-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
