//! Error types for stream-dl
//!
//! This module provides the crate-wide error enum plus the domain-specific
//! error types for the store and the fetch engine.

use thiserror::Error;

/// Result type alias for stream-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stream-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "scheduler.poll_interval")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Fetch engine error (probe, download or remux)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Notification could not be delivered
    #[error("notification failed: {0}")]
    Notify(String),

    /// Event feed returned something other than an event stream
    #[error("event stream error: {0}")]
    Stream(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Fetch engine errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch observed its cancellation token at a progress checkpoint
    #[error("download of {url} was cancelled")]
    Cancelled {
        /// The URL whose download was cancelled
        url: String,
    },

    /// The external tool exited unsuccessfully or could not be started
    #[error("{tool} failed: {reason}")]
    ToolFailed {
        /// Name of the tool (e.g. "yt-dlp", "ffmpeg")
        tool: &'static str,
        /// Exit status or spawn failure
        reason: String,
    },

    /// Metadata returned by the engine could not be interpreted
    #[error("invalid metadata for {url}: {reason}")]
    InvalidMetadata {
        /// The URL that was probed
        url: String,
        /// What was wrong with the metadata
        reason: String,
    },
}

impl Error {
    /// Whether this error is a cooperative cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Fetch(FetchError::Cancelled { .. }))
    }
}
