//! Traits and types for the content fetch engine

use crate::types::{FetchMode, MediaInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Options for a single fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Standard download or live capture
    pub mode: FetchMode,
    /// Directory the engine writes into
    pub output_dir: PathBuf,
    /// Extra engine arguments passed verbatim
    pub extra_args: Vec<String>,
    /// Min/max seconds between retries while waiting for a live stream to start
    pub live_wait_for_video: (u64, u64),
}

/// Files produced by a successful fetch
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutput {
    /// Final paths of the downloaded media files
    pub files: Vec<PathBuf>,
}

/// Trait for content fetch engines
///
/// Implementations can drive external binaries or in-process libraries.
/// All methods may take arbitrarily long; callers run them off the
/// scheduler's control path.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Read the metadata that decides whether `url` is available now
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be run, the URL is unsupported,
    /// or the metadata cannot be parsed.
    async fn probe_metadata(&self, url: &str) -> crate::Result<MediaInfo>;

    /// Download `url`
    ///
    /// The engine must check `cancel` at its progress checkpoints and, once it
    /// observes cancellation, stop and return
    /// [`FetchError::Cancelled`](crate::error::FetchError::Cancelled).
    async fn fetch(
        &self,
        url: &str,
        request: &FetchRequest,
        cancel: CancellationToken,
    ) -> crate::Result<FetchOutput>;

    /// Post-process a finished live capture into a seekable container
    async fn remux(&self, output: &FetchOutput) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
