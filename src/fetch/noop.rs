//! No-op fetch engine for graceful degradation

use super::traits::{FetchEngine, FetchOutput, FetchRequest};
use crate::types::MediaInfo;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Fetch engine used when no `yt-dlp` binary is available or configured
///
/// Every operation returns `Error::NotSupported`, so probes surface as
/// `Verdict::Error` and launched tasks finish as failed instead of the
/// downloader refusing to start.
///
/// # Examples
///
/// ```
/// use stream_dl::fetch::{FetchEngine, NoOpFetchEngine};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = NoOpFetchEngine;
/// assert!(engine.probe_metadata("https://example.com/v").await.is_err());
/// # }
/// ```
pub struct NoOpFetchEngine;

#[async_trait]
impl FetchEngine for NoOpFetchEngine {
    async fn probe_metadata(&self, _url: &str) -> crate::Result<MediaInfo> {
        Err(crate::Error::NotSupported(
            "Probing requires the yt-dlp binary. \
             Configure ytdlp_path in config or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    async fn fetch(
        &self,
        _url: &str,
        _request: &FetchRequest,
        _cancel: CancellationToken,
    ) -> crate::Result<FetchOutput> {
        Err(crate::Error::NotSupported(
            "Downloading requires the yt-dlp binary. \
             Configure ytdlp_path in config or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    async fn remux(&self, _output: &FetchOutput) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "Remuxing requires the ffmpeg binary.".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
