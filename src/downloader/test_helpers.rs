//! Shared test helpers for creating Downloader instances in tests.

use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{FetchError, Result};
use crate::fetch::{FetchEngine, FetchOutput, FetchRequest};
use crate::notifier::Notifier;
use crate::types::{FetchMode, MediaInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// Interval between the mock engine's cancellation checkpoints
const CHECKPOINT: Duration = Duration::from_millis(10);

/// Fetch engine controlled by the test
///
/// A fetch records its call, then loops over progress checkpoints until the
/// test releases it (or it was created released). Cancellation is observed
/// only at checkpoints, like a real engine.
pub(crate) struct MockFetchEngine {
    calls: Mutex<Vec<(String, FetchMode)>>,
    remuxed: Mutex<Vec<FetchOutput>>,
    release: CancellationToken,
    fail_with: Option<String>,
    fail_remux: bool,
    metadata: MediaInfo,
}

impl MockFetchEngine {
    fn build(released: bool) -> Self {
        let release = CancellationToken::new();
        if released {
            release.cancel();
        }
        Self {
            calls: Mutex::new(Vec::new()),
            remuxed: Mutex::new(Vec::new()),
            release,
            fail_with: None,
            fail_remux: false,
            metadata: MediaInfo {
                live_status: Some("not_live".into()),
                release_timestamp: None,
            },
        }
    }

    /// Every fetch completes at its first checkpoint
    pub(crate) fn instant() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    /// Fetches run until [`release`](Self::release) or cancellation
    pub(crate) fn blocking() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    /// Every fetch fails with `error`
    pub(crate) fn failing(error: &str) -> Arc<Self> {
        let mut engine = Self::build(true);
        engine.fail_with = Some(error.to_string());
        Arc::new(engine)
    }

    /// Fetches succeed but remuxing fails
    pub(crate) fn failing_remux() -> Arc<Self> {
        let mut engine = Self::build(true);
        engine.fail_remux = true;
        Arc::new(engine)
    }

    /// Probes report `metadata`; fetches complete immediately
    pub(crate) fn with_metadata(metadata: MediaInfo) -> Arc<Self> {
        let mut engine = Self::build(true);
        engine.metadata = metadata;
        Arc::new(engine)
    }

    /// Let every blocked fetch finish
    pub(crate) fn release(&self) {
        self.release.cancel();
    }

    /// URLs and modes fetched so far, in call order
    pub(crate) fn fetched(&self) -> Vec<(String, FetchMode)> {
        self.calls.lock().unwrap().clone()
    }

    /// Outputs passed to `remux`
    pub(crate) fn remuxed(&self) -> Vec<FetchOutput> {
        self.remuxed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchEngine for MockFetchEngine {
    async fn probe_metadata(&self, _url: &str) -> Result<MediaInfo> {
        Ok(self.metadata.clone())
    }

    async fn fetch(
        &self,
        url: &str,
        request: &FetchRequest,
        cancel: CancellationToken,
    ) -> Result<FetchOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), request.mode));

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                }
                .into());
            }
            if self.release.is_cancelled() {
                break;
            }
            tokio::time::sleep(CHECKPOINT).await;
        }

        if let Some(error) = &self.fail_with {
            return Err(FetchError::ToolFailed {
                tool: "mock",
                reason: error.clone(),
            }
            .into());
        }

        Ok(FetchOutput {
            files: vec![request.output_dir.join("capture.mkv")],
        })
    }

    async fn remux(&self, output: &FetchOutput) -> Result<()> {
        self.remuxed.lock().unwrap().push(output.clone());
        if self.fail_remux {
            return Err(crate::Error::NotSupported("mock remux failure".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Notifier that records every message it is asked to send
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<(i64, i64, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Records messages, then reports every send as failed
    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    /// Messages sent so far as `(guild_id, channel_id, text)`
    pub(crate) fn messages(&self) -> Vec<(i64, i64, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, guild_id: i64, channel_id: i64, text: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((guild_id, channel_id, text.to_string()));
        if self.fail {
            return Err(crate::Error::Notify("recording notifier told to fail".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Configuration pointing every path into `dir`, with short scheduler timings
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.download.output_dir = dir.join("downloads");
    config.download.max_concurrent_downloads = 3;
    config.scheduler.poll_interval = Duration::from_millis(500);
    config.tools.search_path = false;
    config.tools.ytdlp_path = Some(PathBuf::from("/nonexistent/yt-dlp"));
    config
}

/// Helper to create a test Downloader with the given engine and a recording notifier.
/// Returns the downloader, the notifier, and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader_with(
    engine: Arc<MockFetchEngine>,
) -> (Downloader, Arc<RecordingNotifier>, tempfile::TempDir) {
    create_test_downloader_with_notifier(engine, Arc::new(RecordingNotifier::default())).await
}

/// Like [`create_test_downloader_with`] but with a caller-supplied notifier
pub(crate) async fn create_test_downloader_with_notifier(
    engine: Arc<MockFetchEngine>,
    notifier: Arc<RecordingNotifier>,
) -> (Downloader, Arc<RecordingNotifier>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());

    let downloader = Downloader::with_components(config, engine, notifier.clone())
        .await
        .unwrap();

    (downloader, notifier, temp_dir)
}
