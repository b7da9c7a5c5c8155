//! CLI-based fetch engine using the external yt-dlp and ffmpeg binaries

use super::parser::{OutputLine, classify_line, failure_reason, fetch_args, parse_media_info, probe_args};
use super::traits::{FetchEngine, FetchOutput, FetchRequest};
use crate::error::FetchError;
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Number of stderr lines kept for failure messages
const STDERR_TAIL_LINES: usize = 8;

/// CLI-based fetch engine
///
/// Probes and downloads with the `yt-dlp` binary and remuxes live captures
/// with `ffmpeg` (stream copy into `.mp4`). Each stdout line yt-dlp writes
/// while downloading is a cancellation checkpoint; once cancellation is
/// observed the child process is killed.
///
/// # Examples
///
/// ```no_run
/// use stream_dl::fetch::{CliFetchEngine, FetchEngine};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit paths
/// let engine = CliFetchEngine::new(PathBuf::from("/usr/bin/yt-dlp"), None);
///
/// // Or auto-discover from PATH
/// let engine = CliFetchEngine::from_path().expect("yt-dlp not found in PATH");
///
/// let info = engine.probe_metadata("https://www.youtube.com/watch?v=jNQXAC9IVRw").await?;
/// # Ok(())
/// # }
/// ```
pub struct CliFetchEngine {
    ytdlp_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
}

impl CliFetchEngine {
    /// Create a new CLI engine with explicit binary paths
    pub fn new(ytdlp_path: PathBuf, ffmpeg_path: Option<PathBuf>) -> Self {
        Self {
            ytdlp_path,
            ffmpeg_path,
        }
    }

    /// Attempt to find yt-dlp (and optionally ffmpeg) in PATH
    ///
    /// Returns `None` if yt-dlp is not found. A missing ffmpeg only disables remuxing.
    pub fn from_path() -> Option<Self> {
        let ytdlp = which::which("yt-dlp").ok()?;
        Some(Self::new(ytdlp, which::which("ffmpeg").ok()))
    }

    /// Use an explicit ffmpeg binary for remuxing
    pub fn with_ffmpeg(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self
    }

    async fn remux_file(&self, ffmpeg: &Path, input: &Path) -> crate::Result<()> {
        let output_path = input.with_extension("mp4");
        if output_path == input {
            return Ok(());
        }

        let output = Command::new(ffmpeg)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-c")
            .arg("copy")
            .arg("-movflags")
            .arg("+faststart")
            .arg(&output_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FetchError::ToolFailed {
                tool: "ffmpeg",
                reason: format!("failed to execute: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<String> = stderr.lines().map(str::to_string).collect();
            return Err(FetchError::ToolFailed {
                tool: "ffmpeg",
                reason: failure_reason(&tail, output.status),
            }
            .into());
        }

        tokio::fs::remove_file(input).await?;
        tracing::info!(
            input = %input.display(),
            output = %output_path.display(),
            "Remuxed live capture"
        );
        Ok(())
    }
}

#[async_trait]
impl FetchEngine for CliFetchEngine {
    async fn probe_metadata(&self, url: &str) -> crate::Result<MediaInfo> {
        let output = Command::new(&self.ytdlp_path)
            .args(probe_args(url))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FetchError::ToolFailed {
                tool: "yt-dlp",
                reason: format!("failed to execute: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<String> = stderr.lines().map(str::to_string).collect();
            return Err(FetchError::ToolFailed {
                tool: "yt-dlp",
                reason: failure_reason(&tail, output.status),
            }
            .into());
        }

        parse_media_info(&output.stdout, url)
    }

    async fn fetch(
        &self,
        url: &str,
        request: &FetchRequest,
        cancel: CancellationToken,
    ) -> crate::Result<FetchOutput> {
        tokio::fs::create_dir_all(&request.output_dir).await?;

        let mut child = Command::new(&self.ytdlp_path)
            .args(fetch_args(url, request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::ToolFailed {
                tool: "yt-dlp",
                reason: format!("failed to execute: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| FetchError::ToolFailed {
            tool: "yt-dlp",
            reason: "stdout was not captured".into(),
        })?;
        let stderr = child.stderr.take();

        // Drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut files = Vec::new();

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => None,
                line = lines.next_line() => Some(line?),
            };

            let Some(line) = line else {
                tracing::info!(url = %url, "Cancellation observed, stopping yt-dlp");
                if let Err(e) = child.kill().await {
                    tracing::warn!(url = %url, error = %e, "Failed to kill yt-dlp");
                }
                stderr_task.abort();
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                }
                .into());
            };

            match line {
                None => break,
                Some(line) => match classify_line(&line) {
                    OutputLine::Progress => tracing::trace!(url = %url, progress = %line),
                    OutputLine::File(path) => files.push(path),
                    OutputLine::Empty => {}
                },
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(FetchError::ToolFailed {
                tool: "yt-dlp",
                reason: failure_reason(&stderr_tail, status),
            }
            .into());
        }

        Ok(FetchOutput { files })
    }

    async fn remux(&self, output: &FetchOutput) -> crate::Result<()> {
        let Some(ffmpeg) = &self.ffmpeg_path else {
            return Err(crate::Error::NotSupported(
                "Remuxing requires the ffmpeg binary. \
                 Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                    .into(),
            ));
        };

        for file in &output.files {
            let is_mp4 = file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
            if is_mp4 {
                continue;
            }
            self.remux_file(ffmpeg, file).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchMode;

    #[test]
    fn test_from_path_consistency_with_which_crate() {
        let which_result = which::which("yt-dlp");
        let from_path_result = CliFetchEngine::from_path();

        assert_eq!(
            which_result.is_ok(),
            from_path_result.is_some(),
            "from_path() should return Some if and only if which::which() succeeds"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_failure() {
        let engine = CliFetchEngine::new(PathBuf::from("/nonexistent/yt-dlp-xyz"), None);

        let err = engine.probe_metadata("https://x/v").await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Fetch(FetchError::ToolFailed { tool: "yt-dlp", .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let request = FetchRequest {
            mode: FetchMode::Standard,
            output_dir: dir.path().to_path_buf(),
            extra_args: vec![],
            live_wait_for_video: (15, 60),
        };
        let err = engine
            .fetch("https://x/v", &request, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn test_remux_without_ffmpeg_is_not_supported() {
        let engine = CliFetchEngine::new(PathBuf::from("yt-dlp"), None);
        let output = FetchOutput {
            files: vec![PathBuf::from("/tmp/capture.mkv")],
        };
        assert!(matches!(
            engine.remux(&output).await,
            Err(crate::Error::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_remux_skips_mp4_files() {
        let engine = CliFetchEngine::new(PathBuf::from("yt-dlp"), None)
            .with_ffmpeg(PathBuf::from("/nonexistent/ffmpeg-xyz"));
        let output = FetchOutput {
            files: vec![PathBuf::from("/tmp/already.MP4")],
        };
        // ffmpeg is never invoked, so the bogus path does not matter
        assert!(engine.remux(&output).await.is_ok());
    }

    #[cfg(feature = "live-tests")]
    #[tokio::test]
    async fn test_probe_real_video() {
        let Some(engine) = CliFetchEngine::from_path() else {
            println!("Skipping test: yt-dlp binary not found in PATH");
            return;
        };

        let info = engine
            .probe_metadata("https://www.youtube.com/watch?v=jNQXAC9IVRw")
            .await
            .unwrap();
        assert_eq!(info.live_status.as_deref(), Some("not_live"));
    }
}
