//! yt-dlp argument building and output parsing

use super::traits::FetchRequest;
use crate::error::FetchError;
use crate::types::{FetchMode, MediaInfo};
use std::ffi::OsString;
use std::path::PathBuf;

/// Arguments for a metadata-only probe
pub(crate) fn probe_args(url: &str) -> Vec<OsString> {
    [
        "--dump-single-json",
        "--no-playlist",
        "--skip-download",
        "--ignore-no-formats-error",
        "--no-warnings",
        "--",
        url,
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Arguments for a download
///
/// Progress is forced onto stdout one line per update; the final path of every
/// file is printed after it has been moved into place.
pub(crate) fn fetch_args(url: &str, request: &FetchRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--newline".into(),
        "--progress".into(),
        "--no-playlist".into(),
        "--print".into(),
        "after_move:filepath".into(),
        "--paths".into(),
        request.output_dir.clone().into_os_string(),
    ];

    if request.mode == FetchMode::LiveCapture {
        let (min, max) = request.live_wait_for_video;
        args.push("--wait-for-video".into());
        args.push(format!("{min}-{max}").into());
        args.push("--live-from-start".into());
    }

    args.extend(request.extra_args.iter().map(OsString::from));
    args.push("--".into());
    args.push(url.into());
    args
}

/// Parse the JSON written by `--dump-single-json`
pub(crate) fn parse_media_info(stdout: &[u8], url: &str) -> crate::Result<MediaInfo> {
    serde_json::from_slice::<MediaInfo>(stdout).map_err(|e| {
        FetchError::InvalidMetadata {
            url: url.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// What a single stdout line of a running download means
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum OutputLine {
    /// Progress or status message; a cancellation checkpoint
    Progress,
    /// Final path of a downloaded file
    File(PathBuf),
    /// Blank line
    Empty,
}

pub(crate) fn classify_line(line: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        OutputLine::Empty
    } else if line.starts_with('[') {
        OutputLine::Progress
    } else {
        OutputLine::File(PathBuf::from(line))
    }
}

/// Last non-empty stderr line, used as a failure reason
pub(crate) fn failure_reason(stderr_tail: &[String], status: std::process::ExitStatus) -> String {
    stderr_tail
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| format!("exited with {status}"))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: FetchMode) -> FetchRequest {
        FetchRequest {
            mode,
            output_dir: PathBuf::from("/media/dl"),
            extra_args: vec!["--format".into(), "best".into()],
            live_wait_for_video: (15, 60),
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn standard_fetch_args_end_with_url_after_separator() {
        let args = strings(fetch_args("https://x/v", &request(FetchMode::Standard)));

        assert!(!args.contains(&"--wait-for-video".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://x/v"]);
        let paths = args.iter().position(|a| a == "--paths").unwrap();
        assert_eq!(args[paths + 1], "/media/dl");
        assert!(args.contains(&"best".to_string()));
    }

    #[test]
    fn live_capture_waits_for_video() {
        let args = strings(fetch_args("https://x/v", &request(FetchMode::LiveCapture)));

        let wait = args.iter().position(|a| a == "--wait-for-video").unwrap();
        assert_eq!(args[wait + 1], "15-60");
        assert!(args.contains(&"--live-from-start".to_string()));
    }

    #[test]
    fn probe_args_skip_download() {
        let args = strings(probe_args("https://x/v"));
        assert!(args.contains(&"--skip-download".to_string()));
        assert_eq!(args.last().unwrap(), "https://x/v");
    }

    #[test]
    fn parse_upcoming_metadata() {
        let json = br#"{"id":"v","live_status":"is_upcoming","release_timestamp":1800000000}"#;
        let info = parse_media_info(json, "https://x/v").unwrap();
        assert_eq!(info.live_status.as_deref(), Some("is_upcoming"));
        assert_eq!(info.release_timestamp, Some(1_800_000_000));
    }

    #[test]
    fn parse_garbage_metadata_is_invalid_metadata() {
        let err = parse_media_info(b"ERROR: not json", "https://x/v").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Fetch(FetchError::InvalidMetadata { .. })
        ));
    }

    #[test]
    fn classify_output_lines() {
        assert_eq!(
            classify_line("[download]  12.5% of 1.00GiB at 5.00MiB/s ETA 03:00"),
            OutputLine::Progress
        );
        assert_eq!(classify_line("[wait] Waiting for video"), OutputLine::Progress);
        assert_eq!(classify_line("   \r"), OutputLine::Empty);
        assert_eq!(
            classify_line("/media/dl/Stream [abc].mkv\r"),
            OutputLine::File(PathBuf::from("/media/dl/Stream [abc].mkv"))
        );
    }
}
