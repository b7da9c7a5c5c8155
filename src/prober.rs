//! Availability probing
//!
//! Decides whether a URL can be fetched now, goes live at a known instant, or
//! cannot be handled at all. Probing is best-effort: every failure becomes a
//! [`Verdict::Error`] carrying a message suitable for the requester.

use crate::fetch::FetchEngine;
use crate::types::{MediaInfo, Verdict};
use chrono::{DateTime, Utc};

/// Live status reported for items that have not started yet
const UPCOMING: &str = "is_upcoming";

/// Probe `url` with the engine's metadata path and classify the result
///
/// The probe runs on its own task so a slow or wedged metadata query never
/// runs on the caller's task. A panicking probe is reported like any other
/// failure.
pub async fn probe(engine: std::sync::Arc<dyn FetchEngine>, url: &str) -> Verdict {
    let owned = url.to_string();
    let result = tokio::spawn(async move { engine.probe_metadata(&owned).await }).await;

    match result {
        Ok(Ok(info)) => classify(&info),
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "Probe failed");
            Verdict::Error(e.to_string())
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Probe task did not complete");
            Verdict::Error(format!("probe task failed: {e}"))
        }
    }
}

/// Classify already-fetched metadata
pub fn classify(info: &MediaInfo) -> Verdict {
    let Some(status) = info.live_status.as_deref() else {
        return Verdict::Error("No live status found in video info".into());
    };

    if status != UPCOMING {
        return Verdict::Now;
    }

    match info
        .release_timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    {
        Some(at) => Verdict::Future(at),
        None => Verdict::Error(
            "No timestamp found in video info, cannot schedule a download".into(),
        ),
    }
}
