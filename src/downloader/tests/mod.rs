use super::test_helpers::{
    MockFetchEngine, RecordingNotifier, create_test_downloader_with,
    create_test_downloader_with_notifier, test_config,
};
use super::*;
use crate::types::{Destination, FetchMode, Launch, MediaInfo, RequestOutcome, TaskOutcome};
use std::time::Duration;
use tempfile::tempdir;

mod control;
mod reconcile;

/// Wait until the engine has seen `count` fetches (or give up after a second)
async fn wait_for_fetches(engine: &MockFetchEngine, count: usize) {
    for _ in 0..100 {
        if engine.fetched().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
