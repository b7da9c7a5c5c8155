use super::*;
use chrono::{DateTime, TimeDelta, Utc};

#[tokio::test]
async fn test_cancel_running_download() {
    let engine = MockFetchEngine::blocking();
    let (downloader, notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    downloader
        .launch("https://x/a", Some(Destination::new(1, 10)), true, FetchMode::Standard)
        .await
        .unwrap();
    wait_for_fetches(&engine, 1).await;

    assert!(downloader.cancel("https://x/a").await.unwrap());

    let summary = downloader.reconcile(Duration::from_secs(5)).await;
    assert_eq!(
        summary.finished,
        vec![("https://x/a".to_string(), TaskOutcome::Cancelled)]
    );

    // Cancelled is observably distinct from success
    assert_eq!(
        notifier.messages(),
        vec![(1, 10, "Cancelled download of https://x/a".to_string())]
    );
    assert!(downloader.db.get_completions("https://x/a").await.unwrap().is_empty());
    assert!(downloader.running_urls().await.is_empty());
}

#[tokio::test]
async fn test_cancel_while_waiting_for_slot() {
    let engine = MockFetchEngine::blocking();
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    for i in 0..3 {
        downloader
            .launch(&format!("https://x/{i}"), None, false, FetchMode::Standard)
            .await
            .unwrap();
    }
    wait_for_fetches(&engine, 3).await;
    downloader
        .launch("https://x/queued", None, false, FetchMode::Standard)
        .await
        .unwrap();

    assert!(downloader.cancel("https://x/queued").await.unwrap());
    let summary = downloader.reconcile(Duration::from_millis(200)).await;

    assert_eq!(
        summary.finished,
        vec![("https://x/queued".to_string(), TaskOutcome::Cancelled)]
    );
    assert_eq!(summary.still_running, 3);
    assert!(
        !engine.fetched().iter().any(|(url, _)| url == "https://x/queued"),
        "a task cancelled before its slot never reaches the engine"
    );

    engine.release();
    downloader.reconcile(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn test_cancel_deferred_marks_invalid() {
    let (downloader, _notifier, _temp_dir) =
        create_test_downloader_with(MockFetchEngine::instant()).await;

    downloader
        .schedule_at(
            "https://x/later",
            Utc::now() + TimeDelta::hours(1),
            None,
            FetchMode::LiveCapture,
        )
        .await
        .unwrap();

    assert!(downloader.cancel("https://x/later").await.unwrap());

    // Row is kept so the feed cannot re-arm it, but it is no longer scheduled
    let entry = downloader.db.get_deferred("https://x/later").await.unwrap().unwrap();
    assert!(!entry.valid);
    assert!(downloader.scheduled_downloads().await.unwrap().is_empty());

    // Cancelling again finds nothing valid
    assert!(!downloader.cancel("https://x/later").await.unwrap());
}

#[tokio::test]
async fn test_cancel_unknown_url_returns_false() {
    let (downloader, _notifier, _temp_dir) =
        create_test_downloader_with(MockFetchEngine::instant()).await;
    assert!(!downloader.cancel("https://x/nothing").await.unwrap());
}

#[tokio::test]
async fn test_schedule_at_rearms_cancelled_entry() {
    let (downloader, _notifier, _temp_dir) =
        create_test_downloader_with(MockFetchEngine::instant()).await;
    let at = Utc::now() + TimeDelta::hours(1);

    downloader
        .schedule_at("https://x/a", at, Some(Destination::new(1, 10)), FetchMode::Standard)
        .await
        .unwrap();
    downloader.cancel("https://x/a").await.unwrap();
    downloader
        .schedule_at("https://x/a", at, None, FetchMode::LiveCapture)
        .await
        .unwrap();

    let scheduled = downloader.scheduled_downloads().await.unwrap();
    assert_eq!(scheduled.len(), 1);
    assert!(scheduled[0].valid);
    assert_eq!(scheduled[0].mode, FetchMode::LiveCapture);
    assert_eq!(
        downloader.db.get_completions("https://x/a").await.unwrap(),
        vec![Destination::new(1, 10)]
    );
}

#[tokio::test]
async fn test_scheduled_downloads_sorted_by_due_time() {
    let (downloader, _notifier, _temp_dir) =
        create_test_downloader_with(MockFetchEngine::instant()).await;
    let now = Utc::now();

    downloader
        .schedule_at("https://x/late", now + TimeDelta::hours(3), None, FetchMode::Standard)
        .await
        .unwrap();
    downloader
        .schedule_at("https://x/early", now + TimeDelta::hours(1), None, FetchMode::Standard)
        .await
        .unwrap();

    let urls: Vec<String> = downloader
        .scheduled_downloads()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.url)
        .collect();
    assert_eq!(urls, vec!["https://x/early", "https://x/late"]);
}

#[tokio::test]
async fn test_request_download_available_now_launches() {
    let engine = MockFetchEngine::with_metadata(MediaInfo {
        live_status: Some("not_live".into()),
        release_timestamp: None,
    });
    let (downloader, notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    let outcome = downloader
        .request_download("https://x/a", Destination::new(1, 10))
        .await
        .unwrap();
    assert_eq!(outcome, RequestOutcome::Started(Launch::Started));

    downloader.reconcile(Duration::from_secs(5)).await;
    assert_eq!(engine.fetched(), vec![("https://x/a".to_string(), FetchMode::Standard)]);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_request_download_upcoming_is_deferred() {
    let release = (Utc::now() + TimeDelta::hours(5)).timestamp();
    let engine = MockFetchEngine::with_metadata(MediaInfo {
        live_status: Some("is_upcoming".into()),
        release_timestamp: Some(release),
    });
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    let outcome = downloader
        .request_download("https://x/premiere", Destination::new(1, 10))
        .await
        .unwrap();

    let at = DateTime::from_timestamp(release, 0).unwrap();
    assert_eq!(outcome, RequestOutcome::Scheduled(at));

    let entry = downloader
        .db
        .get_deferred("https://x/premiere")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.due_at, at);
    assert_eq!(entry.mode, FetchMode::LiveCapture);
    assert!(engine.fetched().is_empty());
    assert_eq!(
        downloader.db.get_completions("https://x/premiere").await.unwrap(),
        vec![Destination::new(1, 10)]
    );
}

#[tokio::test]
async fn test_request_download_probe_error_stores_nothing() {
    let engine = MockFetchEngine::with_metadata(MediaInfo::default());
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    let outcome = downloader
        .request_download("https://x/bad", Destination::new(1, 10))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RequestOutcome::Unavailable("No live status found in video info".into())
    );
    assert!(downloader.db.get_deferred("https://x/bad").await.unwrap().is_none());
    assert!(downloader.db.get_completions("https://x/bad").await.unwrap().is_empty());
    assert!(engine.fetched().is_empty());
}
