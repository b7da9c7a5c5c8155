use super::*;
use tokio::time::Instant;

#[tokio::test]
async fn test_reconcile_with_nothing_running_returns_immediately() {
    let (downloader, _notifier, _temp_dir) =
        create_test_downloader_with(MockFetchEngine::instant()).await;

    let start = Instant::now();
    let summary = downloader.reconcile(Duration::from_secs(30)).await;

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(summary.finished.is_empty());
    assert_eq!(summary.still_running, 0);
}

#[tokio::test]
async fn test_reconcile_is_bounded_and_keeps_unfinished_tasks() {
    let engine = MockFetchEngine::blocking();
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    downloader
        .launch("https://x/long", None, false, FetchMode::Standard)
        .await
        .unwrap();

    let start = Instant::now();
    let summary = downloader.reconcile(Duration::from_millis(100)).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2), "reconcile overran its timeout: {elapsed:?}");
    assert!(summary.finished.is_empty());
    assert_eq!(summary.still_running, 1);
    assert!(downloader.running_urls().await.contains("https://x/long"));

    // The timeout did not cancel the fetch; the next call picks it up
    engine.release();
    let summary = downloader.reconcile(Duration::from_secs(5)).await;
    assert_eq!(
        summary.finished,
        vec![("https://x/long".to_string(), TaskOutcome::Completed)]
    );
    assert!(downloader.running_urls().await.is_empty());
}

#[tokio::test]
async fn test_reconcile_removes_finished_and_keeps_running() {
    let blocking = MockFetchEngine::blocking();
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(blocking.clone()).await;

    downloader
        .launch("https://x/long", None, false, FetchMode::Standard)
        .await
        .unwrap();
    downloader
        .launch("https://x/cancelled", None, false, FetchMode::Standard)
        .await
        .unwrap();
    wait_for_fetches(&blocking, 2).await;
    downloader.cancel("https://x/cancelled").await.unwrap();

    let summary = downloader.reconcile(Duration::from_millis(200)).await;
    assert_eq!(
        summary.finished,
        vec![("https://x/cancelled".to_string(), TaskOutcome::Cancelled)]
    );
    assert_eq!(summary.still_running, 1);
    assert_eq!(
        downloader.running_urls().await.into_iter().collect::<Vec<_>>(),
        vec!["https://x/long".to_string()]
    );

    blocking.release();
    downloader.reconcile(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn test_cancel_after_finish_before_reconcile_is_not_running() {
    let engine = MockFetchEngine::instant();
    let (downloader, _notifier, _temp_dir) = create_test_downloader_with(engine.clone()).await;

    downloader
        .launch("https://x/a", None, false, FetchMode::Standard)
        .await
        .unwrap();
    wait_for_fetches(&engine, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Finished but not yet reconciled: neither running nor deferred
    assert!(!downloader.cancel("https://x/a").await.unwrap());

    // A new launch replaces the finished slot instead of reporting it running
    let launch = downloader
        .launch("https://x/a", None, false, FetchMode::Standard)
        .await
        .unwrap();
    assert_eq!(launch, Launch::Started);
    downloader.reconcile(Duration::from_secs(5)).await;
    assert_eq!(engine.fetched().len(), 2);
}
