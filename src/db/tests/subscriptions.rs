use super::setup_db;
use crate::types::{Destination, RoomKind};

#[tokio::test]
async fn test_add_subscription_lowercases_and_dedupes() {
    let (db, _temp) = setup_db().await;
    let dest = Destination::new(1, 10);

    assert!(
        db.add_subscription(dest, "UCabcDEF", RoomKind::Stream)
            .await
            .unwrap()
    );
    assert!(
        !db.add_subscription(dest, "ucabcdef", RoomKind::Stream)
            .await
            .unwrap(),
        "same guild/source/kind differing only in case is a duplicate"
    );

    let subs = db.get_subscriptions(1).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].source_channel_id, "ucabcdef");
    assert_eq!(subs[0].kind, RoomKind::Stream);
    assert_eq!(subs[0].destination, dest);
}

#[tokio::test]
async fn test_unique_per_guild_source_kind() {
    let (db, _temp) = setup_db().await;

    db.add_subscription(Destination::new(1, 10), "chan1", RoomKind::Stream)
        .await
        .unwrap();
    // Same guild, different notification channel: still the same subscription
    assert!(
        !db.add_subscription(Destination::new(1, 99), "chan1", RoomKind::Stream)
            .await
            .unwrap()
    );
    // Different kind and different guild are separate subscriptions
    assert!(
        db.add_subscription(Destination::new(1, 10), "chan1", RoomKind::Premiere)
            .await
            .unwrap()
    );
    assert!(
        db.add_subscription(Destination::new(2, 20), "chan1", RoomKind::Stream)
            .await
            .unwrap()
    );

    let dests = db
        .get_subscription_destinations("CHAN1", RoomKind::Stream)
        .await
        .unwrap();
    assert_eq!(dests, vec![Destination::new(1, 10), Destination::new(2, 20)]);
}

#[tokio::test]
async fn test_remove_subscription_with_kind_removes_only_that_kind() {
    let (db, _temp) = setup_db().await;
    let dest = Destination::new(1, 10);

    db.add_subscription(dest, "chan1", RoomKind::Stream)
        .await
        .unwrap();
    db.add_subscription(dest, "chan1", RoomKind::Premiere)
        .await
        .unwrap();

    let removed = db
        .remove_subscription(1, "Chan1", Some(RoomKind::Stream))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let subs = db.get_subscriptions(1).await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].kind, RoomKind::Premiere);
}

#[tokio::test]
async fn test_remove_subscription_without_kind_removes_all_kinds_for_guild() {
    let (db, _temp) = setup_db().await;

    db.add_subscription(Destination::new(1, 10), "chan1", RoomKind::Stream)
        .await
        .unwrap();
    db.add_subscription(Destination::new(1, 10), "chan1", RoomKind::Premiere)
        .await
        .unwrap();
    db.add_subscription(Destination::new(1, 10), "chan2", RoomKind::Stream)
        .await
        .unwrap();
    db.add_subscription(Destination::new(2, 20), "chan1", RoomKind::Stream)
        .await
        .unwrap();

    let removed = db.remove_subscription(1, "CHAN1", None).await.unwrap();
    assert_eq!(removed, 2);

    let remaining = db.get_subscriptions(1).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_channel_id, "chan2");

    // Other guilds are untouched
    assert_eq!(db.get_subscriptions(2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_destinations_empty_for_unknown_source() {
    let (db, _temp) = setup_db().await;

    let dests = db
        .get_subscription_destinations("nobody", RoomKind::Stream)
        .await
        .unwrap();
    assert!(dests.is_empty());
}
