use super::setup_db;
use crate::types::Destination;

const URL: &str = "https://www.youtube.com/watch?v=abcd";

#[tokio::test]
async fn test_add_completion_is_idempotent() {
    let (db, _temp) = setup_db().await;
    let dest = Destination::new(1, 10);

    assert!(db.add_completion(dest, URL).await.unwrap());
    assert!(!db.add_completion(dest, URL).await.unwrap());

    assert_eq!(db.get_completions(URL).await.unwrap(), vec![dest]);
}

#[tokio::test]
async fn test_many_destinations_per_url() {
    let (db, _temp) = setup_db().await;
    let first = Destination::new(1, 10);
    let second = Destination::new(2, 20);
    let same_guild = Destination::new(1, 11);

    db.add_completion(first, URL).await.unwrap();
    db.add_completion(second, URL).await.unwrap();
    db.add_completion(same_guild, URL).await.unwrap();
    db.add_completion(first, "https://other.example/x")
        .await
        .unwrap();

    let dests = db.get_completions(URL).await.unwrap();
    assert_eq!(dests, vec![first, second, same_guild]);
}

#[tokio::test]
async fn test_delete_single_completion() {
    let (db, _temp) = setup_db().await;
    let first = Destination::new(1, 10);
    let second = Destination::new(2, 20);

    db.add_completion(first, URL).await.unwrap();
    db.add_completion(second, URL).await.unwrap();

    assert!(db.delete_completion(first, URL).await.unwrap());
    assert!(!db.delete_completion(first, URL).await.unwrap());
    assert_eq!(db.get_completions(URL).await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_delete_completions_for_url_leaves_other_urls() {
    let (db, _temp) = setup_db().await;
    let dest = Destination::new(1, 10);

    db.add_completion(dest, URL).await.unwrap();
    db.add_completion(Destination::new(2, 20), URL).await.unwrap();
    db.add_completion(dest, "https://other.example/x")
        .await
        .unwrap();

    assert_eq!(db.delete_completions(URL).await.unwrap(), 2);
    assert!(db.get_completions(URL).await.unwrap().is_empty());
    assert_eq!(
        db.get_completions("https://other.example/x")
            .await
            .unwrap()
            .len(),
        1
    );
}
