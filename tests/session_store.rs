//! Session store integration tests on in-memory SQLite.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use embercoach::classifier::classify;
use embercoach::db;
use embercoach::error::CoachError;
use embercoach::session::{SessionStore, StoredMessage};

async fn test_store() -> (SessionStore, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create in-memory sqlite");
    db::init_schema(&pool).await.expect("bootstrap schema");
    (SessionStore::new(pool.clone()), pool)
}

#[tokio::test]
async fn messages_round_trip_in_insertion_order() {
    let (store, _pool) = test_store().await;
    let session = store.create_session("user-1").await.unwrap();

    let texts = ["first", "second", "third", "fourth", "fifth"];
    for (i, text) in texts.iter().enumerate() {
        let class = classify(text);
        let message =
            StoredMessage::new(&session.id, "user-1", text, i % 2 == 0, &class, None);
        store.append_message(&message).await.unwrap();
    }

    let listed = store.list_messages(&session.id).await.unwrap();
    assert_eq!(listed.len(), texts.len());
    for (message, expected) in listed.iter().zip(texts) {
        assert_eq!(message.text, expected);
    }
    // created_at never decreases across the listing.
    assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn at_most_one_open_session_per_user() {
    let (store, _pool) = test_store().await;

    let first = store.create_session("user-1").await.unwrap();
    // A second create while the first is open lands on the same session
    // instead of forking history.
    let second = store.create_session("user-1").await.unwrap();
    assert_eq!(first.id, second.id);

    store.end_session(&first.id, None).await.unwrap();
    let third = store.create_session("user-1").await.unwrap();
    assert_ne!(first.id, third.id);
}

#[tokio::test]
async fn find_open_session_ignores_closed_ones() {
    let (store, _pool) = test_store().await;
    let session = store.create_session("user-1").await.unwrap();

    let open = store.find_open_session("user-1").await.unwrap();
    assert_eq!(open.map(|s| s.id), Some(session.id.clone()));

    store.end_session(&session.id, Some(4)).await.unwrap();
    assert!(store.find_open_session("user-1").await.unwrap().is_none());

    let closed = store.get_session(&session.id).await.unwrap().unwrap();
    assert!(closed.ended_at.is_some());
    assert_eq!(closed.helpfulness_rating, Some(4));
}

#[tokio::test]
async fn ending_twice_is_a_noop_error() {
    let (store, _pool) = test_store().await;
    let session = store.create_session("user-1").await.unwrap();

    store.end_session(&session.id, Some(5)).await.unwrap();
    let first_end = store.get_session(&session.id).await.unwrap().unwrap().ended_at;

    let again = store.end_session(&session.id, Some(1)).await;
    assert!(matches!(again, Err(CoachError::SessionAlreadyEnded(_))));

    // The original end time and rating are untouched.
    let after = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(after.ended_at, first_end);
    assert_eq!(after.helpfulness_rating, Some(5));
}

#[tokio::test]
async fn ending_a_missing_session_reports_not_found() {
    let (store, _pool) = test_store().await;
    let result = store.end_session("no-such-session", None).await;
    assert!(matches!(result, Err(CoachError::SessionNotFound(_))));
}

#[tokio::test]
async fn topics_union_without_duplicates() {
    let (store, _pool) = test_store().await;
    let session = store.create_session("user-1").await.unwrap();

    store
        .merge_topics(&session.id, &["cravings".to_string(), "sleep".to_string()])
        .await
        .unwrap();
    store
        .merge_topics(&session.id, &["sleep".to_string(), "stress".to_string()])
        .await
        .unwrap();

    let session = store.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(session.topics_discussed, vec!["cravings", "sleep", "stress"]);
}

#[tokio::test]
async fn intervention_flag_persists() {
    let (store, _pool) = test_store().await;
    let session = store.create_session("user-1").await.unwrap();
    assert!(!session.intervention_triggered);

    store.set_intervention(&session.id).await.unwrap();
    let session = store.get_session(&session.id).await.unwrap().unwrap();
    assert!(session.intervention_triggered);
}
