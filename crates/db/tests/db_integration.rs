//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `tally_test`)
//!   `TEST_DB_PASSWORD` (default: `tally_test`)
//!   `TEST_DB_NAME` (default: `tally_test`)

#![allow(clippy::unwrap_used)]

use sea_orm::{Set, TransactionTrait};
use tally_common::AppError;
use tally_db::entities::vote;
use tally_db::repositories::{ItemRepository, VoteRepository};
use tally_db::test_utils::{TestDatabase, TestDbConfig};

fn new_vote(id: &str, user_id: &str, item_id: &str, direction: vote::Direction) -> vote::ActiveModel {
    vote::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        item_id: Set(item_id.to_string()),
        direction: Set(direction),
        active: Set(true),
        version: Set(0),
        created_at: Set(chrono::Utc::now().fixed_offset()),
        updated_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_and_score_commit_together() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    let txn = db.conn.begin().await.unwrap();
    VoteRepository::create_in(&txn, new_vote("v1", "user1", "item1", vote::Direction::Down))
        .await
        .unwrap();
    ItemRepository::apply_score_delta_in(&txn, "item1", -1)
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let items = ItemRepository::new(db.connection());
    let votes = VoteRepository::new(db.connection());
    assert_eq!(items.get_by_id("item1").await.unwrap().score, -1);
    assert_eq!(votes.sum_contributions("item1").await.unwrap(), -1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_rolled_back_transaction_leaves_no_trace() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    {
        let txn = db.conn.begin().await.unwrap();
        VoteRepository::create_in(&txn, new_vote("v1", "user1", "item1", vote::Direction::Up))
            .await
            .unwrap();
        ItemRepository::apply_score_delta_in(&txn, "item1", 1)
            .await
            .unwrap();
        // Dropped without commit
    }

    let items = ItemRepository::new(db.connection());
    let votes = VoteRepository::new(db.connection());
    assert_eq!(items.get_by_id("item1").await.unwrap().score, 0);
    assert!(
        votes
            .find_by_user_and_item("user1", "item1")
            .await
            .unwrap()
            .is_none()
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_vote_is_conflict() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    let conn = db.connection();
    VoteRepository::create_in(conn.as_ref(), new_vote("v1", "user1", "item1", vote::Direction::Up))
        .await
        .unwrap();
    let result = VoteRepository::create_in(
        conn.as_ref(),
        new_vote("v2", "user1", "item1", vote::Direction::Down),
    )
    .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_stale_save_is_conflict() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    let conn = db.connection();
    let original = VoteRepository::create_in(
        conn.as_ref(),
        new_vote("v1", "user1", "item1", vote::Direction::Up),
    )
    .await
    .unwrap();

    let saved = VoteRepository::save_in(conn.as_ref(), &original, vote::Direction::Up, false)
        .await
        .unwrap();
    assert_eq!(saved.version, 1);

    // Saving again from the stale copy must not overwrite the newer state.
    let stale = VoteRepository::save_in(conn.as_ref(), &original, vote::Direction::Down, true).await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testdb"));
}
