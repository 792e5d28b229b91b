//! End-to-end tests against PostgreSQL.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test app_integration -- --ignored`
//!
//! Connection settings come from the `TEST_DB_*` environment variables, see
//! `tally_db::test_utils`.

#![allow(clippy::unwrap_used)]

use tally_common::Config;
use tally_common::config::{DatabaseConfig, LoggingConfig, RecommenderConfig};
use tally_db::test_utils::TestDatabase;
use tally_runtime::App;

fn config(url: String) -> Config {
    Config {
        database: DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
        },
        redis: None,
        recommender: RecommenderConfig {
            enabled: false,
            ..Default::default()
        },
        logging: LoggingConfig::default(),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_sequence_keeps_score_consistent() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    let app = App::with_connection(&config(db.config.database_url()), db.connection())
        .await
        .unwrap();

    let mut scores = vec![];
    for press in ["upvote", "upvote", "downvote", "upvote"] {
        let outcome = app
            .votes
            .apply_direction("item1", "user1", press.parse().unwrap())
            .await
            .unwrap();
        scores.push(outcome.item.score);
    }
    assert_eq!(scores, vec![1, 0, -1, 1]);

    let vote = app.votes.get_vote("user1", "item1").await.unwrap();
    assert!(vote.active);
    assert_eq!(vote.version, 3);
    assert!(app.votes.recount_score("item1").await.unwrap().is_consistent());

    app.shutdown().await;
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_first_votes_all_count() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    db.seed_item("item1", "author1").await.unwrap();

    let app = App::with_connection(&config(db.config.database_url()), db.connection())
        .await
        .unwrap();

    let presses = (0..20).map(|i| {
        let votes = app.votes.clone();
        tokio::spawn(async move { votes.upvote("item1", &format!("user{i}")).await })
    });
    for press in presses.collect::<Vec<_>>() {
        press.await.unwrap().unwrap();
    }

    let audit = app.votes.recount_score("item1").await.unwrap();
    assert_eq!(audit.stored, 20);
    assert!(audit.is_consistent());

    app.shutdown().await;
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_bootstrap_runs_migrations() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");

    let app = App::bootstrap(&config(db.config.database_url())).await.unwrap();
    db.seed_item("item1", "author1").await.unwrap();

    let outcome = app.votes.downvote("item1", "user1").await.unwrap();
    assert_eq!(outcome.item.score, -1);

    app.shutdown().await;
    db.drop_database().await.unwrap();
}
