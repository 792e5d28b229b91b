//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, sea_query::Expr,
};
use tally_common::{AppError, AppResult};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a vote by user and item.
    pub async fn find_by_user_and_item(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Self::find_by_user_and_item_in(self.db.as_ref(), user_id, item_id).await
    }

    /// Find a vote by user and item on the given connection or transaction.
    pub async fn find_by_user_and_item_in<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        item_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::ItemId.eq(item_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new vote.
    ///
    /// A unique-index violation on (user_id, item_id) means another writer
    /// created the vote first and is reported as [`AppError::Conflict`].
    pub async fn create_in<C: ConnectionTrait>(
        conn: &C,
        model: vote::ActiveModel,
    ) -> AppResult<vote::Model> {
        model.insert(conn).await.map_err(map_write_error)
    }

    /// Save a vote's direction and active flag, guarded by its version.
    ///
    /// The update only matches when the stored version still equals
    /// `current.version`; otherwise the vote changed since it was read and
    /// [`AppError::Conflict`] is returned.
    pub async fn save_in<C: ConnectionTrait>(
        conn: &C,
        current: &vote::Model,
        direction: vote::Direction,
        active: bool,
    ) -> AppResult<vote::Model> {
        let now = Utc::now().fixed_offset();

        let result = Vote::update_many()
            .col_expr(vote::Column::Direction, Expr::value(direction.as_str()))
            .col_expr(vote::Column::Active, Expr::value(active))
            .col_expr(vote::Column::Version, Expr::col(vote::Column::Version).add(1))
            .col_expr(vote::Column::UpdatedAt, Expr::value(now))
            .filter(vote::Column::Id.eq(current.id.as_str()))
            .filter(vote::Column::Version.eq(current.version))
            .exec(conn)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Vote {} was modified concurrently",
                current.id
            )));
        }

        Ok(vote::Model {
            direction,
            active,
            version: current.version + 1,
            updated_at: Some(now),
            ..current.clone()
        })
    }

    /// Get votes cast by a user, newest first (paginated).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote::Model>> {
        let mut query = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .order_by_desc(vote::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active votes on an item in one direction.
    pub async fn count_active(&self, item_id: &str, direction: vote::Direction) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::ItemId.eq(item_id))
            .filter(vote::Column::Active.eq(true))
            .filter(vote::Column::Direction.eq(direction.as_str()))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum of all vote contributions on an item, computed from the ledger.
    pub async fn sum_contributions(&self, item_id: &str) -> AppResult<i64> {
        let up = self.count_active(item_id, vote::Direction::Up).await?;
        let down = self.count_active(item_id, vote::Direction::Down).await?;
        Ok(up as i64 - down as i64)
    }
}

fn map_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::Conflict(format!("Vote already exists: {detail}"))
        }
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_vote(
        id: &str,
        user_id: &str,
        item_id: &str,
        direction: vote::Direction,
        active: bool,
    ) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            direction,
            active,
            version: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_user_and_item_found() {
        let vote = create_test_vote("v1", "user1", "item1", vote::Direction::Up, true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[vote.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.find_by_user_and_item("user1", "item1").await.unwrap();

        let found = result.unwrap();
        assert_eq!(found.id, "v1");
        assert_eq!(found.direction, vote::Direction::Up);
        assert!(found.active);
    }

    #[tokio::test]
    async fn test_find_by_user_and_item_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vote::Model>::new()])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.find_by_user_and_item("user1", "item2").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_returns_inserted_vote() {
        let vote = create_test_vote("v1", "user1", "item1", vote::Direction::Down, true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[vote.clone()]])
            .into_connection();

        let model = vote::ActiveModel {
            id: Set("v1".to_string()),
            user_id: Set("user1".to_string()),
            item_id: Set("item1".to_string()),
            direction: Set(vote::Direction::Down),
            active: Set(true),
            version: Set(0),
            created_at: Set(vote.created_at),
            updated_at: Set(None),
        };

        let created = VoteRepository::create_in(&db, model).await.unwrap();
        assert_eq!(created.direction, vote::Direction::Down);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let current = create_test_vote("v1", "user1", "item1", vote::Direction::Up, true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let saved = VoteRepository::save_in(&db, &current, vote::Direction::Up, false)
            .await
            .unwrap();

        assert_eq!(saved.version, 1);
        assert!(!saved.active);
        assert!(saved.updated_at.is_some());
        assert_eq!(saved.id, "v1");
    }

    #[tokio::test]
    async fn test_save_stale_version_is_conflict() {
        let current = create_test_vote("v1", "user1", "item1", vote::Direction::Up, true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = VoteRepository::save_in(&db, &current, vote::Direction::Down, true).await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("v1")),
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_find_by_user() {
        let v1 = create_test_vote("v1", "user1", "item1", vote::Direction::Up, true);
        let v2 = create_test_vote("v2", "user1", "item2", vote::Direction::Down, false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v2, v1]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.find_by_user("user1", 10, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "v2");
    }

    #[tokio::test]
    async fn test_sum_contributions() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([
                    [maplit::btreemap! {
                        "num_items" => sea_orm::Value::BigInt(Some(5))
                    }],
                    [maplit::btreemap! {
                        "num_items" => sea_orm::Value::BigInt(Some(7))
                    }],
                ])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let sum = repo.sum_contributions("item1").await.unwrap();

        assert_eq!(sum, -2);
    }
}
