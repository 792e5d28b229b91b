//! Item repository.

use std::sync::Arc;

use crate::entities::{Item, item};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use tally_common::{AppError, AppResult};

/// Item repository for database operations.
#[derive(Clone)]
pub struct ItemRepository {
    db: Arc<DatabaseConnection>,
}

impl ItemRepository {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The underlying connection, for callers that need to open a transaction.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find an item by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<item::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find an item by ID on the given connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<item::Model>> {
        Item::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an item by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<item::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(id.to_string()))
    }

    /// Find items by IDs. Order of the result is unspecified.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<item::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Item::find()
            .filter(item::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new item.
    pub async fn create(&self, model: item::ActiveModel) -> AppResult<item::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a signed delta to an item's score atomically (single UPDATE query, no fetch).
    ///
    /// Returns [`AppError::ItemNotFound`] when no row was updated.
    pub async fn apply_score_delta_in<C: ConnectionTrait>(
        conn: &C,
        item_id: &str,
        delta: i64,
    ) -> AppResult<()> {
        let result = Item::update_many()
            .col_expr(item::Column::Score, Expr::col(item::Column::Score).add(delta))
            .filter(item::Column::Id.eq(item_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::ItemNotFound(item_id.to_string()));
        }
        Ok(())
    }
}
