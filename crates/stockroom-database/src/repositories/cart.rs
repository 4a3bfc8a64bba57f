//! Cart line repository implementation.

use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::{CartLineId, GroupId, ItemId, UserId};
use stockroom_entity::cart::CartLine;

/// Repository for cart lines.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a cart line, or increment the quantity of an existing one.
    pub async fn upsert_line(
        &self,
        user_id: UserId,
        group_id: GroupId,
        item_id: ItemId,
        quantity: i32,
    ) -> AppResult<CartLine> {
        sqlx::query_as::<_, CartLine>(
            "INSERT INTO cart_lines (group_id, user_id, item_id, quantity) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (group_id, user_id, item_id) \
             DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity, \
                           updated_at = NOW() \
             RETURNING *",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert cart line", e))
    }

    /// Find a cart line by ID.
    pub async fn find_by_id(&self, id: CartLineId) -> AppResult<Option<CartLine>> {
        sqlx::query_as::<_, CartLine>("SELECT * FROM cart_lines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find cart line", e))
    }

    /// Overwrite the quantity of a cart line.
    pub async fn set_quantity(&self, id: CartLineId, quantity: i32) -> AppResult<CartLine> {
        sqlx::query_as::<_, CartLine>(
            "UPDATE cart_lines SET quantity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update cart line", e))
    }

    /// Delete a cart line. Returns `true` if a row was removed.
    pub async fn delete(&self, id: CartLineId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete cart line", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// All lines a user has staged for one group, in insertion order.
    pub async fn find_by_user_and_group(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> AppResult<Vec<CartLine>> {
        sqlx::query_as::<_, CartLine>(
            "SELECT * FROM cart_lines WHERE user_id = $1 AND group_id = $2 \
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list cart lines", e))
    }

    /// Remove every line a user has staged for one group.
    ///
    /// Runs inside the checkout transaction so the clear commits (or rolls
    /// back) together with the line outcomes.
    pub async fn clear(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        group_id: GroupId,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear cart", e))?;
        Ok(result.rows_affected())
    }
}
