//! Item repository — the inventory ledger.
//!
//! `debit`/`credit` are the only two operations that mutate `items.stock`.
//! Both run on a connection that already holds the item's row lock (via
//! [`ItemRepository::find_for_update`]), so concurrent checkouts against
//! the same item serialize instead of racing past a stale stock read.

use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::ItemId;
use stockroom_entity::item::{CreateItem, Item};

/// Repository for lendable items and their stock ledger.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    /// Create a new item repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new item.
    pub async fn create(&self, data: &CreateItem) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (group_id, name, tier, stock) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.group_id)
        .bind(&data.name)
        .bind(data.tier)
        .bind(data.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create item", e))
    }

    /// Find an item by ID (no lock).
    pub async fn find_by_id(&self, id: ItemId) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find item", e))
    }

    /// Fetch an item under an exclusive row lock.
    ///
    /// The lock is held until the enclosing transaction commits or rolls
    /// back; every mutating path acquires it before reading the stock
    /// value it is about to condition on.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: ItemId,
    ) -> AppResult<Option<Item>> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock item row", e)
            })
    }

    /// Debit stock, failing when fewer than `quantity` units remain.
    ///
    /// The `stock >= quantity` predicate in the statement keeps the
    /// non-negative invariant even if a caller skips the pre-check.
    pub async fn debit(
        &self,
        conn: &mut PgConnection,
        id: ItemId,
        quantity: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE items SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to debit stock", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::insufficient_stock(format!(
                "Insufficient stock for item {id}"
            )));
        }
        Ok(())
    }

    /// Credit stock back. Always succeeds for an existing item; the return
    /// path is validated upstream.
    pub async fn credit(
        &self,
        conn: &mut PgConnection,
        id: ItemId,
        quantity: i32,
    ) -> AppResult<()> {
        sqlx::query("UPDATE items SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to credit stock", e))?;
        Ok(())
    }
}
