//! Borrowing repository implementation.

use sqlx::{PgConnection, PgPool, Postgres};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::{BorrowingId, ItemId, UserId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_entity::lending::{Borrowing, CreateBorrowing};

/// Repository for borrowing records.
#[derive(Debug, Clone)]
pub struct BorrowingRepository {
    pool: PgPool,
}

impl BorrowingRepository {
    /// Create a new borrowing repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a borrowing. Runs in the borrow transaction, paired with the
    /// stock debit for the same item.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        data: &CreateBorrowing,
    ) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(
            "INSERT INTO borrowings \
             (user_id, group_id, item_id, quantity, due_date, condition_before, evidence_before) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.group_id)
        .bind(data.item_id)
        .bind(data.quantity)
        .bind(data.due_date)
        .bind(&data.condition_before)
        .bind(&data.evidence_before)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert borrowing", e))
    }

    /// Fetch the caller's oldest active borrowing for an item, locked.
    ///
    /// Ownership and active status are combined in one lookup so a missing
    /// row reveals nothing about *which* condition failed.
    pub async fn find_active_for_update(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        item_id: ItemId,
    ) -> AppResult<Option<Borrowing>> {
        sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings \
             WHERE user_id = $1 AND item_id = $2 AND returned_at IS NULL \
             ORDER BY borrowed_at ASC LIMIT 1 FOR UPDATE",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to lock borrowing row", e)
        })
    }

    /// Whether *any* user currently has the item out.
    ///
    /// Generic over the executor so the same predicate serves both the
    /// lock-free status check (pool) and the borrow transaction (locked
    /// connection).
    pub async fn exists_active_for_item<'e, E>(
        &self,
        executor: E,
        item_id: ItemId,
    ) -> AppResult<bool>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE item_id = $1 AND returned_at IS NULL)",
        )
        .bind(item_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check active borrowings", e)
        })
    }

    /// Close a borrowing: set the return timestamp and after-condition.
    pub async fn close(
        &self,
        conn: &mut PgConnection,
        id: BorrowingId,
        condition_after: Option<&str>,
        evidence_after: Option<&str>,
    ) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(
            "UPDATE borrowings \
             SET returned_at = NOW(), condition_after = $2, evidence_after = $3 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(condition_after)
        .bind(evidence_after)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to close borrowing", e))
    }

    /// List a user's borrowings, newest first, with pagination.
    pub async fn find_by_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Borrowing>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrowings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count borrowings", e)
            })?;

        let rows = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE user_id = $1 \
             ORDER BY borrowed_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list borrowings", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
