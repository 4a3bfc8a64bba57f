//! Taking record repository implementation.

use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::UserId;
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_entity::lending::{CreateTaking, TakingRecord};

/// Repository for append-only taking records.
#[derive(Debug, Clone)]
pub struct TakingRepository {
    pool: PgPool,
}

impl TakingRepository {
    /// Create a new taking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a taking record. Runs in the checkout transaction, paired
    /// with the stock debit for the same line.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        data: &CreateTaking,
    ) -> AppResult<TakingRecord> {
        sqlx::query_as::<_, TakingRecord>(
            "INSERT INTO taking_records (user_id, group_id, item_id, quantity) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.group_id)
        .bind(data.item_id)
        .bind(data.quantity)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert taking record", e)
        })
    }

    /// List a user's taking history with pagination.
    pub async fn find_by_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<TakingRecord>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM taking_records WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count takings", e)
                })?;

        let records = sqlx::query_as::<_, TakingRecord>(
            "SELECT * FROM taking_records WHERE user_id = $1 \
             ORDER BY taken_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list takings", e))?;

        Ok(PageResponse::new(
            records,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
