//! Borrow request repository implementation.

use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::{BookingId, ItemId, RequestId, UserId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_entity::request::{BorrowRequest, CreateRequest, RequestStatus};

/// Repository for High-tier borrow requests.
#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    /// Create a new request repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Submit a new pending request.
    pub async fn create(&self, data: &CreateRequest) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            "INSERT INTO borrow_requests (user_id, group_id, item_id, quantity) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.group_id)
        .bind(data.item_id)
        .bind(data.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create request", e))
    }

    /// Submit a new pending request inside an open transaction.
    ///
    /// Used by checkout so High-tier lines commit together with the rest
    /// of the cart.
    pub async fn create_in_tx(
        &self,
        conn: &mut PgConnection,
        data: &CreateRequest,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            "INSERT INTO borrow_requests (user_id, group_id, item_id, quantity) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.group_id)
        .bind(data.item_id)
        .bind(data.quantity)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create request", e))
    }

    /// Fetch a request under an exclusive row lock.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: RequestId,
    ) -> AppResult<Option<BorrowRequest>> {
        sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock request row", e))
    }

    /// The caller's oldest approved, not-yet-fulfilled request for an
    /// item, locked so a concurrent borrow cannot consume it twice.
    pub async fn find_approved_unfulfilled(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        item_id: ItemId,
    ) -> AppResult<Option<BorrowRequest>> {
        sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests \
             WHERE user_id = $1 AND item_id = $2 \
               AND status = 'approved' AND fulfilled = FALSE \
             ORDER BY reviewed_at ASC LIMIT 1 FOR UPDATE",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find approved request", e)
        })
    }

    /// Mark an approved request as consumed by a borrow.
    pub async fn mark_fulfilled(&self, conn: &mut PgConnection, id: RequestId) -> AppResult<()> {
        sqlx::query("UPDATE borrow_requests SET fulfilled = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to mark request fulfilled", e)
            })?;
        Ok(())
    }

    /// Persist the review outcome: status, reviewer, review time, and the
    /// materialized booking link (approvals only).
    pub async fn mark_reviewed(
        &self,
        conn: &mut PgConnection,
        id: RequestId,
        status: RequestStatus,
        reviewer: UserId,
        booking_id: Option<BookingId>,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            "UPDATE borrow_requests \
             SET status = $2, reviewed_by = $3, reviewed_at = NOW(), booking_id = $4 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(reviewer)
        .bind(booking_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record review", e))
    }

    /// List requests in a given status, oldest first, with pagination.
    pub async fn find_by_status(
        &self,
        status: RequestStatus,
        page: &PageRequest,
    ) -> AppResult<PageResponse<BorrowRequest>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrow_requests WHERE status = $1")
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count requests", e)
                })?;

        let rows = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE status = $1 \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list requests", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// List a user's own requests, newest first, with pagination.
    pub async fn find_by_user(
        &self,
        user_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<BorrowRequest>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrow_requests WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count requests", e)
                })?;

        let rows = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list requests", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
