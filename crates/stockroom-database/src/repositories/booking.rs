//! Booking repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::{BookingId, GroupId, UserId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_entity::booking::{Booking, CreateBooking};

/// Repository for bookings.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Materialize a booking from an approved request. Runs in the review
    /// transaction so the booking and the review outcome commit together.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        data: &CreateBooking,
    ) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings \
             (requester_id, manager_id, item_id, group_id, availability_id, \
              pickup_at, pickup_location, return_at, return_location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(data.requester_id)
        .bind(data.manager_id)
        .bind(data.item_id)
        .bind(data.group_id)
        .bind(data.availability_id)
        .bind(data.pickup_at)
        .bind(&data.pickup_location)
        .bind(data.return_at)
        .bind(&data.return_location)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create booking", e))
    }

    /// Find a booking by ID (no lock).
    pub async fn find_by_id(&self, id: BookingId) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find booking", e))
    }

    /// Fetch a booking under an exclusive row lock.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: BookingId,
    ) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to lock booking row", e)
            })
    }

    /// Transition a booking to Confirmed.
    pub async fn mark_confirmed(
        &self,
        conn: &mut PgConnection,
        id: BookingId,
        actor: UserId,
        confirmed_at: DateTime<Utc>,
    ) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings \
             SET status = 'confirmed', confirmed_at = $3, confirmed_by = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(actor)
        .bind(confirmed_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to confirm booking", e))
    }

    /// Transition a booking to Cancelled. Re-applying the status to an
    /// already-cancelled booking is a permitted no-op.
    pub async fn mark_cancelled(&self, conn: &mut PgConnection, id: BookingId) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel booking", e))
    }

    /// List a requester's bookings, newest first, with pagination.
    pub async fn find_by_requester(
        &self,
        requester_id: UserId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Booking>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE requester_id = $1")
                .bind(requester_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count bookings", e)
                })?;

        let rows = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE requester_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(requester_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list bookings", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// List one group's bookings, newest first, with pagination.
    pub async fn find_by_group(
        &self,
        group_id: GroupId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Booking>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count bookings", e)
            })?;

        let rows = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE group_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(group_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list bookings", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    /// List all bookings, newest first, with pagination.
    pub async fn find_all(&self, page: &PageRequest) -> AppResult<PageResponse<Booking>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count bookings", e)
            })?;

        let rows = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list bookings", e))?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
