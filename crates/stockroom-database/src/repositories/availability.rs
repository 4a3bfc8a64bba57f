//! Availability slot repository implementation.

use sqlx::{PgConnection, PgPool};

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::types::id::AvailabilityId;
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_entity::booking::{AvailabilitySlot, CreateAvailability};

/// Repository for reviewer-managed availability slots.
#[derive(Debug, Clone)]
pub struct AvailabilityRepository {
    pool: PgPool,
}

impl AvailabilityRepository {
    /// Create a new availability repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Publish a new availability slot.
    ///
    /// The `(slot_date, start_time, location)` unique index turns
    /// duplicates into a conflict rather than a second identical slot.
    pub async fn create(&self, data: &CreateAvailability) -> AppResult<AvailabilitySlot> {
        sqlx::query_as::<_, AvailabilitySlot>(
            "INSERT INTO availability_slots (slot_date, start_time, end_time, location, created_by) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.slot_date)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(&data.location)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::conflict(
                        "An availability slot for this date, time, and location already exists",
                    );
                }
            }
            AppError::with_source(ErrorKind::Database, "Failed to create availability slot", e)
        })
    }

    /// Fetch a slot inside an open transaction.
    ///
    /// Review resolves the slot on the same connection that holds the
    /// request and item locks, so the whole approval reads one snapshot.
    pub async fn find_by_id(
        &self,
        conn: &mut PgConnection,
        id: AvailabilityId,
    ) -> AppResult<Option<AvailabilitySlot>> {
        sqlx::query_as::<_, AvailabilitySlot>("SELECT * FROM availability_slots WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find availability slot", e)
            })
    }

    /// List slots, soonest first, with pagination.
    pub async fn find_all(&self, page: &PageRequest) -> AppResult<PageResponse<AvailabilitySlot>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM availability_slots")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count availability slots", e)
            })?;

        let rows = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT * FROM availability_slots \
             ORDER BY slot_date ASC, start_time ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list availability slots", e)
        })?;

        Ok(PageResponse::new(
            rows,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
