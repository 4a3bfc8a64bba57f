//! Booking state machine service.
//!
//! Governs the booking lifecycle from creation (by request approval)
//! through confirmation or cancellation. The transition guards themselves
//! are pure functions on the [`Booking`] entity; this service re-runs
//! them under the booking row lock before persisting a transition.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::{BookingId, GroupId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_database::repositories::booking::BookingRepository;
use stockroom_entity::booking::{Booking, BookingStatus};

use crate::access::require;
use crate::context::RequestContext;

/// Scope selector for booking listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BookingListFilter {
    /// Restrict the listing to one group's bookings.
    pub group_id: Option<GroupId>,
}

/// Confirms, cancels, and lists bookings.
#[derive(Debug, Clone)]
pub struct BookingService {
    /// Connection pool; each transition runs in one transaction from it.
    pool: PgPool,
    /// Booking repository.
    booking_repo: Arc<BookingRepository>,
    /// Authorization oracle.
    oracle: Arc<dyn AccessOracle>,
}

impl BookingService {
    /// Creates a new booking service.
    pub fn new(
        pool: PgPool,
        booking_repo: Arc<BookingRepository>,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            pool,
            booking_repo,
            oracle,
        }
    }

    /// Confirms a booking.
    ///
    /// Only the requester may confirm, only from PendingConfirmation, only
    /// within the confirmation window, and only before the pickup date.
    pub async fn confirm(&self, ctx: &RequestContext, booking_id: BookingId) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let booking = self
            .booking_repo
            .find_for_update(&mut tx, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking not found"))?;

        let now = Utc::now();
        booking.confirm_guard(ctx.user_id, now)?;

        let confirmed = self
            .booking_repo
            .mark_confirmed(&mut tx, booking.id, ctx.user_id, now)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit confirmation", e)
        })?;

        info!(
            user_id = %ctx.user_id,
            booking_id = %booking_id,
            "Booking confirmed"
        );

        Ok(confirmed)
    }

    /// Cancels a booking.
    ///
    /// The requester may cancel before the pickup date; a holder of the
    /// booking-manager capability may cancel unconditionally, even after
    /// pickup. Cancelling an already-cancelled booking succeeds and leaves
    /// the same state.
    pub async fn cancel(&self, ctx: &RequestContext, booking_id: BookingId) -> AppResult<Booking> {
        let can_manage_all = self
            .oracle
            .check(
                ctx.user_id,
                Permission::ManageAllBookings,
                PermissionScope::Global,
            )
            .await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let booking = self
            .booking_repo
            .find_for_update(&mut tx, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking not found"))?;

        booking.cancel_guard(ctx.user_id, Utc::now(), can_manage_all)?;

        let cancelled = self
            .booking_repo
            .mark_cancelled(&mut tx, booking.id)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit cancellation", e)
        })?;

        info!(
            user_id = %ctx.user_id,
            booking_id = %booking_id,
            was_cancelled = (booking.status == BookingStatus::Cancelled),
            "Booking cancelled"
        );

        Ok(cancelled)
    }

    /// Fetches a booking visible to the caller: its requester, or a holder
    /// of the view-all capability.
    pub async fn get_booking(
        &self,
        ctx: &RequestContext,
        booking_id: BookingId,
    ) -> AppResult<Booking> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("Booking not found"))?;

        if booking.requester_id != ctx.user_id {
            require(
                self.oracle.as_ref(),
                ctx,
                Permission::ViewAllData,
                PermissionScope::Global,
            )
            .await?;
        }

        Ok(booking)
    }

    /// Lists bookings at the caller's visibility.
    ///
    /// With a group filter, the caller needs the group-scoped booking
    /// management capability (or view-all). Without one, view-all holders
    /// see every booking and everyone else sees their own.
    pub async fn list_bookings(
        &self,
        ctx: &RequestContext,
        filter: BookingListFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Booking>> {
        if let Some(group_id) = filter.group_id {
            let can_view_all = self
                .oracle
                .check(ctx.user_id, Permission::ViewAllData, PermissionScope::Global)
                .await?;
            if !can_view_all {
                require(
                    self.oracle.as_ref(),
                    ctx,
                    Permission::ManageGroupBookings,
                    PermissionScope::Group(group_id),
                )
                .await?;
            }
            return self.booking_repo.find_by_group(group_id, page).await;
        }

        let can_view_all = self
            .oracle
            .check(ctx.user_id, Permission::ViewAllData, PermissionScope::Global)
            .await?;
        if can_view_all {
            self.booking_repo.find_all(page).await
        } else {
            self.booking_repo.find_by_requester(ctx.user_id, page).await
        }
    }
}
