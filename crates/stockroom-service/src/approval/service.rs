//! Request/approval workflow service.
//!
//! High-tier items are requested, reviewed exactly once, and — on
//! approval — materialized into a booking scheduled against a published
//! availability slot. Stock is checked at review time, not at submission,
//! because it may have changed in between.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::{AvailabilityId, GroupId, ItemId, RequestId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_database::repositories::availability::AvailabilityRepository;
use stockroom_database::repositories::booking::BookingRepository;
use stockroom_database::repositories::item::ItemRepository;
use stockroom_database::repositories::request::RequestRepository;
use stockroom_entity::booking::{
    AvailabilitySlot, Booking, CreateAvailability, CreateBooking, LOAN_PERIOD_DAYS,
};
use stockroom_entity::item::ItemTier;
use stockroom_entity::request::{BorrowRequest, CreateRequest, RequestStatus};

use crate::access::require;
use crate::context::RequestContext;

/// Parameters for submitting a borrow request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequestInput {
    /// Requested item.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: i32,
}

/// The reviewer's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    /// Grant the request.
    Approved,
    /// Refuse the request.
    Denied,
}

/// Parameters for reviewing a request.
///
/// The three booking fields are mandatory when approving a High-tier
/// request: approving one without scheduling it is not a valid state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    /// The verdict.
    pub decision: ReviewDecision,
    /// Availability slot the pickup is scheduled against.
    pub availability_id: Option<AvailabilityId>,
    /// Where the pickup takes place.
    pub pickup_location: Option<String>,
    /// Where the return takes place.
    pub return_location: Option<String>,
}

/// Parameters for publishing an availability slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityInput {
    /// Calendar date of the window.
    pub slot_date: chrono::NaiveDate,
    /// Start of the window.
    pub start_time: chrono::NaiveTime,
    /// End of the window.
    pub end_time: chrono::NaiveTime,
    /// Where the pickup takes place.
    pub location: String,
}

/// Extract the booking fields, failing validation when any is missing.
fn required_booking_fields(input: &ReviewInput) -> AppResult<(AvailabilityId, String, String)> {
    match (
        input.availability_id,
        input.pickup_location.as_ref(),
        input.return_location.as_ref(),
    ) {
        (Some(slot), Some(pickup), Some(ret)) => Ok((slot, pickup.clone(), ret.clone())),
        _ => Err(AppError::validation(
            "Approving this request requires an availability slot, pickup location, and return location",
        )),
    }
}

/// Pickup and return instants for a booking scheduled against a slot.
///
/// Pickup is the slot date plus its start time; return is pickup plus the
/// fixed loan period.
fn booking_schedule(slot: &AvailabilitySlot) -> (DateTime<Utc>, DateTime<Utc>) {
    let pickup_at = slot.pickup_datetime();
    (pickup_at, pickup_at + Duration::days(LOAN_PERIOD_DAYS))
}

/// Manages borrow requests, their one-time review, and availability slots.
#[derive(Debug, Clone)]
pub struct ApprovalService {
    /// Connection pool; each review runs in one transaction from it.
    pool: PgPool,
    /// Borrow request repository.
    request_repo: Arc<RequestRepository>,
    /// Item repository (tier and stock checks).
    item_repo: Arc<ItemRepository>,
    /// Booking repository.
    booking_repo: Arc<BookingRepository>,
    /// Availability slot repository.
    availability_repo: Arc<AvailabilityRepository>,
    /// Authorization oracle.
    oracle: Arc<dyn AccessOracle>,
}

impl ApprovalService {
    /// Creates a new approval service.
    pub fn new(
        pool: PgPool,
        request_repo: Arc<RequestRepository>,
        item_repo: Arc<ItemRepository>,
        booking_repo: Arc<BookingRepository>,
        availability_repo: Arc<AvailabilityRepository>,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            pool,
            request_repo,
            item_repo,
            booking_repo,
            availability_repo,
            oracle,
        }
    }

    /// Submits a request to borrow a High-tier item.
    ///
    /// No stock check happens here: availability is decided by the
    /// reviewer, against the stock at review time.
    pub async fn submit_request(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        input: SubmitRequestInput,
    ) -> AppResult<BorrowRequest> {
        if input.quantity <= 0 {
            return Err(AppError::validation("Quantity must be positive"));
        }
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::RequestItems,
            PermissionScope::Group(group_id),
        )
        .await?;

        let item = self
            .item_repo
            .find_by_id(input.item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not found"))?;
        if item.tier != ItemTier::High {
            return Err(AppError::validation(format!(
                "Only restricted-tier items require approval; this item is {}-tier",
                item.tier
            )));
        }

        let request = self
            .request_repo
            .create(&CreateRequest {
                user_id: ctx.user_id,
                group_id,
                item_id: item.id,
                quantity: input.quantity,
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            item_id = %item.id,
            request_id = %request.id,
            "Borrow request submitted"
        );

        Ok(request)
    }

    /// Reviews a pending request. Exactly one review is permitted: a
    /// second attempt fails, whatever the first decision was.
    ///
    /// Approval re-checks stock at review time and — for High-tier
    /// items — requires the three booking fields, creating the booking
    /// and linking it to the request in the same transaction as the
    /// review outcome. An insufficient-stock approval fails whole,
    /// leaving the request pending for a later retry.
    pub async fn review(
        &self,
        ctx: &RequestContext,
        request_id: RequestId,
        input: ReviewInput,
    ) -> AppResult<BorrowRequest> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ApproveRequests,
            PermissionScope::Global,
        )
        .await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let request = self
            .request_repo
            .find_for_update(&mut tx, request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request not found"))?;
        if !request.is_pending() {
            return Err(AppError::validation(
                "Request has already been reviewed or is invalid",
            ));
        }

        let reviewed = match input.decision {
            ReviewDecision::Denied => {
                self.request_repo
                    .mark_reviewed(&mut tx, request.id, RequestStatus::Denied, ctx.user_id, None)
                    .await?
            }
            ReviewDecision::Approved => {
                let item = self
                    .item_repo
                    .find_for_update(&mut tx, request.item_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Item not found"))?;
                if !item.has_stock(request.quantity) {
                    return Err(AppError::insufficient_stock(format!(
                        "Only {} in stock, {} requested",
                        item.stock, request.quantity
                    )));
                }

                let booking_id = if item.tier == ItemTier::High {
                    let (availability_id, pickup_location, return_location) =
                        required_booking_fields(&input)?;
                    let slot = self
                        .availability_repo
                        .find_by_id(&mut tx, availability_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Availability slot not found"))?;
                    let (pickup_at, return_at) = booking_schedule(&slot);

                    let booking = self
                        .booking_repo
                        .insert(
                            &mut tx,
                            &CreateBooking {
                                requester_id: request.user_id,
                                manager_id: ctx.user_id,
                                item_id: request.item_id,
                                group_id: request.group_id,
                                availability_id,
                                pickup_at,
                                pickup_location,
                                return_at,
                                return_location,
                            },
                        )
                        .await?;
                    Some(booking.id)
                } else {
                    None
                };

                self.request_repo
                    .mark_reviewed(
                        &mut tx,
                        request.id,
                        RequestStatus::Approved,
                        ctx.user_id,
                        booking_id,
                    )
                    .await?
            }
        };

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit review", e)
        })?;

        info!(
            reviewer = %ctx.user_id,
            request_id = %request_id,
            decision = ?input.decision,
            booking_id = ?reviewed.booking_id,
            "Request reviewed"
        );

        Ok(reviewed)
    }

    /// Publishes an availability slot for future bookings.
    pub async fn create_availability(
        &self,
        ctx: &RequestContext,
        input: CreateAvailabilityInput,
    ) -> AppResult<AvailabilitySlot> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ApproveRequests,
            PermissionScope::Global,
        )
        .await?;

        if input.end_time <= input.start_time {
            return Err(AppError::validation("End time must be after start time"));
        }

        self.availability_repo
            .create(&CreateAvailability {
                slot_date: input.slot_date,
                start_time: input.start_time,
                end_time: input.end_time,
                location: input.location,
                created_by: ctx.user_id,
            })
            .await
    }

    /// Lists published availability slots, soonest first.
    pub async fn list_availabilities(
        &self,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AvailabilitySlot>> {
        self.availability_repo.find_all(page).await
    }

    /// Lists requests awaiting review, oldest first.
    pub async fn list_pending(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<BorrowRequest>> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ApproveRequests,
            PermissionScope::Global,
        )
        .await?;
        self.request_repo
            .find_by_status(RequestStatus::Pending, page)
            .await
    }

    /// Lists the caller's own requests, newest first.
    pub async fn list_own_requests(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<BorrowRequest>> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ViewOwnData,
            PermissionScope::Global,
        )
        .await?;
        self.request_repo.find_by_user(ctx.user_id, page).await
    }

    /// Fetches the booking linked to a reviewed request, if any.
    pub async fn linked_booking(&self, request: &BorrowRequest) -> AppResult<Option<Booking>> {
        match request.booking_id {
            Some(id) => self.booking_repo.find_by_id(id).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use stockroom_core::types::id::UserId;

    fn slot() -> AvailabilitySlot {
        AvailabilitySlot {
            id: AvailabilityId::new(),
            slot_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            location: "Equipment room".to_string(),
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_booking_schedule_uses_slot_start_and_loan_period() {
        let (pickup_at, return_at) = booking_schedule(&slot());
        assert_eq!(pickup_at.to_rfc3339(), "2025-09-15T10:00:00+00:00");
        assert_eq!(return_at - pickup_at, Duration::days(LOAN_PERIOD_DAYS));
    }

    #[test]
    fn test_booking_fields_all_present() {
        let input = ReviewInput {
            decision: ReviewDecision::Approved,
            availability_id: Some(AvailabilityId::new()),
            pickup_location: Some("Front desk".to_string()),
            return_location: Some("Front desk".to_string()),
        };
        assert!(required_booking_fields(&input).is_ok());
    }

    #[test]
    fn test_booking_fields_missing_any_is_validation_error() {
        let full = ReviewInput {
            decision: ReviewDecision::Approved,
            availability_id: Some(AvailabilityId::new()),
            pickup_location: Some("Front desk".to_string()),
            return_location: Some("Front desk".to_string()),
        };

        let mut missing_slot = full.clone();
        missing_slot.availability_id = None;
        let mut missing_pickup = full.clone();
        missing_pickup.pickup_location = None;
        let mut missing_return = full;
        missing_return.return_location = None;

        for input in [missing_slot, missing_pickup, missing_return] {
            let err = required_booking_fields(&input).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }
}
