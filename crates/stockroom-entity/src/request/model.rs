//! Borrow request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{BookingId, GroupId, ItemId, RequestId, UserId};

use super::status::RequestStatus;

/// A pending ask to borrow a High-tier item, subject to one-time review.
///
/// `fulfilled` flips when the approved request is consumed by an actual
/// borrow; an approved request can be used at most once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Requesting user.
    pub user_id: UserId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Requested item.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: i32,
    /// Review status.
    pub status: RequestStatus,
    /// Whether an approved request has been consumed by a borrow.
    pub fulfilled: bool,
    /// Reviewer who decided the request.
    pub reviewed_by: Option<UserId>,
    /// When the review happened.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Booking materialized on approval, if any.
    pub booking_id: Option<BookingId>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
}

impl BorrowRequest {
    /// Whether the request is still awaiting review.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }
}

/// Data required to submit a borrow request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Requesting user.
    pub user_id: UserId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Requested item.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: i32,
}
