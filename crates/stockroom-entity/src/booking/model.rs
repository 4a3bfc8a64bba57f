//! Booking entity model and transition guards.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::error::AppError;
use stockroom_core::result::AppResult;
use stockroom_core::types::id::{AvailabilityId, BookingId, GroupId, ItemId, UserId};

use super::status::BookingStatus;
use super::CONFIRMATION_WINDOW_HOURS;

/// A scheduled pickup/return window, created only when a High-tier
/// borrow request is approved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// User the booking is for.
    pub requester_id: UserId,
    /// Reviewer who approved the underlying request.
    pub manager_id: UserId,
    /// Booked item.
    pub item_id: ItemId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Availability slot the pickup is scheduled against.
    pub availability_id: AvailabilityId,
    /// Pickup instant: slot date + slot start time.
    pub pickup_at: DateTime<Utc>,
    /// Where the pickup takes place.
    pub pickup_location: String,
    /// Return instant: pickup + the fixed loan period.
    pub return_at: DateTime<Utc>,
    /// Where the return takes place.
    pub return_location: String,
    /// Current lifecycle state.
    pub status: BookingStatus,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
    /// When the booking was confirmed (None = not confirmed).
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Who confirmed the booking.
    pub confirmed_by: Option<UserId>,
}

impl Booking {
    /// Validate a confirmation attempt.
    ///
    /// The four checks are independent failures with distinct messages
    /// (ownership, status, expired window, past pickup); any one failing
    /// blocks the transition. Callers re-run this under the booking row
    /// lock before persisting.
    pub fn confirm_guard(&self, actor: UserId, now: DateTime<Utc>) -> AppResult<()> {
        if actor != self.requester_id {
            return Err(AppError::authorization(
                "Only the requester can confirm this booking",
            ));
        }
        if self.status != BookingStatus::PendingConfirmation {
            return Err(AppError::validation(format!(
                "Booking is not awaiting confirmation (status: {})",
                self.status
            )));
        }
        if now > self.created_at + Duration::hours(CONFIRMATION_WINDOW_HOURS) {
            return Err(AppError::validation(format!(
                "Confirmation window of {CONFIRMATION_WINDOW_HOURS} hours has expired"
            )));
        }
        if now > self.pickup_at {
            return Err(AppError::validation(
                "Pickup date has already passed",
            ));
        }
        Ok(())
    }

    /// Validate a cancellation attempt.
    ///
    /// A booking-manager override (`can_manage_all`) is unconditional and
    /// works even after the pickup date. The requester can cancel their own
    /// booking before pickup. Cancelling an already-cancelled booking
    /// succeeds, re-applying the same status.
    pub fn cancel_guard(
        &self,
        actor: UserId,
        now: DateTime<Utc>,
        can_manage_all: bool,
    ) -> AppResult<()> {
        if can_manage_all {
            return Ok(());
        }
        if actor != self.requester_id {
            return Err(AppError::authorization(
                "Only the requester can cancel this booking",
            ));
        }
        if self.status == BookingStatus::Cancelled {
            return Ok(());
        }
        if now >= self.pickup_at {
            return Err(AppError::validation(
                "Bookings cannot be cancelled after the pickup date",
            ));
        }
        Ok(())
    }
}

/// Data required to materialize a booking from an approved request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBooking {
    /// User the booking is for.
    pub requester_id: UserId,
    /// Approving reviewer.
    pub manager_id: UserId,
    /// Booked item.
    pub item_id: ItemId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Availability slot the pickup is scheduled against.
    pub availability_id: AvailabilityId,
    /// Pickup instant.
    pub pickup_at: DateTime<Utc>,
    /// Pickup location.
    pub pickup_location: String,
    /// Return instant.
    pub return_at: DateTime<Utc>,
    /// Return location.
    pub return_location: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockroom_core::error::ErrorKind;

    fn sample(status: BookingStatus) -> Booking {
        let created_at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        Booking {
            id: BookingId::new(),
            requester_id: UserId::new(),
            manager_id: UserId::new(),
            item_id: ItemId::new(),
            group_id: GroupId::new(),
            availability_id: AvailabilityId::new(),
            pickup_at: created_at + Duration::days(5),
            pickup_location: "Front desk".to_string(),
            return_at: created_at + Duration::days(12),
            return_location: "Front desk".to_string(),
            status,
            created_at,
            confirmed_at: None,
            confirmed_by: None,
        }
    }

    #[test]
    fn test_confirm_within_window() {
        let b = sample(BookingStatus::PendingConfirmation);
        let almost_expired = b.created_at + Duration::hours(47) + Duration::minutes(59);
        assert!(b.confirm_guard(b.requester_id, almost_expired).is_ok());
    }

    #[test]
    fn test_confirm_rejects_other_actor() {
        let b = sample(BookingStatus::PendingConfirmation);
        let err = b
            .confirm_guard(UserId::new(), b.created_at + Duration::hours(1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[test]
    fn test_confirm_rejects_expired_window() {
        let b = sample(BookingStatus::PendingConfirmation);
        let err = b
            .confirm_guard(b.requester_id, b.created_at + Duration::hours(49))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("window"));
    }

    #[test]
    fn test_confirm_rejects_past_pickup() {
        let mut b = sample(BookingStatus::PendingConfirmation);
        // Pickup inside the confirmation window so the pickup check fires.
        b.pickup_at = b.created_at + Duration::hours(24);
        let err = b
            .confirm_guard(b.requester_id, b.created_at + Duration::hours(30))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("Pickup"));
    }

    #[test]
    fn test_confirm_rejects_wrong_status() {
        for status in [BookingStatus::Confirmed, BookingStatus::Cancelled] {
            let b = sample(status);
            let err = b
                .confirm_guard(b.requester_id, b.created_at + Duration::hours(1))
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[test]
    fn test_cancel_by_requester_before_pickup() {
        let b = sample(BookingStatus::PendingConfirmation);
        assert!(b
            .cancel_guard(b.requester_id, b.created_at + Duration::days(1), false)
            .is_ok());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let b = sample(BookingStatus::Cancelled);
        // Even after the pickup date, re-cancelling an already-cancelled
        // booking succeeds for the requester.
        assert!(b
            .cancel_guard(b.requester_id, b.pickup_at + Duration::days(1), false)
            .is_ok());
    }

    #[test]
    fn test_cancel_rejects_requester_after_pickup() {
        let b = sample(BookingStatus::Confirmed);
        let err = b
            .cancel_guard(b.requester_id, b.pickup_at + Duration::hours(1), false)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_cancel_manager_override_after_pickup() {
        let b = sample(BookingStatus::Confirmed);
        assert!(b
            .cancel_guard(UserId::new(), b.pickup_at + Duration::days(2), true)
            .is_ok());
    }
}
