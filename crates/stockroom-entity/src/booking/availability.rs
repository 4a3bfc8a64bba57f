//! Availability slot entity model.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{AvailabilityId, UserId};

/// A reviewer-managed pickup window that bookings are scheduled against.
///
/// Unique per `(slot_date, start_time, location)`; attempting to create a
/// duplicate is a conflict.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailabilitySlot {
    /// Unique slot identifier.
    pub id: AvailabilityId,
    /// Calendar date of the window.
    pub slot_date: NaiveDate,
    /// Start of the window.
    pub start_time: NaiveTime,
    /// End of the window.
    pub end_time: NaiveTime,
    /// Where the pickup takes place.
    pub location: String,
    /// Reviewer who published the slot.
    pub created_by: UserId,
    /// When the slot was published.
    pub created_at: DateTime<Utc>,
}

impl AvailabilitySlot {
    /// The pickup instant for bookings scheduled against this slot:
    /// the slot date combined with its start time.
    pub fn pickup_datetime(&self) -> DateTime<Utc> {
        self.slot_date.and_time(self.start_time).and_utc()
    }
}

/// Data required to publish an availability slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailability {
    /// Calendar date of the window.
    pub slot_date: NaiveDate,
    /// Start of the window.
    pub start_time: NaiveTime,
    /// End of the window.
    pub end_time: NaiveTime,
    /// Where the pickup takes place.
    pub location: String,
    /// Reviewer publishing the slot.
    pub created_by: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pickup_datetime() {
        let slot = AvailabilitySlot {
            id: AvailabilityId::new(),
            slot_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            location: "Front desk".to_string(),
            created_by: UserId::new(),
            created_at: Utc::now(),
        };
        assert_eq!(
            slot.pickup_datetime().to_rfc3339(),
            "2025-06-02T14:30:00+00:00"
        );
    }
}
