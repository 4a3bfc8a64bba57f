//! Booking status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a booking.
///
/// Transitions: `PendingConfirmation` → {`Confirmed`, `Cancelled`};
/// `Confirmed` → {`Cancelled`}. There is no transition out of `Cancelled`,
/// though re-cancelling is permitted as an idempotent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created on approval; awaiting confirmation by the requester.
    PendingConfirmation,
    /// Confirmed by the requester within the confirmation window.
    Confirmed,
    /// Cancelled by the requester or a booking manager.
    Cancelled,
}

impl BookingStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
