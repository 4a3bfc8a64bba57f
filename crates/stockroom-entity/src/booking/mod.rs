//! Booking entities: scheduled pickup/return windows for approved requests.

pub mod availability;
pub mod model;
pub mod status;

pub use availability::{AvailabilitySlot, CreateAvailability};
pub use model::{Booking, CreateBooking};
pub use status::BookingStatus;

/// Fixed loan period applied to every booking, in days.
///
/// The source system applies seven days regardless of item or policy
/// configuration; kept as a named constant rather than a parameter.
pub const LOAN_PERIOD_DAYS: i64 = 7;

/// How long after creation a booking can still be confirmed, in hours.
pub const CONFIRMATION_WINDOW_HOURS: i64 = 48;
