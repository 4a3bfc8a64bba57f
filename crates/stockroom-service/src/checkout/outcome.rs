//! Checkout inputs and aggregated per-line outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::ErrorKind;
use stockroom_core::types::id::ItemId;
use stockroom_entity::lending::{Borrowing, TakingRecord};
use stockroom_entity::request::BorrowRequest;

/// Caller-supplied parameters applied to the borrowable lines of a checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutInput {
    /// Due date for Medium-tier lines. Required when the cart contains any.
    pub due_date: Option<DateTime<Utc>>,
    /// Condition noted at checkout for Medium-tier lines.
    pub condition_before: Option<String>,
    /// Photo or document reference for the checkout condition.
    pub evidence_before: Option<String>,
}

/// One cart line that could not be processed.
///
/// Recorded, not thrown: a failed line never aborts the surrounding
/// checkout or rolls back its successful siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineError {
    /// The item the line referred to.
    pub item_id: ItemId,
    /// The quantity the line asked for.
    pub quantity: i32,
    /// Stable machine-readable failure kind.
    pub kind: ErrorKind,
    /// Human-readable failure message.
    pub message: String,
}

/// Aggregated result of one checkout invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSummary {
    /// Low-tier lines consumed directly.
    pub processed: Vec<TakingRecord>,
    /// Medium-tier lines checked out as borrowings.
    pub borrowed: Vec<Borrowing>,
    /// High-tier lines converted to pending approval requests.
    pub requested: Vec<BorrowRequest>,
    /// Lines that failed, in input order.
    pub errors: Vec<CheckoutLineError>,
}
