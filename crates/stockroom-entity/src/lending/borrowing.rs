//! Borrowing entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{BorrowingId, GroupId, ItemId, UserId};

/// A checked-out Medium- or High-tier item with an open/returned lifecycle.
///
/// Active while `returned_at` is null. Stock is the authoritative scarcity
/// signal: multiple concurrent borrowings of the same item are permitted as
/// long as cumulative quantity fits within stock at debit time. High-tier
/// items additionally allow at most one active borrowing at a time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrowing {
    /// Unique borrowing identifier.
    pub id: BorrowingId,
    /// User holding the item.
    pub user_id: UserId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Borrowed item.
    pub item_id: ItemId,
    /// Number of units borrowed.
    pub quantity: i32,
    /// When the item is due back.
    pub due_date: DateTime<Utc>,
    /// Condition noted at checkout.
    pub condition_before: Option<String>,
    /// Photo or document reference for the checkout condition.
    pub evidence_before: Option<String>,
    /// Condition noted at return.
    pub condition_after: Option<String>,
    /// Photo or document reference for the return condition.
    pub evidence_after: Option<String>,
    /// When the borrowing was created.
    pub borrowed_at: DateTime<Utc>,
    /// When the item was returned (None = still out).
    pub returned_at: Option<DateTime<Utc>>,
}

impl Borrowing {
    /// Whether the item is still out.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Whether the borrowing is active and past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.due_date
    }
}

/// Data required to open a borrowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBorrowing {
    /// User borrowing the item.
    pub user_id: UserId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Borrowed item.
    pub item_id: ItemId,
    /// Number of units borrowed.
    pub quantity: i32,
    /// When the item is due back.
    pub due_date: DateTime<Utc>,
    /// Condition noted at checkout.
    pub condition_before: Option<String>,
    /// Photo or document reference for the checkout condition.
    pub evidence_before: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(returned: bool) -> Borrowing {
        let borrowed_at = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        Borrowing {
            id: BorrowingId::new(),
            user_id: UserId::new(),
            group_id: GroupId::new(),
            item_id: ItemId::new(),
            quantity: 1,
            due_date: borrowed_at + chrono::Duration::days(14),
            condition_before: None,
            evidence_before: None,
            condition_after: None,
            evidence_after: None,
            borrowed_at,
            returned_at: returned.then(|| borrowed_at + chrono::Duration::days(3)),
        }
    }

    #[test]
    fn test_is_active() {
        assert!(sample(false).is_active());
        assert!(!sample(true).is_active());
    }

    #[test]
    fn test_is_overdue() {
        let b = sample(false);
        assert!(!b.is_overdue(b.due_date - chrono::Duration::hours(1)));
        assert!(b.is_overdue(b.due_date + chrono::Duration::hours(1)));
        // A returned borrowing is never overdue.
        let returned = sample(true);
        assert!(!returned.is_overdue(returned.due_date + chrono::Duration::days(30)));
    }
}
