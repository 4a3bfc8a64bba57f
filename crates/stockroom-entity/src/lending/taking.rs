//! Taking record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{GroupId, ItemId, TakingRecordId, UserId};

/// An irreversible consumption of a Low-tier item.
///
/// Audit-only: created atomically with a stock debit, never updated or
/// deleted, and has no corresponding return.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TakingRecord {
    /// Unique record identifier.
    pub id: TakingRecordId,
    /// User who took the item.
    pub user_id: UserId,
    /// Group the item was taken from.
    pub group_id: GroupId,
    /// Consumed item.
    pub item_id: ItemId,
    /// Number of units consumed.
    pub quantity: i32,
    /// When the taking happened.
    pub taken_at: DateTime<Utc>,
}

/// Data required to record a taking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaking {
    /// User taking the item.
    pub user_id: UserId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// Consumed item.
    pub item_id: ItemId,
    /// Number of units consumed.
    pub quantity: i32,
}
