//! Lendable item entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{GroupId, ItemId};

use super::tier::ItemTier;

/// A physical item owned by a group and lent to its members.
///
/// `stock` is the single piece of mutable shared state contended across
/// requests. It is mutated exclusively through the inventory ledger's
/// debit/credit operations and never goes negative at any committed state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    /// Unique item identifier.
    pub id: ItemId,
    /// Group that owns this item.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Workflow tier. Immutable after creation.
    pub tier: ItemTier,
    /// Number of units currently available.
    pub stock: i32,
    /// When the item was registered.
    pub created_at: DateTime<Utc>,
    /// When the item was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Whether the item can satisfy a debit of `quantity` units.
    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }
}

/// Data required to register a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItem {
    /// Owning group.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Workflow tier.
    pub tier: ItemTier,
    /// Initial stock count.
    pub stock: i32,
}
