//! Cart line entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use stockroom_core::types::id::{CartLineId, GroupId, ItemId, UserId};

/// A staged (item, quantity) pair awaiting checkout.
///
/// Unique per `(group, user, item)`; re-adding the same item increments
/// the quantity. Cart lines never survive a checkout attempt — the cart
/// is cleared regardless of per-line outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartLine {
    /// Unique cart line identifier.
    pub id: CartLineId,
    /// Group the checkout will target.
    pub group_id: GroupId,
    /// User staging the line.
    pub user_id: UserId,
    /// Desired item.
    pub item_id: ItemId,
    /// Desired quantity. Always positive.
    pub quantity: i32,
    /// When the line was first added.
    pub created_at: DateTime<Utc>,
    /// When the line was last modified.
    pub updated_at: DateTime<Utc>,
}
