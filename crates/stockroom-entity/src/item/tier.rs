//! Item tier enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of an item determining its checkout workflow.
///
/// The tier is immutable for the lifetime of an item and drives three
/// structurally different code paths: Low-tier items are consumed
/// directly, Medium-tier items are borrowed against a due date, and
/// High-tier items are gated behind a one-time approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemTier {
    /// Consumable; taken directly at checkout with an audit record only.
    Low,
    /// Borrowable; checked out with a due date and returned later.
    Medium,
    /// Restricted; requires reviewer approval and a scheduled booking.
    High,
}

impl ItemTier {
    /// Whether checkout of this tier debits stock immediately.
    ///
    /// High-tier items are *requested* at checkout, not taken, so their
    /// stock is only debited once an approved request is borrowed.
    pub fn debits_at_checkout(&self) -> bool {
        matches!(self, Self::Low | Self::Medium)
    }

    /// Whether items of this tier can be borrowed at all.
    pub fn is_borrowable(&self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }

    /// Return the tier as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ItemTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemTier {
    type Err = stockroom_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(stockroom_core::AppError::validation(format!(
                "Invalid item tier: '{s}'. Expected one of: low, medium, high"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("low".parse::<ItemTier>().unwrap(), ItemTier::Low);
        assert_eq!("HIGH".parse::<ItemTier>().unwrap(), ItemTier::High);
        assert!("restricted".parse::<ItemTier>().is_err());
    }

    #[test]
    fn test_debits_at_checkout() {
        assert!(ItemTier::Low.debits_at_checkout());
        assert!(ItemTier::Medium.debits_at_checkout());
        assert!(!ItemTier::High.debits_at_checkout());
    }

    #[test]
    fn test_is_borrowable() {
        assert!(!ItemTier::Low.is_borrowable());
        assert!(ItemTier::Medium.is_borrowable());
        assert!(ItemTier::High.is_borrowable());
    }
}
