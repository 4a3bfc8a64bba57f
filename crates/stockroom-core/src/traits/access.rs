//! Access oracle trait — the external authorization capability.
//!
//! The lending engine never inspects role or membership tables directly.
//! Every authorization question is delegated to an [`AccessOracle`]
//! implementation injected at service construction time, so the rule
//! evaluation engine can be swapped without touching business logic.

use std::fmt;

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::{GroupId, UserId};

/// Capabilities the lending engine asks the oracle about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Add items to a cart and submit checkouts/borrows for a group.
    RequestItems,
    /// Create, update, and remove cart lines.
    ManageCart,
    /// Read the caller's own records.
    ViewOwnData,
    /// Read any record in the system.
    ViewAllData,
    /// Read records belonging to a specific group.
    ViewGroupData,
    /// Administer groups and their members.
    ManageGroups,
    /// Review (approve or deny) borrow requests.
    ApproveRequests,
    /// Manage every booking, including after its pickup date.
    ManageAllBookings,
    /// Manage the bookings of one specific group.
    ManageGroupBookings,
}

impl Permission {
    /// Return the permission as a kebab-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestItems => "request-items",
            Self::ManageCart => "manage-cart",
            Self::ViewOwnData => "view-own-data",
            Self::ViewAllData => "view-all-data",
            Self::ViewGroupData => "view-group-data",
            Self::ManageGroups => "manage-groups",
            Self::ApproveRequests => "approve-requests",
            Self::ManageAllBookings => "manage-all-bookings",
            Self::ManageGroupBookings => "manage-group-bookings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The breadth of a permission check.
///
/// Ownership checks ("is this the caller's own row?") are done in-engine,
/// not delegated to the oracle, so there is no self scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PermissionScope {
    /// The permission applies system-wide.
    Global,
    /// The permission applies within one group.
    Group(GroupId),
}

/// Trait answering "may user U perform permission P, optionally scoped to G?".
///
/// Implementations must be cheap enough to call once per operation; the
/// engine performs the check *before* opening a transaction so no external
/// I/O happens while row locks are held.
#[async_trait]
pub trait AccessOracle: Send + Sync + 'static {
    /// Check whether the actor holds the permission at the given scope.
    ///
    /// A grant at [`PermissionScope::Global`] satisfies any scoped check
    /// for the same permission.
    async fn check(
        &self,
        actor: UserId,
        permission: Permission,
        scope: PermissionScope,
    ) -> AppResult<bool>;
}

impl fmt::Debug for dyn AccessOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dyn AccessOracle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_as_str() {
        assert_eq!(Permission::RequestItems.as_str(), "request-items");
        assert_eq!(Permission::ManageAllBookings.as_str(), "manage-all-bookings");
    }

    #[test]
    fn test_scope_equality() {
        let group = GroupId::new();
        assert_eq!(PermissionScope::Group(group), PermissionScope::Group(group));
        assert_ne!(PermissionScope::Global, PermissionScope::Group(group));
    }
}
