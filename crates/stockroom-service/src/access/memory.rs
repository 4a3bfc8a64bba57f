//! In-memory access oracle.
//!
//! Holds an explicit grant table behind a `tokio::sync::RwLock`. Used by
//! tests and embedded deployments; production deployments inject an
//! oracle backed by the organization's rule engine instead.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::UserId;

/// An [`AccessOracle`] answering from an explicit in-memory grant table.
#[derive(Debug, Default)]
pub struct MemoryAccessOracle {
    grants: RwLock<HashSet<(UserId, Permission, PermissionScope)>>,
}

impl MemoryAccessOracle {
    /// Create an oracle with no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a permission to a user at the given scope.
    pub async fn grant(&self, user: UserId, permission: Permission, scope: PermissionScope) {
        self.grants.write().await.insert((user, permission, scope));
    }

    /// Revoke a previously granted permission.
    pub async fn revoke(&self, user: UserId, permission: Permission, scope: PermissionScope) {
        self.grants.write().await.remove(&(user, permission, scope));
    }
}

#[async_trait]
impl AccessOracle for MemoryAccessOracle {
    async fn check(
        &self,
        actor: UserId,
        permission: Permission,
        scope: PermissionScope,
    ) -> AppResult<bool> {
        let grants = self.grants.read().await;
        if grants.contains(&(actor, permission, scope)) {
            return Ok(true);
        }
        // A global grant satisfies any scoped check for the same permission.
        Ok(grants.contains(&(actor, permission, PermissionScope::Global)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::types::id::GroupId;

    #[tokio::test]
    async fn test_scoped_grant() {
        let oracle = MemoryAccessOracle::new();
        let user = UserId::new();
        let group = GroupId::new();
        oracle
            .grant(user, Permission::RequestItems, PermissionScope::Group(group))
            .await;

        assert!(oracle
            .check(user, Permission::RequestItems, PermissionScope::Group(group))
            .await
            .unwrap());
        // A different group is not covered by the grant.
        assert!(!oracle
            .check(
                user,
                Permission::RequestItems,
                PermissionScope::Group(GroupId::new())
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_global_grant_satisfies_scoped_check() {
        let oracle = MemoryAccessOracle::new();
        let user = UserId::new();
        oracle
            .grant(user, Permission::ApproveRequests, PermissionScope::Global)
            .await;

        assert!(oracle
            .check(
                user,
                Permission::ApproveRequests,
                PermissionScope::Group(GroupId::new())
            )
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_revoke() {
        let oracle = MemoryAccessOracle::new();
        let user = UserId::new();
        oracle
            .grant(user, Permission::ViewAllData, PermissionScope::Global)
            .await;
        oracle
            .revoke(user, Permission::ViewAllData, PermissionScope::Global)
            .await;

        assert!(!oracle
            .check(user, Permission::ViewAllData, PermissionScope::Global)
            .await
            .unwrap());
    }
}
