//! Authorization helpers and the in-memory access oracle.

pub mod memory;

pub use memory::MemoryAccessOracle;

use stockroom_core::error::AppError;
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};

use crate::context::RequestContext;

/// Ask the oracle and turn a negative answer into an authorization error.
///
/// Called once per operation, before any transaction is opened.
pub async fn require(
    oracle: &dyn AccessOracle,
    ctx: &RequestContext,
    permission: Permission,
    scope: PermissionScope,
) -> AppResult<()> {
    if oracle.check(ctx.user_id, permission, scope).await? {
        Ok(())
    } else {
        Err(AppError::authorization(format!(
            "Permission '{permission}' is required for this operation"
        )))
    }
}
