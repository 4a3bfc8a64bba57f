//! Cart CRUD service.
//!
//! Pure staging: no invariant beyond positive quantity. Stock is not
//! consulted here; every stock decision is deferred to checkout, where it
//! happens under the item row lock.

use std::sync::Arc;

use tracing::info;

use stockroom_core::error::AppError;
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::{CartLineId, GroupId, ItemId};
use stockroom_database::repositories::cart::CartRepository;
use stockroom_database::repositories::item::ItemRepository;
use stockroom_entity::cart::CartLine;

use crate::access::require;
use crate::context::RequestContext;

/// Manages the per-(user, group) cart staging area.
#[derive(Debug, Clone)]
pub struct CartService {
    /// Cart line repository.
    cart_repo: Arc<CartRepository>,
    /// Item repository (existence checks only).
    item_repo: Arc<ItemRepository>,
    /// Authorization oracle.
    oracle: Arc<dyn AccessOracle>,
}

impl CartService {
    /// Creates a new cart service.
    pub fn new(
        cart_repo: Arc<CartRepository>,
        item_repo: Arc<ItemRepository>,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            cart_repo,
            item_repo,
            oracle,
        }
    }

    /// Adds an item to the caller's cart for a group, incrementing the
    /// quantity if the item is already staged.
    pub async fn add_line(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        item_id: ItemId,
        quantity: i32,
    ) -> AppResult<CartLine> {
        if quantity <= 0 {
            return Err(AppError::validation("Quantity must be positive"));
        }
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ManageCart,
            PermissionScope::Group(group_id),
        )
        .await?;

        let item = self
            .item_repo
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not found"))?;

        let line = self
            .cart_repo
            .upsert_line(ctx.user_id, group_id, item.id, quantity)
            .await?;

        info!(
            user_id = %ctx.user_id,
            item_id = %item_id,
            quantity = line.quantity,
            "Cart line staged"
        );

        Ok(line)
    }

    /// Overwrites the quantity of one of the caller's cart lines.
    pub async fn update_line(
        &self,
        ctx: &RequestContext,
        line_id: CartLineId,
        quantity: i32,
    ) -> AppResult<CartLine> {
        if quantity <= 0 {
            return Err(AppError::validation("Quantity must be positive"));
        }
        let line = self.owned_line(ctx, line_id).await?;
        self.cart_repo.set_quantity(line.id, quantity).await
    }

    /// Removes one of the caller's cart lines.
    pub async fn remove_line(&self, ctx: &RequestContext, line_id: CartLineId) -> AppResult<()> {
        let line = self.owned_line(ctx, line_id).await?;
        self.cart_repo.delete(line.id).await?;
        Ok(())
    }

    /// Lists the caller's staged lines for a group.
    pub async fn list_lines(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
    ) -> AppResult<Vec<CartLine>> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ViewOwnData,
            PermissionScope::Global,
        )
        .await?;
        self.cart_repo
            .find_by_user_and_group(ctx.user_id, group_id)
            .await
    }

    /// Fetch a line and verify the caller owns it.
    async fn owned_line(&self, ctx: &RequestContext, line_id: CartLineId) -> AppResult<CartLine> {
        let line = self
            .cart_repo
            .find_by_id(line_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cart line not found"))?;
        if line.user_id != ctx.user_id {
            return Err(AppError::authorization(
                "You can only modify your own cart",
            ));
        }
        Ok(line)
    }
}
