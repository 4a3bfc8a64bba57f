//! Borrow/return lifecycle service.
//!
//! Manages the open borrowing record for a (user, item) pair: creation
//! with a stock debit, closure with a stock credit, and the lock-free
//! availability query used by High-tier clients to pre-flight a request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::{GroupId, ItemId};
use stockroom_core::types::pagination::{PageRequest, PageResponse};
use stockroom_database::repositories::borrowing::BorrowingRepository;
use stockroom_database::repositories::item::ItemRepository;
use stockroom_database::repositories::request::RequestRepository;
use stockroom_database::repositories::taking::TakingRepository;
use stockroom_entity::item::ItemTier;
use stockroom_entity::lending::{Borrowing, CreateBorrowing, TakingRecord};

use crate::access::require;
use crate::context::RequestContext;

/// Parameters for opening a borrowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowInput {
    /// Number of units to borrow.
    pub quantity: i32,
    /// When the item is due back.
    pub due_date: DateTime<Utc>,
    /// Condition noted at checkout.
    pub condition_before: Option<String>,
    /// Photo or document reference for the checkout condition.
    pub evidence_before: Option<String>,
}

/// Parameters for closing a borrowing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnInput {
    /// Condition noted at return.
    pub condition_after: Option<String>,
    /// Photo or document reference for the return condition.
    pub evidence_after: Option<String>,
}

/// Manages borrowings and the stock movements tied to them.
#[derive(Debug, Clone)]
pub struct LendingService {
    /// Connection pool; each mutation runs in one transaction from it.
    pool: PgPool,
    /// Item repository (inventory ledger).
    item_repo: Arc<ItemRepository>,
    /// Borrowing repository.
    borrowing_repo: Arc<BorrowingRepository>,
    /// Taking record repository (history listings).
    taking_repo: Arc<TakingRepository>,
    /// Borrow request repository (High-tier approvals).
    request_repo: Arc<RequestRepository>,
    /// Authorization oracle.
    oracle: Arc<dyn AccessOracle>,
}

impl LendingService {
    /// Creates a new lending service.
    pub fn new(
        pool: PgPool,
        item_repo: Arc<ItemRepository>,
        borrowing_repo: Arc<BorrowingRepository>,
        taking_repo: Arc<TakingRepository>,
        request_repo: Arc<RequestRepository>,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            pool,
            item_repo,
            borrowing_repo,
            taking_repo,
            request_repo,
            oracle,
        }
    }

    /// Borrows an item directly (outside a cart checkout).
    ///
    /// Medium-tier items need only sufficient stock. High-tier items
    /// additionally require that no one currently has the item out and
    /// that the caller holds an approved, unfulfilled request for this
    /// exact quantity; the request is consumed on success. Low-tier items
    /// are rejected — they are taken at checkout, not borrowed.
    pub async fn borrow(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        item_id: ItemId,
        input: BorrowInput,
    ) -> AppResult<Borrowing> {
        if input.quantity <= 0 {
            return Err(AppError::validation("Quantity must be positive"));
        }
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::RequestItems,
            PermissionScope::Group(group_id),
        )
        .await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let item = self
            .item_repo
            .find_for_update(&mut tx, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not found"))?;

        match item.tier {
            ItemTier::Low => {
                return Err(AppError::validation(
                    "Consumable items are taken at checkout, not borrowed",
                ));
            }
            ItemTier::High => {
                if !item.has_stock(input.quantity) {
                    return Err(AppError::insufficient_stock(format!(
                        "Only {} in stock, {} requested",
                        item.stock, input.quantity
                    )));
                }
                // Single physical unit semantics: any user's active
                // borrowing blocks the item, not just the caller's.
                if self
                    .borrowing_repo
                    .exists_active_for_item(&mut *tx, item_id)
                    .await?
                {
                    return Err(AppError::conflict(
                        "Item is currently borrowed and has not been returned",
                    ));
                }
                let request = self
                    .request_repo
                    .find_approved_unfulfilled(&mut tx, ctx.user_id, item_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::validation("No approved request exists for this item")
                    })?;
                if request.quantity != input.quantity {
                    return Err(AppError::validation(format!(
                        "Approved quantity is {}, but {} was requested",
                        request.quantity, input.quantity
                    )));
                }
                self.request_repo.mark_fulfilled(&mut tx, request.id).await?;
            }
            ItemTier::Medium => {
                if !item.has_stock(input.quantity) {
                    return Err(AppError::insufficient_stock(format!(
                        "Only {} in stock, {} requested",
                        item.stock, input.quantity
                    )));
                }
            }
        }

        self.item_repo.debit(&mut tx, item_id, input.quantity).await?;
        let borrowing = self
            .borrowing_repo
            .insert(
                &mut tx,
                &CreateBorrowing {
                    user_id: ctx.user_id,
                    group_id,
                    item_id,
                    quantity: input.quantity,
                    due_date: input.due_date,
                    condition_before: input.condition_before,
                    evidence_before: input.evidence_before,
                },
            )
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit borrow", e)
        })?;

        info!(
            user_id = %ctx.user_id,
            item_id = %item_id,
            quantity = input.quantity,
            tier = %item.tier,
            "Item borrowed"
        );

        Ok(borrowing)
    }

    /// Returns the caller's active borrowing of an item.
    ///
    /// Ownership and active status are resolved in one locked lookup; a
    /// wrong owner, wrong item, or already-returned borrowing are all
    /// reported with the same message so the caller learns nothing about
    /// which case applied. A second return is therefore rejected, never
    /// double-credited.
    pub async fn return_item(
        &self,
        ctx: &RequestContext,
        item_id: ItemId,
        input: ReturnInput,
    ) -> AppResult<Borrowing> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ViewOwnData,
            PermissionScope::Global,
        )
        .await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let borrowing = self
            .borrowing_repo
            .find_active_for_update(&mut tx, ctx.user_id, item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item is not actively borrowed by you"))?;

        let closed = self
            .borrowing_repo
            .close(
                &mut tx,
                borrowing.id,
                input.condition_after.as_deref(),
                input.evidence_after.as_deref(),
            )
            .await?;
        self.item_repo
            .credit(&mut tx, item_id, borrowing.quantity)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit return", e)
        })?;

        info!(
            user_id = %ctx.user_id,
            item_id = %item_id,
            quantity = borrowing.quantity,
            "Item returned"
        );

        Ok(closed)
    }

    /// Whether an item is available to borrow: no active borrowing exists,
    /// independent of the stock count. Lock-free; mutating paths
    /// re-validate under the item row lock.
    pub async fn check_borrowing_status(&self, item_id: ItemId) -> AppResult<bool> {
        let borrowed = self
            .borrowing_repo
            .exists_active_for_item(&self.pool, item_id)
            .await?;
        Ok(!borrowed)
    }

    /// Lists the caller's borrowings.
    pub async fn list_borrowings(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Borrowing>> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ViewOwnData,
            PermissionScope::Global,
        )
        .await?;
        self.borrowing_repo.find_by_user(ctx.user_id, page).await
    }

    /// Lists the caller's taking history.
    pub async fn list_takings(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<PageResponse<TakingRecord>> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::ViewOwnData,
            PermissionScope::Global,
        )
        .await?;
        self.taking_repo.find_by_user(ctx.user_id, page).await
    }
}
