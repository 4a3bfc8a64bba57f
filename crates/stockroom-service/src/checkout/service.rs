//! Tiered checkout processor.
//!
//! Consumes every cart line staged by (user, group), classifies each line
//! by item tier, and routes it to one of three outcomes: direct take,
//! borrowing, or approval request. One transaction wraps all lines and the
//! cart clear, but lines fail independently: each line is validated under
//! the item row lock *before* any mutating statement is issued, so a
//! rejected line becomes a recorded error without poisoning the
//! transaction for its siblings.

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tracing::info;

use stockroom_core::error::{AppError, ErrorKind};
use stockroom_core::result::AppResult;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::GroupId;
use stockroom_database::repositories::borrowing::BorrowingRepository;
use stockroom_database::repositories::cart::CartRepository;
use stockroom_database::repositories::item::ItemRepository;
use stockroom_database::repositories::request::RequestRepository;
use stockroom_database::repositories::taking::TakingRepository;
use stockroom_entity::cart::CartLine;
use stockroom_entity::item::ItemTier;
use stockroom_entity::lending::{CreateBorrowing, CreateTaking};
use stockroom_entity::request::CreateRequest;

use crate::access::require;
use crate::context::RequestContext;

use super::outcome::{CheckoutInput, CheckoutLineError, CheckoutSummary};

/// Where a validated cart line is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRoute {
    /// Low tier: debit stock and append a taking record.
    Take,
    /// Medium tier: open a borrowing and debit stock.
    Borrow,
    /// High tier: create a pending approval request, no stock touched.
    Request,
}

/// Outcome of one successfully processed line.
enum LineOutcome {
    Completed(stockroom_entity::lending::TakingRecord),
    Borrowed(stockroom_entity::lending::Borrowing),
    PendingApproval(stockroom_entity::request::BorrowRequest),
}

/// Pre-check a line against the item state read under the row lock.
///
/// Returning an error here means no mutating statement has been issued
/// for the line yet, which is what keeps per-line failures recoverable
/// inside the shared transaction.
fn route_line(
    tier: ItemTier,
    stock: i32,
    quantity: i32,
    has_due_date: bool,
) -> AppResult<LineRoute> {
    if quantity <= 0 {
        return Err(AppError::validation("Quantity must be positive"));
    }
    match tier {
        ItemTier::Low => {
            if stock < quantity {
                return Err(AppError::insufficient_stock(format!(
                    "Only {stock} in stock, {quantity} requested"
                )));
            }
            Ok(LineRoute::Take)
        }
        ItemTier::Medium => {
            if !has_due_date {
                return Err(AppError::validation(
                    "A due date is required to borrow this item",
                ));
            }
            if stock < quantity {
                return Err(AppError::insufficient_stock(format!(
                    "Only {stock} in stock, {quantity} requested"
                )));
            }
            Ok(LineRoute::Borrow)
        }
        // High-tier items are requested, not taken: stock is checked at
        // review time, not here.
        ItemTier::High => Ok(LineRoute::Request),
    }
}

/// Processes carts into takings, borrowings, and approval requests.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    /// Connection pool; each checkout runs in one transaction from it.
    pool: PgPool,
    /// Cart line repository.
    cart_repo: Arc<CartRepository>,
    /// Item repository (inventory ledger).
    item_repo: Arc<ItemRepository>,
    /// Taking record repository.
    taking_repo: Arc<TakingRepository>,
    /// Borrowing repository.
    borrowing_repo: Arc<BorrowingRepository>,
    /// Borrow request repository.
    request_repo: Arc<RequestRepository>,
    /// Authorization oracle.
    oracle: Arc<dyn AccessOracle>,
}

impl CheckoutService {
    /// Creates a new checkout service.
    pub fn new(
        pool: PgPool,
        cart_repo: Arc<CartRepository>,
        item_repo: Arc<ItemRepository>,
        taking_repo: Arc<TakingRepository>,
        borrowing_repo: Arc<BorrowingRepository>,
        request_repo: Arc<RequestRepository>,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            pool,
            cart_repo,
            item_repo,
            taking_repo,
            borrowing_repo,
            request_repo,
            oracle,
        }
    }

    /// Checks out every line the caller has staged for a group.
    ///
    /// Never fails because one line fails: insufficient stock and per-line
    /// validation problems are aggregated into the summary, and the cart is
    /// cleared exactly once at the end regardless of outcome. The call only
    /// errors outright on authorization or infrastructure failures, in
    /// which case the whole transaction rolls back and the cart survives.
    pub async fn checkout(
        &self,
        ctx: &RequestContext,
        group_id: GroupId,
        input: CheckoutInput,
    ) -> AppResult<CheckoutSummary> {
        require(
            self.oracle.as_ref(),
            ctx,
            Permission::RequestItems,
            PermissionScope::Group(group_id),
        )
        .await?;

        let lines = self
            .cart_repo
            .find_by_user_and_group(ctx.user_id, group_id)
            .await?;
        if lines.is_empty() {
            return Err(AppError::validation("Cart is empty"));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let mut summary = CheckoutSummary::default();
        for line in &lines {
            match self.process_line(&mut tx, ctx, line, &input).await {
                Ok(LineOutcome::Completed(taking)) => summary.processed.push(taking),
                Ok(LineOutcome::Borrowed(borrowing)) => summary.borrowed.push(borrowing),
                Ok(LineOutcome::PendingApproval(request)) => summary.requested.push(request),
                Err(e) if e.kind.is_expected() => summary.errors.push(CheckoutLineError {
                    item_id: line.item_id,
                    quantity: line.quantity,
                    kind: e.kind,
                    message: e.message,
                }),
                Err(e) => return Err(e),
            }
        }

        self.cart_repo.clear(&mut tx, ctx.user_id, group_id).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit checkout", e)
        })?;

        info!(
            user_id = %ctx.user_id,
            group_id = %group_id,
            processed = summary.processed.len(),
            borrowed = summary.borrowed.len(),
            requested = summary.requested.len(),
            failed = summary.errors.len(),
            "Checkout completed"
        );

        Ok(summary)
    }

    /// Process one cart line inside the shared transaction.
    async fn process_line(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        line: &CartLine,
        input: &CheckoutInput,
    ) -> AppResult<LineOutcome> {
        let item = self
            .item_repo
            .find_for_update(conn, line.item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not found"))?;

        let route = route_line(item.tier, item.stock, line.quantity, input.due_date.is_some())?;

        match route {
            LineRoute::Take => {
                self.item_repo.debit(conn, item.id, line.quantity).await?;
                let taking = self
                    .taking_repo
                    .insert(
                        conn,
                        &CreateTaking {
                            user_id: ctx.user_id,
                            group_id: line.group_id,
                            item_id: item.id,
                            quantity: line.quantity,
                        },
                    )
                    .await?;
                Ok(LineOutcome::Completed(taking))
            }
            LineRoute::Borrow => {
                let due_date = input
                    .due_date
                    .ok_or_else(|| AppError::validation("A due date is required to borrow this item"))?;
                let borrowing = self
                    .borrowing_repo
                    .insert(
                        conn,
                        &CreateBorrowing {
                            user_id: ctx.user_id,
                            group_id: line.group_id,
                            item_id: item.id,
                            quantity: line.quantity,
                            due_date,
                            condition_before: input.condition_before.clone(),
                            evidence_before: input.evidence_before.clone(),
                        },
                    )
                    .await?;
                self.item_repo.debit(conn, item.id, line.quantity).await?;
                Ok(LineOutcome::Borrowed(borrowing))
            }
            LineRoute::Request => {
                let request = self
                    .request_repo
                    .create_in_tx(
                        conn,
                        &CreateRequest {
                            user_id: ctx.user_id,
                            group_id: line.group_id,
                            item_id: item.id,
                            quantity: line.quantity,
                        },
                    )
                    .await?;
                Ok(LineOutcome::PendingApproval(request))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_tier_with_stock_is_taken() {
        assert_eq!(
            route_line(ItemTier::Low, 5, 3, false).unwrap(),
            LineRoute::Take
        );
    }

    #[test]
    fn test_low_tier_without_stock_is_rejected() {
        let err = route_line(ItemTier::Low, 1, 2, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientStock);
    }

    #[test]
    fn test_medium_tier_requires_due_date() {
        let err = route_line(ItemTier::Medium, 5, 1, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(
            route_line(ItemTier::Medium, 5, 1, true).unwrap(),
            LineRoute::Borrow
        );
    }

    #[test]
    fn test_medium_tier_without_stock_is_rejected() {
        let err = route_line(ItemTier::Medium, 0, 1, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientStock);
    }

    #[test]
    fn test_high_tier_skips_stock_check() {
        // A High-tier line is a request, not a take: zero stock is fine.
        assert_eq!(
            route_line(ItemTier::High, 0, 2, false).unwrap(),
            LineRoute::Request
        );
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        for qty in [0, -1] {
            let err = route_line(ItemTier::Low, 5, qty, false).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }
}
