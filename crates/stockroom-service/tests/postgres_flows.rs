//! End-to-end lending flows against a live PostgreSQL instance.
//!
//! These tests are ignored by default; run them with
//! `STOCKROOM_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use stockroom_core::error::ErrorKind;
use stockroom_core::traits::access::{AccessOracle, Permission, PermissionScope};
use stockroom_core::types::id::{GroupId, UserId};
use stockroom_core::types::pagination::PageRequest;
use stockroom_database::repositories::availability::AvailabilityRepository;
use stockroom_database::repositories::booking::BookingRepository;
use stockroom_database::repositories::borrowing::BorrowingRepository;
use stockroom_database::repositories::cart::CartRepository;
use stockroom_database::repositories::item::ItemRepository;
use stockroom_database::repositories::request::RequestRepository;
use stockroom_database::repositories::taking::TakingRepository;
use stockroom_entity::booking::BookingStatus;
use stockroom_entity::item::{CreateItem, Item, ItemTier};
use stockroom_service::approval::{ReviewDecision, ReviewInput, SubmitRequestInput};
use stockroom_service::checkout::CheckoutInput;
use stockroom_service::lending::{BorrowInput, ReturnInput};
use stockroom_service::{
    ApprovalService, BookingService, CartService, CheckoutService, LendingService,
    MemoryAccessOracle, RequestContext,
};

/// Everything a test needs: pool, services, and a fully granted member.
struct TestHarness {
    pool: PgPool,
    oracle: Arc<MemoryAccessOracle>,
    item_repo: Arc<ItemRepository>,
    cart: CartService,
    checkout: CheckoutService,
    lending: LendingService,
    approval: ApprovalService,
    booking: BookingService,
}

impl TestHarness {
    async fn new() -> Self {
        let url = std::env::var("STOCKROOM_TEST_DATABASE_URL")
            .expect("STOCKROOM_TEST_DATABASE_URL must be set for integration tests");
        let pool = PgPool::connect(&url).await.expect("connect to test db");
        stockroom_database::migration::run_migrations(&pool)
            .await
            .expect("run migrations");

        let oracle = Arc::new(MemoryAccessOracle::new());
        let dyn_oracle: Arc<dyn AccessOracle> = oracle.clone();

        let item_repo = Arc::new(ItemRepository::new(pool.clone()));
        let cart_repo = Arc::new(CartRepository::new(pool.clone()));
        let taking_repo = Arc::new(TakingRepository::new(pool.clone()));
        let borrowing_repo = Arc::new(BorrowingRepository::new(pool.clone()));
        let request_repo = Arc::new(RequestRepository::new(pool.clone()));
        let booking_repo = Arc::new(BookingRepository::new(pool.clone()));
        let availability_repo = Arc::new(AvailabilityRepository::new(pool.clone()));

        let cart = CartService::new(
            Arc::clone(&cart_repo),
            Arc::clone(&item_repo),
            Arc::clone(&dyn_oracle),
        );
        let checkout = CheckoutService::new(
            pool.clone(),
            Arc::clone(&cart_repo),
            Arc::clone(&item_repo),
            Arc::clone(&taking_repo),
            Arc::clone(&borrowing_repo),
            Arc::clone(&request_repo),
            Arc::clone(&dyn_oracle),
        );
        let lending = LendingService::new(
            pool.clone(),
            Arc::clone(&item_repo),
            Arc::clone(&borrowing_repo),
            Arc::clone(&taking_repo),
            Arc::clone(&request_repo),
            Arc::clone(&dyn_oracle),
        );
        let approval = ApprovalService::new(
            pool.clone(),
            Arc::clone(&request_repo),
            Arc::clone(&item_repo),
            Arc::clone(&booking_repo),
            Arc::clone(&availability_repo),
            Arc::clone(&dyn_oracle),
        );
        let booking = BookingService::new(
            pool.clone(),
            Arc::clone(&booking_repo),
            Arc::clone(&dyn_oracle),
        );

        Self {
            pool,
            oracle,
            item_repo,
            cart,
            checkout,
            lending,
            approval,
            booking,
        }
    }

    /// A member with cart/checkout/borrow rights in the group.
    async fn member(&self, group_id: GroupId) -> RequestContext {
        let ctx = RequestContext::new(UserId::new(), "member");
        self.oracle
            .grant(
                ctx.user_id,
                Permission::RequestItems,
                PermissionScope::Group(group_id),
            )
            .await;
        self.oracle
            .grant(
                ctx.user_id,
                Permission::ManageCart,
                PermissionScope::Group(group_id),
            )
            .await;
        self.oracle
            .grant(ctx.user_id, Permission::ViewOwnData, PermissionScope::Global)
            .await;
        ctx
    }

    /// A reviewer with global approval rights.
    async fn reviewer(&self) -> RequestContext {
        let ctx = RequestContext::new(UserId::new(), "reviewer");
        self.oracle
            .grant(
                ctx.user_id,
                Permission::ApproveRequests,
                PermissionScope::Global,
            )
            .await;
        ctx
    }

    async fn seed_item(&self, group_id: GroupId, tier: ItemTier, stock: i32) -> Item {
        self.item_repo
            .create(&CreateItem {
                group_id,
                name: format!("{tier} item"),
                tier,
                stock,
            })
            .await
            .expect("seed item")
    }

    async fn stock_of(&self, item: &Item) -> i32 {
        self.item_repo
            .find_by_id(item.id)
            .await
            .expect("find item")
            .expect("item exists")
            .stock
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set STOCKROOM_TEST_DATABASE_URL)"]
async fn checkout_low_tier_debits_stock_and_clears_cart() {
    let h = TestHarness::new().await;
    let group = GroupId::new();
    let ctx = h.member(group).await;
    let item = h.seed_item(group, ItemTier::Low, 5).await;

    h.cart
        .add_line(&ctx, group, item.id, 3)
        .await
        .expect("stage line");

    let summary = h
        .checkout
        .checkout(&ctx, group, CheckoutInput::default())
        .await
        .expect("checkout");

    assert_eq!(summary.processed.len(), 1);
    assert_eq!(summary.processed[0].quantity, 3);
    assert!(summary.errors.is_empty());
    assert_eq!(h.stock_of(&item).await, 2);
    assert!(h.cart.list_lines(&ctx, group).await.unwrap().is_empty());

    let history = h
        .lending
        .list_takings(&ctx, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total_items, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set STOCKROOM_TEST_DATABASE_URL)"]
async fn checkout_aggregates_per_line_failures() {
    let h = TestHarness::new().await;
    let group = GroupId::new();
    let ctx = h.member(group).await;
    let plentiful = h.seed_item(group, ItemTier::Low, 10).await;
    let scarce = h.seed_item(group, ItemTier::Low, 1).await;

    h.cart.add_line(&ctx, group, plentiful.id, 2).await.unwrap();
    h.cart.add_line(&ctx, group, scarce.id, 5).await.unwrap();

    let summary = h
        .checkout
        .checkout(&ctx, group, CheckoutInput::default())
        .await
        .expect("checkout succeeds despite the failed line");

    assert_eq!(summary.processed.len(), 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].kind, ErrorKind::InsufficientStock);
    // The successful line committed; the failed one left stock alone.
    assert_eq!(h.stock_of(&plentiful).await, 8);
    assert_eq!(h.stock_of(&scarce).await, 1);
    // The cart is empty either way.
    assert!(h.cart.list_lines(&ctx, group).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set STOCKROOM_TEST_DATABASE_URL)"]
async fn borrow_and_return_round_trip() {
    let h = TestHarness::new().await;
    let group = GroupId::new();
    let ctx = h.member(group).await;
    let item = h.seed_item(group, ItemTier::Medium, 1).await;

    let input = BorrowInput {
        quantity: 1,
        due_date: Utc::now() + Duration::days(14),
        condition_before: Some("good".to_string()),
        evidence_before: None,
    };

    h.lending
        .borrow(&ctx, group, item.id, input.clone())
        .await
        .expect("first borrow");
    assert_eq!(h.stock_of(&item).await, 0);

    let err = h
        .lending
        .borrow(&ctx, group, item.id, input)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InsufficientStock);

    h.lending
        .return_item(&ctx, item.id, ReturnInput::default())
        .await
        .expect("return");
    assert_eq!(h.stock_of(&item).await, 1);

    // A second return is rejected, not double-credited.
    let err = h
        .lending
        .return_item(&ctx, item.id, ReturnInput::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(h.stock_of(&item).await, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set STOCKROOM_TEST_DATABASE_URL)"]
async fn high_tier_review_requires_booking_fields() {
    let h = TestHarness::new().await;
    let group = GroupId::new();
    let ctx = h.member(group).await;
    let reviewer = h.reviewer().await;
    let item = h.seed_item(group, ItemTier::High, 2).await;

    let request = h
        .approval
        .submit_request(
            &ctx,
            group,
            SubmitRequestInput {
                item_id: item.id,
                quantity: 1,
            },
        )
        .await
        .expect("submit");

    // Approval without scheduling is invalid; the request stays pending.
    let bare = ReviewInput {
        decision: ReviewDecision::Approved,
        availability_id: None,
        pickup_location: None,
        return_location: None,
    };
    let err = h.approval.review(&reviewer, request.id, bare).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let slot = h
        .approval
        .create_availability(
            &reviewer,
            stockroom_service::approval::CreateAvailabilityInput {
                slot_date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                location: "Equipment room".to_string(),
            },
        )
        .await
        .expect("publish slot");

    let full = ReviewInput {
        decision: ReviewDecision::Approved,
        availability_id: Some(slot.id),
        pickup_location: Some("Equipment room".to_string()),
        return_location: Some("Equipment room".to_string()),
    };
    let reviewed = h
        .approval
        .review(&reviewer, request.id, full.clone())
        .await
        .expect("approve");
    let booking = h
        .approval
        .linked_booking(&reviewed)
        .await
        .unwrap()
        .expect("booking materialized");
    assert_eq!(booking.status, BookingStatus::PendingConfirmation);
    assert_eq!(booking.pickup_at, slot.pickup_datetime());
    assert_eq!(booking.return_at, booking.pickup_at + Duration::days(7));

    // Single review: the second attempt fails whatever the decision.
    let err = h.approval.review(&reviewer, request.id, full).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    // The requester confirms their own booking within the window.
    let confirmed = h.booking.confirm(&ctx, booking.id).await.expect("confirm");
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.confirmed_by, Some(ctx.user_id));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set STOCKROOM_TEST_DATABASE_URL)"]
async fn concurrent_borrows_never_overdraw_stock() {
    let h = TestHarness::new().await;
    let group = GroupId::new();
    let first = h.member(group).await;
    let second = h.member(group).await;
    let item = h.seed_item(group, ItemTier::Medium, 1).await;

    let input = BorrowInput {
        quantity: 1,
        due_date: Utc::now() + Duration::days(7),
        condition_before: None,
        evidence_before: None,
    };

    let lending_a = h.lending.clone();
    let lending_b = h.lending.clone();
    let (a, b) = tokio::join!(
        lending_a.borrow(&first, group, item.id, input.clone()),
        lending_b.borrow(&second, group, item.id, input.clone()),
    );

    // The item row lock serializes the two debits: exactly one wins.
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert_eq!(loser.unwrap_err().kind, ErrorKind::InsufficientStock);
    assert_eq!(h.stock_of(&item).await, 0);

    h.pool.close().await;
}
