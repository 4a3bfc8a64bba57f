//! # stockroom-service
//!
//! Business logic service layer for StockRoom. Each service orchestrates
//! repositories and the access oracle to implement a lending use case.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references. Every state-mutating
//! operation runs inside a database transaction that locks the item (and
//! request/booking) row before reading the value it conditions on; the
//! authorization check happens before the transaction begins so no
//! external call is made while locks are held.

pub mod access;
pub mod approval;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod context;
pub mod lending;

pub use access::MemoryAccessOracle;
pub use approval::ApprovalService;
pub use booking::BookingService;
pub use cart::CartService;
pub use checkout::CheckoutService;
pub use context::RequestContext;
pub use lending::LendingService;
