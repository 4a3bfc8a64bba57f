//! Borrow/return lifecycle.

pub mod service;

pub use service::{BorrowInput, LendingService, ReturnInput};
