//! Lending lifecycle entities: takings and borrowings.

pub mod borrowing;
pub mod taking;

pub use borrowing::{Borrowing, CreateBorrowing};
pub use taking::{CreateTaking, TakingRecord};
