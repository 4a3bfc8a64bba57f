//! # stockroom-database
//!
//! PostgreSQL access for StockRoom: connection pool management, the
//! migration runner, and one repository per entity.
//!
//! Lock-sensitive repository methods take a `&mut PgConnection` borrowed
//! from an open transaction, so the calling service controls transaction
//! scope and lock lifetime. Lock-free reads go through the pool held by
//! each repository.

pub mod connection;
pub mod migration;
pub mod repositories;
