//! # stockroom-entity
//!
//! Domain entity models for StockRoom. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod booking;
pub mod cart;
pub mod item;
pub mod lending;
pub mod request;
