//! Lendable item entity and tier classification.

pub mod model;
pub mod tier;

pub use model::{CreateItem, Item};
pub use tier::ItemTier;
