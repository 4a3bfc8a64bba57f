//! Cart staging area entities.

pub mod model;

pub use model::CartLine;
