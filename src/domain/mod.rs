//! Domain layer: content records, kinds, collections and invariants.

pub mod content;
pub mod entities;
pub mod error;
pub mod types;
pub mod validation;
