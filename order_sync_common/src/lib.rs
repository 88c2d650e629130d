//! Types and helpers shared by the order sync crates.
mod ids;

pub mod helpers;

pub use ids::{EmptyIdentifier, OrderId, SubjectId};
