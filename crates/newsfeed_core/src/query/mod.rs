//! Backend-agnostic query vocabulary: predicates, joins and ordering.

pub mod clause;
pub mod predicate;

pub use clause::{ClauseError, Direction, Join, Order};
pub use predicate::Predicate;
