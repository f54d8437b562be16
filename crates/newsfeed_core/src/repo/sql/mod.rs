//! Relational builders over SQLite.
//!
//! # Responsibility
//! - Provide immutable Selector/Getter/Inserter/Updater/Remover builders
//!   generic over [`crate::model::record::SqlRecord`] types.
//! - Route every statement through [`crate::repo`]'s executor.
//!
//! # Invariants
//! - Builders capture their connection at construction and never re-resolve it.
//! - Values are only ever bound parameters.

mod getter;
mod inserter;
mod remover;
mod selector;
mod updater;

pub use getter::Getter;
pub use inserter::Inserter;
pub use remover::Remover;
pub use selector::Selector;
pub use updater::Updater;
