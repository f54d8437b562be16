//! Key-value backend and its builders.
//!
//! # Responsibility
//! - Hide the KV engine behind [`KvStore`].
//! - Provide typed Getter/Inserter/Remover builders and a raw accessor.
//!
//! # Invariants
//! - Values are JSON text; no schema versioning happens at this layer.

mod builders;
mod raw;
mod store;

pub use builders::{KvGetter, KvInserter, KvRemover};
pub use raw::RawKv;
pub use store::{KvStore, SqliteKvStore};
