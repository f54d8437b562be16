//! Storage builders for both backends.
//!
//! # Responsibility
//! - Keep statement rendering and execution inside the persistence boundary.
//! - Expose generic builders that entity providers compose.
//!
//! # Invariants
//! - Builders return semantic errors (`NotFound`, `DuplicateRecord`) in
//!   addition to wrapped backend failures.

pub(crate) mod exec;
pub mod kv;
pub mod sql;

pub use exec::Binding;
