//! Data-access layer shared by the newsfeed bot, crawler and generator
//! services.
//!
//! Services obtain a [`Provider`] from a [`Store`], pick an entity capability
//! set, narrow it with filters and execute. Everything below the provider is
//! generic over the record types in [`model`].

pub mod config;
pub mod ctx;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod provider;
pub mod query;
pub mod repo;

pub use config::{ConfigError, StoreConfig};
pub use ctx::{CancelReason, Context};
pub use error::{is_duplicate, is_not_found, Operation, OrEmpty, StoreError, StoreResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::status::Status;
pub use provider::{Provider, Store};
pub use query::{Direction, Join, Predicate};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
