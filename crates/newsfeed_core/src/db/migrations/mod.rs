//! Embedded migration registries and executor.
//!
//! # Responsibility
//! - Register relational and KV schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic within a set.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

/// Ordered migrations for one database.
#[derive(Debug, Clone, Copy)]
pub struct MigrationSet {
    name: &'static str,
    migrations: &'static [Migration],
}

/// Schema of the relational store.
pub const RELATIONAL: MigrationSet = MigrationSet {
    name: "relational",
    migrations: &[
        Migration {
            version: 1,
            sql: include_str!("0001_init.sql"),
        },
        Migration {
            version: 2,
            sql: include_str!("0002_titles.sql"),
        },
    ],
};

/// Schema of the key-value store.
pub const KV: MigrationSet = MigrationSet {
    name: "kv",
    migrations: &[Migration {
        version: 1,
        sql: include_str!("kv_0001_entries.sql"),
    }],
};

impl MigrationSet {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the latest migration version known by this binary.
    pub fn latest_version(&self) -> u32 {
        self.migrations
            .last()
            .map_or(0, |migration| migration.version)
    }
}

/// Returns the latest relational schema version known by this binary.
pub fn latest_version() -> u32 {
    RELATIONAL.latest_version()
}

/// Applies all pending migrations of `set` on the provided connection.
pub fn apply_migrations(conn: &mut Connection, set: &MigrationSet) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = set.latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            set: set.name,
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in set.migrations {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

/// Reads the applied schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
