//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for both stores.
//! - Configure connection pragmas required by the builders.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::{apply_migrations, MigrationSet, KV, RELATIONAL};
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection tuning applied at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Opens the relational database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, options: OpenOptions) -> DbResult<Connection> {
    open_with("file", &RELATIONAL, options, || Connection::open(path))
}

/// Opens an in-memory relational database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(
        "memory",
        &RELATIONAL,
        OpenOptions::default(),
        Connection::open_in_memory,
    )
}

/// Opens the key-value database file and applies its migrations.
pub fn open_kv_db(path: impl AsRef<Path>, options: OpenOptions) -> DbResult<Connection> {
    open_with("file", &KV, options, || Connection::open(path))
}

/// Opens an in-memory key-value database.
pub fn open_kv_db_in_memory() -> DbResult<Connection> {
    open_with(
        "memory",
        &KV,
        OpenOptions::default(),
        Connection::open_in_memory,
    )
}

fn open_with(
    mode: &str,
    set: &MigrationSet,
    options: OpenOptions,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let store = set.name();
    info!("event=db_open module=db status=start store={store} mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error store={store} mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, set, options) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok store={store} mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error store={store} mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    set: &MigrationSet,
    options: OpenOptions,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(options.busy_timeout)?;
    apply_migrations(conn, set)?;
    Ok(())
}
