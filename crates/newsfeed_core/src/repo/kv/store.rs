//! Key-value backend contract and its SQLite implementation.
//!
//! # Responsibility
//! - Store opaque text values under string keys with optional expiry.
//!
//! # Invariants
//! - An expired entry is indistinguishable from an absent one.
//! - `set_many` writes every entry or none.
//! - Writes are independent of any relational transaction.

use crate::ctx::Context;
use crate::error::{Operation, StoreResult};
use crate::model::current_timestamp_ms;
use crate::repo::exec::{self, Binding, SavepointGuard};
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;

const KV_TABLE: &str = "kv_entries";

const GET_SQL: &str = "SELECT value FROM kv_entries
     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2);";

const UPSERT_SQL: &str = "INSERT INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
     ON CONFLICT (key) DO UPDATE SET
        value = excluded.value,
        expires_at = excluded.expires_at;";

const PURGE_SQL: &str =
    "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1;";

const REMOVE_LIVE_SQL: &str = "DELETE FROM kv_entries
     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2);";

/// Minimal key-value contract the KV builders run on.
pub trait KvStore {
    /// Live value under `key`, if any.
    fn get(&self, ctx: &Context, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Writes all `entries` atomically.
    fn set_many(
        &self,
        ctx: &Context,
        entries: &[(String, String)],
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Deletes `key`; returns whether a live entry existed.
    fn remove(&self, ctx: &Context, key: &str) -> StoreResult<bool>;
}

/// [`KvStore`] over a dedicated SQLite database.
///
/// Expired entries are filtered on read and purged on write.
pub struct SqliteKvStore {
    conn: Connection,
}

impl SqliteKvStore {
    /// Wraps a connection opened with [`crate::db::open_kv_db`].
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn purge_expired(conn: &Connection, now: i64) -> rusqlite::Result<usize> {
        conn.execute(PURGE_SQL, [now])
    }

    fn upsert(
        conn: &Connection,
        key: &str,
        value: &str,
        expires_at: Option<i64>,
    ) -> rusqlite::Result<usize> {
        conn.execute(UPSERT_SQL, params![key, value, expires_at])
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, ctx: &Context, key: &str) -> StoreResult<Option<String>> {
        exec::run(&self.conn, ctx, Operation::KvGet, KV_TABLE, GET_SQL, |conn| {
            conn.query_row(GET_SQL, params![key, current_timestamp_ms()], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| expiry(now, ttl));
        exec::run(
            &self.conn,
            ctx,
            Operation::KvSet,
            KV_TABLE,
            UPSERT_SQL,
            |conn| {
                Self::purge_expired(conn, now)?;
                Self::upsert(conn, key, value, expires_at)
            },
        )?;
        Ok(())
    }

    fn set_many(
        &self,
        ctx: &Context,
        entries: &[(String, String)],
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| expiry(now, ttl));
        let conn = Binding::new(&self.conn);
        let savepoint = SavepointGuard::begin(conn, ctx, Operation::KvSet, KV_TABLE)?;
        exec::run(
            conn,
            ctx,
            Operation::KvSet,
            KV_TABLE,
            UPSERT_SQL,
            |conn| {
                Self::purge_expired(conn, now)?;
                for (key, value) in entries {
                    Self::upsert(conn, key, value, expires_at)?;
                }
                Ok(())
            },
        )?;
        savepoint.release(ctx, Operation::KvSet, KV_TABLE)
    }

    fn remove(&self, ctx: &Context, key: &str) -> StoreResult<bool> {
        let removed = exec::run(
            &self.conn,
            ctx,
            Operation::KvRemove,
            KV_TABLE,
            REMOVE_LIVE_SQL,
            |conn| {
                let removed =
                    conn.execute(REMOVE_LIVE_SQL, params![key, current_timestamp_ms()])?;
                conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
                Ok(removed)
            },
        )?;
        Ok(removed > 0)
    }
}

fn expiry(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}
