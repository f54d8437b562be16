//! Statement execution shared by the relational and KV backends.
//!
//! # Responsibility
//! - Short-circuit on a done context and abort in-flight statements.
//! - Classify backend failures into the store error vocabulary.
//! - Trace statement text without bound values.
//! - Refuse to run on a transaction the backend has already rolled back.
//!
//! # Invariants
//! - Every builder and savepoint statement goes through [`run`]. The only
//!   direct call is the savepoint rollback issued from `Drop`.
//! - Bound values are never logged.
//! - A [`Binding`] taken inside a transaction never runs a statement in
//!   autocommit mode.

use crate::ctx::{CancelReason, Context, InterruptGuard};
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::SqlRecord;
use crate::model::value::Value;
use crate::query::ClauseError;
use log::{debug, warn};
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode};
use std::time::Instant;

/// Connection a builder runs on, plus whether it must stay inside the
/// transaction that was open when it was bound.
///
/// An interrupted write can make SQLite roll back the whole enclosing
/// transaction and fall back to autocommit. A binding that required a
/// transaction refuses every later statement instead of autocommitting it.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'c> {
    conn: &'c Connection,
    requires_tx: bool,
}

impl<'c> Binding<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            requires_tx: !conn.is_autocommit(),
        }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    /// Whether the binding was taken inside an open transaction.
    pub fn requires_transaction(&self) -> bool {
        self.requires_tx
    }

    /// Whether the transaction this binding was taken in has been rolled back.
    pub fn is_transaction_lost(&self) -> bool {
        self.requires_tx && self.conn.is_autocommit()
    }
}

impl<'c> From<&'c Connection> for Binding<'c> {
    fn from(conn: &'c Connection) -> Self {
        Self::new(conn)
    }
}

/// Rendered statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

/// Runs `f` against `conn` under `ctx`.
///
/// # Errors
/// - `Cancelled` when `ctx` is done before or during the statement.
/// - `TransactionAborted` when the binding's transaction is already gone, or
///   when this statement's failure rolled it back.
pub(crate) fn run<'c, T>(
    conn: impl Into<Binding<'c>>,
    ctx: &Context,
    op: Operation,
    entity: &str,
    sql: &str,
    f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
) -> StoreResult<T> {
    let binding: Binding<'c> = conn.into();
    if let Some(reason) = ctx.err() {
        return Err(StoreError::cancelled(op, entity, reason));
    }
    if binding.is_transaction_lost() {
        debug!(
            "event=sql_exec module=repo status=error op={op} target={entity} reason=transaction_aborted sql={sql:?}"
        );
        return Err(StoreError::transaction_aborted(op, entity, None));
    }

    let conn = binding.connection();
    let started_at = Instant::now();
    let result = {
        let _interrupt = InterruptGuard::install(conn, ctx);
        f(conn)
    };

    match result {
        Ok(value) => {
            debug!(
                "event=sql_exec module=repo status=ok op={op} target={entity} duration_ms={} sql={sql:?}",
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            debug!(
                "event=sql_exec module=repo status=error op={op} target={entity} duration_ms={} sql={sql:?}",
                started_at.elapsed().as_millis()
            );
            let err = classify(err, op, entity, ctx);
            if binding.is_transaction_lost() {
                return Err(StoreError::transaction_aborted(op, entity, Some(err)));
            }
            Err(err)
        }
    }
}

/// Runs a row-returning statement and decodes every row.
pub(crate) fn query_records<'c, T: SqlRecord>(
    conn: impl Into<Binding<'c>>,
    ctx: &Context,
    op: Operation,
    entity: &str,
    statement: &Statement,
) -> StoreResult<Vec<T>> {
    run(conn, ctx, op, entity, &statement.sql, |conn| {
        let mut stmt = conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(T::from_row(row)?);
        }
        Ok(records)
    })
}

/// Runs a statement that returns no rows; yields the affected row count.
pub(crate) fn execute<'c>(
    conn: impl Into<Binding<'c>>,
    ctx: &Context,
    op: Operation,
    entity: &str,
    statement: &Statement,
) -> StoreResult<usize> {
    run(conn, ctx, op, entity, &statement.sql, |conn| {
        conn.execute(&statement.sql, params_from_iter(statement.params.iter()))
    })
}

pub(crate) fn build_error(op: Operation, entity: &str, err: ClauseError) -> StoreError {
    StoreError::build(op, entity, err.to_string())
}

fn classify(err: rusqlite::Error, op: Operation, entity: &str, ctx: &Context) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, detail) = &err {
        if failure.code == ErrorCode::OperationInterrupted {
            let reason = ctx.err().unwrap_or(CancelReason::Cancelled);
            return StoreError::cancelled(op, entity, reason);
        }
        if op.is_write() && is_unique_violation(failure.extended_code) {
            return StoreError::DuplicateRecord {
                entity: entity.to_string(),
                detail: detail.clone().unwrap_or_else(|| failure.to_string()),
            };
        }
    }

    let entity = entity.to_string();
    if op.is_write() {
        StoreError::WriteFailed {
            op,
            entity,
            source: err,
        }
    } else {
        StoreError::QueryFailed {
            op,
            entity,
            source: err,
        }
    }
}

fn is_unique_violation(extended_code: i32) -> bool {
    extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
}

/// Savepoint released on [`SavepointGuard::release`], rolled back on drop.
pub(crate) struct SavepointGuard<'c> {
    conn: Binding<'c>,
    released: bool,
}

const SAVEPOINT_SQL: &str = "SAVEPOINT newsfeed_batch;";
const RELEASE_SQL: &str = "RELEASE newsfeed_batch;";
const ROLLBACK_SQL: &str = "ROLLBACK TO newsfeed_batch; RELEASE newsfeed_batch;";

impl<'c> SavepointGuard<'c> {
    pub(crate) fn begin(
        conn: impl Into<Binding<'c>>,
        ctx: &Context,
        op: Operation,
        entity: &str,
    ) -> StoreResult<Self> {
        let conn: Binding<'c> = conn.into();
        run(conn, ctx, op, entity, SAVEPOINT_SQL, |conn| {
            conn.execute_batch(SAVEPOINT_SQL)
        })?;
        Ok(Self {
            conn,
            released: false,
        })
    }

    pub(crate) fn release(mut self, ctx: &Context, op: Operation, entity: &str) -> StoreResult<()> {
        run(self.conn, ctx, op, entity, RELEASE_SQL, |conn| {
            conn.execute_batch(RELEASE_SQL)
        })?;
        self.released = true;
        Ok(())
    }
}

impl Drop for SavepointGuard<'_> {
    fn drop(&mut self) {
        let conn = self.conn.connection();
        // An aborted statement may already have rolled back the savepoint
        // together with its transaction.
        if self.released || conn.is_autocommit() {
            return;
        }
        if let Err(err) = conn.execute_batch(ROLLBACK_SQL) {
            warn!("event=savepoint_rollback module=repo status=error error={err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{run, Binding, SavepointGuard};
    use crate::ctx::{CancelReason, Context};
    use crate::error::{Operation, StoreError};
    use rusqlite::Connection;
    use std::time::Duration;

    const ENDLESS_SQL: &str = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n)
         SELECT count(*) FROM n;";

    #[test]
    fn deadline_interrupts_running_statement() {
        let conn = Connection::open_in_memory().unwrap();
        let ctx = Context::background().with_timeout(Duration::from_millis(50));

        let err = run(&conn, &ctx, Operation::Select, "numbers", ENDLESS_SQL, |conn| {
            conn.query_row(ENDLESS_SQL, [], |row| row.get::<_, i64>(0))
        })
        .unwrap_err();

        match err {
            StoreError::Cancelled { op, reason, .. } => {
                assert_eq!(op, Operation::Select);
                assert_eq!(reason, CancelReason::DeadlineExceeded);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn interrupt_handler_is_removed_after_run() {
        let conn = Connection::open_in_memory().unwrap();
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let _ = run(&conn, &ctx, Operation::Select, "numbers", ENDLESS_SQL, |conn| {
            conn.query_row(ENDLESS_SQL, [], |row| row.get::<_, i64>(0))
        });

        let total: i64 = conn
            .query_row(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 5000)
                 SELECT count(*) FROM n;",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(total, 5000);
    }

    #[test]
    fn unique_violation_on_write_is_duplicate() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY);").unwrap();
        let ctx = Context::background();
        let insert = "INSERT INTO t (k) VALUES ('a');";

        run(&conn, &ctx, Operation::Insert, "t", insert, |conn| {
            conn.execute(insert, [])
        })
        .unwrap();
        let err = run(&conn, &ctx, Operation::Insert, "t", insert, |conn| {
            conn.execute(insert, [])
        })
        .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn dropped_savepoint_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT);").unwrap();

        let ctx = Context::background();
        {
            let _savepoint =
                SavepointGuard::begin(&conn, &ctx, Operation::InsertBatch, "t").unwrap();
            conn.execute("INSERT INTO t (k) VALUES ('a');", []).unwrap();
        }
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM t;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
        assert!(conn.is_autocommit());

        let savepoint = SavepointGuard::begin(&conn, &ctx, Operation::InsertBatch, "t").unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('b');", []).unwrap();
        savepoint.release(&ctx, Operation::InsertBatch, "t").unwrap();
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM t;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn savepoint_on_done_context_is_never_opened() {
        let conn = Connection::open_in_memory().unwrap();
        let ctx = Context::background();
        ctx.cancel();

        let err = SavepointGuard::begin(&conn, &ctx, Operation::InsertBatch, "t")
            .err()
            .unwrap();
        assert!(err.is_cancelled());
        assert!(conn.is_autocommit());
    }

    #[test]
    fn binding_refuses_statements_after_its_transaction_is_gone() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT); BEGIN;").unwrap();
        let binding = Binding::new(&conn);
        assert!(binding.requires_transaction());

        conn.execute_batch("ROLLBACK;").unwrap();
        assert!(binding.is_transaction_lost());

        let insert = "INSERT INTO t (k) VALUES ('late');";
        let err = run(binding, &Context::background(), Operation::Insert, "t", insert, |conn| {
            conn.execute(insert, [])
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::TransactionAborted { .. }));
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM t;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn interrupted_write_reports_the_lost_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k INTEGER); BEGIN; INSERT INTO t (k) VALUES (0);")
            .unwrap();
        let binding = Binding::new(&conn);
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let endless_insert = "INSERT INTO t (k)
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n)
             SELECT i FROM n;";

        let err = run(binding, &ctx, Operation::Insert, "t", endless_insert, |conn| {
            conn.execute(endless_insert, [])
        })
        .unwrap_err();

        assert!(binding.is_transaction_lost());
        match err {
            StoreError::TransactionAborted { cause, .. } => {
                assert!(cause.is_some_and(|cause| cause.is_cancelled()));
            }
            other => panic!("unexpected error: {other}"),
        }
        let rows: i64 = conn
            .query_row("SELECT count(*) FROM t;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
