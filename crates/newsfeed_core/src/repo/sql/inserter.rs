//! Relational writes of new rows.
//!
//! # Responsibility
//! - Map records with default omission so the store fills generated fields.
//! - Return the stored row and rehydrate the caller's record from it.
//! - Optionally resolve unique conflicts by skipping or updating.
//!
//! # Invariants
//! - A unique violation surfaces as `DuplicateRecord`.
//! - `insert_batch` is all-or-nothing and writes results back in input order
//!   only after every row is stored.

use super::selector::target;
use crate::ctx::Context;
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::{extract, SqlRecord};
use crate::model::value::Value;
use crate::query::clause::checked_identifier;
use crate::query::ClauseError;
use crate::repo::exec::{self, Binding, build_error, SavepointGuard, Statement};
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq)]
enum OnConflict {
    Ignore(Vec<String>),
    Update(Vec<String>),
}

/// `INSERT ... RETURNING` builder for records of type `T`.
pub struct Inserter<'c, T> {
    conn: Binding<'c>,
    on_conflict: Option<OnConflict>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Inserter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            on_conflict: self.on_conflict.clone(),
            _record: PhantomData,
        }
    }
}

impl<'c, T: SqlRecord> Inserter<'c, T> {
    pub fn new(conn: impl Into<Binding<'c>>) -> Self {
        Self {
            conn: conn.into(),
            on_conflict: None,
            _record: PhantomData,
        }
    }

    /// Skips rows that collide on `targets`.
    pub fn on_conflict_ignore<I, S>(&self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            on_conflict: Some(OnConflict::Ignore(
                targets.into_iter().map(Into::into).collect(),
            )),
            ..self.clone()
        }
    }

    /// Overwrites the colliding row's other columns with the new values.
    pub fn on_conflict_update<I, S>(&self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            on_conflict: Some(OnConflict::Update(
                targets.into_iter().map(Into::into).collect(),
            )),
            ..self.clone()
        }
    }

    /// Stores `record` and returns it as stored.
    ///
    /// # Errors
    /// - `DuplicateRecord` on a unique violation, or when a conflicting row
    ///   was skipped.
    /// - `WriteFailed` / `Cancelled` on backend failure.
    pub fn insert(&self, ctx: &Context, mut record: T) -> StoreResult<T> {
        match self.insert_one(ctx, Operation::Insert, &record)? {
            Some(stored) => {
                record.rehydrate(stored);
                Ok(record)
            }
            None => Err(StoreError::DuplicateRecord {
                entity: target::<T>().to_string(),
                detail: "conflicting row skipped".to_string(),
            }),
        }
    }

    /// Stores every record atomically and rehydrates them in place.
    ///
    /// Returns the number of rows written; rows skipped by
    /// [`Inserter::on_conflict_ignore`] are left untouched and not counted.
    pub fn insert_batch(&self, ctx: &Context, records: &mut [T]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let savepoint =
            SavepointGuard::begin(self.conn, ctx, Operation::InsertBatch, target::<T>())?;
        let mut stored = Vec::with_capacity(records.len());
        for record in records.iter() {
            stored.push(self.insert_one(ctx, Operation::InsertBatch, record)?);
        }
        savepoint.release(ctx, Operation::InsertBatch, target::<T>())?;

        let mut written = 0;
        for (record, stored) in records.iter_mut().zip(stored) {
            if let Some(stored) = stored {
                record.rehydrate(stored);
                written += 1;
            }
        }
        Ok(written)
    }

    fn insert_one(&self, ctx: &Context, op: Operation, record: &T) -> StoreResult<Option<T>> {
        let mapping = extract(record, true)?;
        let statement = self
            .render(mapping.targets().collect(), mapping.into_values())
            .map_err(|err| build_error(op, target::<T>(), err))?;
        let mut rows = exec::query_records::<T>(self.conn, ctx, op, target::<T>(), &statement)?;
        Ok(rows.pop())
    }

    fn render(
        &self,
        columns: Vec<&'static str>,
        params: Vec<Value>,
    ) -> Result<Statement, ClauseError> {
        let table = checked_identifier(target::<T>())?;
        let mut sql = format!("INSERT INTO {table}");

        if columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            let names = columns
                .iter()
                .map(|column| checked_identifier(column))
                .collect::<Result<Vec<_>, _>>()?;
            let placeholders = vec!["?"; names.len()].join(", ");
            sql.push_str(&format!(" ({}) VALUES ({placeholders})", names.join(", ")));
        }

        if let Some(on_conflict) = &self.on_conflict {
            render_on_conflict(&mut sql, on_conflict, &columns)?;
        }

        sql.push_str(" RETURNING ");
        sql.push_str(&T::schema().columns().join(", "));
        Ok(Statement { sql, params })
    }
}

fn render_on_conflict(
    sql: &mut String,
    on_conflict: &OnConflict,
    columns: &[&'static str],
) -> Result<(), ClauseError> {
    let (targets, update) = match on_conflict {
        OnConflict::Ignore(targets) => (targets, false),
        OnConflict::Update(targets) => (targets, true),
    };
    let targets = targets
        .iter()
        .map(|column| checked_identifier(column))
        .collect::<Result<Vec<_>, _>>()?;

    sql.push_str(" ON CONFLICT");
    if !targets.is_empty() {
        sql.push_str(&format!(" ({})", targets.join(", ")));
    }

    let assignments = columns
        .iter()
        .filter(|column| !targets.contains(*column))
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>();

    if update && !targets.is_empty() && !assignments.is_empty() {
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&assignments.join(", "));
    } else {
        sql.push_str(" DO NOTHING");
    }
    Ok(())
}
