//! Partial relational updates.
//!
//! # Invariants
//! - Only non-default fields of the partial record reach the `SET` clause.
//! - No matching row is an empty result, not an error.

use super::selector::target;
use crate::ctx::Context;
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::{extract, Mapping, Record, SqlRecord};
use crate::query::clause::checked_identifier;
use crate::query::{ClauseError, Predicate};
use crate::repo::exec::{self, Binding, build_error, Statement};
use std::marker::PhantomData;

/// Applies partial records `U` to rows of `T` matching the filter.
pub struct Updater<'c, U, T> {
    conn: Binding<'c>,
    expr: Predicate,
    _records: PhantomData<fn() -> (U, T)>,
}

impl<U, T> Clone for Updater<'_, U, T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            expr: self.expr.clone(),
            _records: PhantomData,
        }
    }
}

impl<'c, U: Record, T: SqlRecord> Updater<'c, U, T> {
    pub fn new(conn: impl Into<Binding<'c>>) -> Self {
        Self {
            conn: conn.into(),
            expr: Predicate::always(),
            _records: PhantomData,
        }
    }

    pub fn with_expr(&self, expr: Predicate) -> Self {
        Self {
            conn: self.conn,
            expr,
            _records: PhantomData,
        }
    }

    pub fn filter(&self, expr: Predicate) -> Self {
        self.with_expr(self.expr.and(expr))
    }

    /// Updates every matching row and returns the rows as stored.
    ///
    /// # Errors
    /// - `InvalidRecordShape` when `U` and `T` target different tables.
    /// - `Build` when `partial` sets no field.
    pub fn update(&self, ctx: &Context, partial: U) -> StoreResult<Vec<T>> {
        if U::schema().target != T::schema().target {
            return Err(StoreError::invalid_shape(
                target::<T>(),
                format!("partial record targets `{}`", U::schema().target),
            ));
        }

        let mapping = extract(&partial, true)?;
        if mapping.is_empty() {
            return Err(StoreError::build(
                Operation::Update,
                target::<T>(),
                "update sets no field",
            ));
        }

        let statement = self
            .render(mapping)
            .map_err(|err| build_error(Operation::Update, target::<T>(), err))?;
        exec::query_records(self.conn, ctx, Operation::Update, target::<T>(), &statement)
    }

    fn render(&self, mapping: Mapping) -> Result<Statement, ClauseError> {
        let table = checked_identifier(target::<T>())?;
        let assignments = mapping
            .targets()
            .map(|column| checked_identifier(column).map(|column| format!("{column} = ?")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sql = format!("UPDATE {table} SET {} WHERE ", assignments.join(", "));
        let mut params = mapping.into_values();
        self.expr.render_into(&mut sql, &mut params)?;
        sql.push_str(" RETURNING ");
        sql.push_str(&T::schema().columns().join(", "));
        Ok(Statement { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::Updater;
    use crate::ctx::Context;
    use crate::db::open_db_in_memory;
    use crate::error::StoreError;
    use crate::model::news::{News, UpdateNewsParams};
    use crate::model::record::extract;
    use crate::model::status::Status;
    use crate::model::title::{Title, UpdateTitleParams};
    use crate::query::Predicate;

    #[test]
    fn set_values_precede_filter_values() {
        let conn = open_db_in_memory().unwrap();
        let updater = Updater::<UpdateTitleParams, Title>::new(&conn)
            .filter(Predicate::equals("titles.hash", "h1"));
        let statement = updater
            .render(extract(&UpdateTitleParams::status(Status::Failed), true).unwrap())
            .unwrap();

        assert!(statement
            .sql
            .starts_with("UPDATE titles SET status = ? WHERE titles.hash = ? RETURNING id,"));
        assert_eq!(statement.params.len(), 2);
    }

    #[test]
    fn empty_partial_is_a_build_error() {
        let conn = open_db_in_memory().unwrap();
        let err = Updater::<UpdateNewsParams, News>::new(&conn)
            .update(&Context::background(), UpdateNewsParams::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Build { .. }));
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let conn = open_db_in_memory().unwrap();
        let err = Updater::<UpdateNewsParams, Title>::new(&conn)
            .update(
                &Context::background(),
                UpdateNewsParams::status(Status::Processed),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecordShape { .. }));
    }
}
