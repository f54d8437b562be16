//! Multi-row relational reads.
//!
//! # Responsibility
//! - Render `SELECT` statements from a predicate, joins, ordering and
//!   pagination.
//! - Decode every returned row through the record's own metadata.
//!
//! # Invariants
//! - Chain methods never mutate the receiver.
//! - Zero matching rows is `NotFound`.
//! - Without an explicit order, row order (and so pagination) is
//!   backend-defined.

use crate::ctx::Context;
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::SqlRecord;
use crate::model::value::Value;
use crate::query::clause::{checked_identifier, render_limit_offset, render_order_by};
use crate::query::{ClauseError, Direction, Join, Order, Predicate};
use crate::repo::exec::{self, Binding, build_error, Statement};
use rusqlite::params_from_iter;
use std::marker::PhantomData;

/// Immutable `SELECT` builder over records of type `T`.
pub struct Selector<'c, T> {
    conn: Binding<'c>,
    expr: Predicate,
    joins: Vec<Join>,
    orders: Vec<Order>,
    limit: Option<u32>,
    offset: Option<u32>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Selector<'_, T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            expr: self.expr.clone(),
            joins: self.joins.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            _record: PhantomData,
        }
    }
}

impl<'c, T: SqlRecord> Selector<'c, T> {
    pub fn new(conn: impl Into<Binding<'c>>) -> Self {
        Self {
            conn: conn.into(),
            expr: Predicate::always(),
            joins: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            _record: PhantomData,
        }
    }

    /// Replaces the filter.
    pub fn with_expr(&self, expr: Predicate) -> Self {
        Self {
            expr,
            ..self.clone()
        }
    }

    /// ANDs `expr` onto the current filter.
    pub fn filter(&self, expr: Predicate) -> Self {
        self.with_expr(self.expr.and(expr))
    }

    pub fn join(&self, join: Join) -> Self {
        let mut next = self.clone();
        next.joins.push(join);
        next
    }

    /// Appends an ordering term; earlier terms take precedence.
    pub fn order(&self, field: impl Into<String>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.orders.push(Order::new(field, direction));
        next
    }

    pub fn limit(&self, limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..self.clone()
        }
    }

    pub fn offset(&self, offset: u32) -> Self {
        Self {
            offset: Some(offset),
            ..self.clone()
        }
    }

    pub fn expr(&self) -> &Predicate {
        &self.expr
    }

    /// Runs the query.
    ///
    /// # Errors
    /// - `NotFound` when no row matches.
    /// - `QueryFailed` / `Cancelled` on backend failure.
    pub fn select(&self, ctx: &Context) -> StoreResult<Vec<T>> {
        let records = self.fetch(ctx, Operation::Select)?;
        if records.is_empty() {
            return Err(StoreError::not_found(target::<T>()));
        }
        Ok(records)
    }

    /// Counts matching rows, ignoring ordering and pagination.
    pub fn count(&self, ctx: &Context) -> StoreResult<u64> {
        let statement = self
            .render_count()
            .map_err(|err| build_error(Operation::Count, target::<T>(), err))?;
        exec::run(
            self.conn,
            ctx,
            Operation::Count,
            target::<T>(),
            &statement.sql,
            |conn| {
                conn.query_row(
                    &statement.sql,
                    params_from_iter(statement.params.iter()),
                    |row| row.get::<_, i64>(0),
                )
            },
        )
        .map(|count| u64::try_from(count).unwrap_or_default())
    }

    /// Runs the query without the empty-result check.
    pub(crate) fn fetch(&self, ctx: &Context, op: Operation) -> StoreResult<Vec<T>> {
        let statement = self
            .render()
            .map_err(|err| build_error(op, target::<T>(), err))?;
        exec::query_records(self.conn, ctx, op, target::<T>(), &statement)
    }

    pub(crate) fn render(&self) -> Result<Statement, ClauseError> {
        let schema = T::schema();
        let table = checked_identifier(schema.target)?;
        let columns = schema
            .stored_fields()
            .map(|meta| format!("{table}.{col} AS {col}", col = meta.target))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut params = Vec::with_capacity(self.expr.param_count());
        self.render_filter(&mut sql, &mut params)?;
        render_order_by(&mut sql, &self.orders)?;
        render_limit_offset(&mut sql, &mut params, self.limit, self.offset);
        Ok(Statement { sql, params })
    }

    fn render_count(&self) -> Result<Statement, ClauseError> {
        let table = checked_identifier(T::schema().target)?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let mut params = Vec::with_capacity(self.expr.param_count());
        self.render_filter(&mut sql, &mut params)?;
        Ok(Statement { sql, params })
    }

    fn render_filter(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<(), ClauseError> {
        for join in &self.joins {
            join.render_into(sql, params)?;
        }
        sql.push_str(" WHERE ");
        self.expr.render_into(sql, params)
    }
}

pub(crate) fn target<T: SqlRecord>() -> &'static str {
    T::schema().target
}

#[cfg(test)]
mod tests {
    use super::Selector;
    use crate::db::open_db_in_memory;
    use crate::model::title::Title;
    use crate::model::value::Value;
    use crate::query::{Direction, Join, Predicate};

    #[test]
    fn renders_qualified_columns_and_bound_pagination() {
        let conn = open_db_in_memory().unwrap();
        let selector = Selector::<Title>::new(&conn)
            .filter(Predicate::equals_any("titles.status", ["pending"]))
            .order("titles.created_at", Direction::Desc)
            .limit(10)
            .offset(5);

        let statement = selector.render().unwrap();
        assert!(statement
            .sql
            .starts_with("SELECT titles.id AS id, titles.created_at AS created_at"));
        assert!(statement.sql.ends_with(
            " FROM titles WHERE titles.status IN (?) ORDER BY titles.created_at DESC LIMIT ? OFFSET ?"
        ));
        assert_eq!(
            statement.params,
            vec![Value::from("pending"), Value::Integer(10), Value::Integer(5)]
        );
    }

    #[test]
    fn branches_are_independent() {
        let conn = open_db_in_memory().unwrap();
        let base = Selector::<Title>::new(&conn);
        let pending = base.filter(Predicate::equals("titles.status", "pending"));
        let joined = base.join(Join::inner("raw_news", "raw_news.title_id", "titles.id"));

        assert!(base.render().unwrap().sql.ends_with("FROM titles WHERE 1 = 1"));
        assert!(pending
            .render()
            .unwrap()
            .sql
            .ends_with("FROM titles WHERE titles.status = ?"));
        assert!(joined
            .render()
            .unwrap()
            .sql
            .contains("FROM titles INNER JOIN raw_news ON raw_news.title_id = titles.id WHERE"));
    }
}
