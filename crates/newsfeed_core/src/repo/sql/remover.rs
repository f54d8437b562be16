//! Relational deletes.
//!
//! # Invariants
//! - Removing zero rows is `NotFound`.
//! - Joined removals only delete rows of the builder's own table.

use super::selector::target;
use crate::ctx::Context;
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::SqlRecord;
use crate::query::clause::checked_identifier;
use crate::query::{ClauseError, Join, Predicate};
use crate::repo::exec::{self, Binding, build_error, Statement};
use std::marker::PhantomData;

/// `DELETE` builder for rows of `T`.
pub struct Remover<'c, T> {
    conn: Binding<'c>,
    expr: Predicate,
    joins: Vec<Join>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Remover<'_, T> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn,
            expr: self.expr.clone(),
            joins: self.joins.clone(),
            _record: PhantomData,
        }
    }
}

impl<'c, T: SqlRecord> Remover<'c, T> {
    pub fn new(conn: impl Into<Binding<'c>>) -> Self {
        Self {
            conn: conn.into(),
            expr: Predicate::always(),
            joins: Vec::new(),
            _record: PhantomData,
        }
    }

    pub fn with_expr(&self, expr: Predicate) -> Self {
        Self {
            expr,
            ..self.clone()
        }
    }

    pub fn filter(&self, expr: Predicate) -> Self {
        self.with_expr(self.expr.and(expr))
    }

    /// Scopes the removal by a related table.
    pub fn join(&self, join: Join) -> Self {
        let mut next = self.clone();
        next.joins.push(join);
        next
    }

    /// Deletes every matching row and returns how many were removed.
    ///
    /// # Errors
    /// - `NotFound` when nothing matched.
    pub fn remove(&self, ctx: &Context) -> StoreResult<usize> {
        let statement = self
            .render()
            .map_err(|err| build_error(Operation::Remove, target::<T>(), err))?;
        let removed = exec::execute(
            self.conn,
            ctx,
            Operation::Remove,
            target::<T>(),
            &statement,
        )?;
        if removed == 0 {
            return Err(StoreError::not_found(target::<T>()));
        }
        Ok(removed)
    }

    fn render(&self) -> Result<Statement, ClauseError> {
        let table = checked_identifier(target::<T>())?;
        let mut params = Vec::with_capacity(self.expr.param_count());
        let mut sql = format!("DELETE FROM {table} WHERE ");

        if self.joins.is_empty() {
            self.expr.render_into(&mut sql, &mut params)?;
        } else {
            sql.push_str(&format!("rowid IN (SELECT {table}.rowid FROM {table}"));
            for join in &self.joins {
                join.render_into(&mut sql, &mut params)?;
            }
            sql.push_str(" WHERE ");
            self.expr.render_into(&mut sql, &mut params)?;
            sql.push(')');
        }
        Ok(Statement { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::Remover;
    use crate::db::open_db_in_memory;
    use crate::model::links::NewsChannel;
    use crate::query::{Join, Predicate};

    #[test]
    fn joined_removal_targets_own_rowids() {
        let conn = open_db_in_memory().unwrap();
        let statement = Remover::<NewsChannel>::new(&conn)
            .filter(Predicate::equals_any("news.source", ["wire"]))
            .join(Join::inner("news", "news.id", "news_channels.news_id"))
            .render()
            .unwrap();

        assert_eq!(
            statement.sql,
            "DELETE FROM news_channels WHERE rowid IN (SELECT news_channels.rowid FROM news_channels \
             INNER JOIN news ON news.id = news_channels.news_id WHERE news.source IN (?))"
        );
        assert_eq!(statement.params.len(), 1);
    }
}
