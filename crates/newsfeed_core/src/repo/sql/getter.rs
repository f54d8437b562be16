//! Single-row relational reads.
//!
//! # Invariants
//! - `get` distinguishes zero, one and several matches.
//! - `first` never reports several matches; it is meant for ordered lookups.

use super::selector::{target, Selector};
use crate::ctx::Context;
use crate::error::{Operation, StoreError, StoreResult};
use crate::model::record::SqlRecord;
use crate::query::{Direction, Join, Predicate};
use crate::repo::exec::Binding;

/// At-most-one lookup over records of type `T`.
pub struct Getter<'c, T> {
    selector: Selector<'c, T>,
}

impl<T> Clone for Getter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            selector: self.selector.clone(),
        }
    }
}

impl<'c, T: SqlRecord> Getter<'c, T> {
    pub fn new(conn: impl Into<Binding<'c>>) -> Self {
        Self {
            selector: Selector::new(conn),
        }
    }

    pub fn with_expr(&self, expr: Predicate) -> Self {
        Self {
            selector: self.selector.with_expr(expr),
        }
    }

    pub fn filter(&self, expr: Predicate) -> Self {
        Self {
            selector: self.selector.filter(expr),
        }
    }

    pub fn join(&self, join: Join) -> Self {
        Self {
            selector: self.selector.join(join),
        }
    }

    pub fn order(&self, field: impl Into<String>, direction: Direction) -> Self {
        Self {
            selector: self.selector.order(field, direction),
        }
    }

    /// Returns the only matching record, `None` when nothing matches.
    ///
    /// # Errors
    /// - `MultipleRows` when more than one record matches.
    pub fn get(&self, ctx: &Context) -> StoreResult<Option<T>> {
        let mut records = self.selector.limit(2).fetch(ctx, Operation::Get)?;
        if records.len() > 1 {
            return Err(StoreError::MultipleRows {
                entity: target::<T>().to_string(),
            });
        }
        Ok(records.pop())
    }

    /// Returns the first record in the configured order.
    pub fn first(&self, ctx: &Context) -> StoreResult<Option<T>> {
        let mut records = self.selector.limit(1).fetch(ctx, Operation::Get)?;
        Ok(records.pop())
    }
}
