//! Statement fragments shared by the relational builders.
//!
//! # Responsibility
//! - Validate identifiers before they are spliced into statement text.
//! - Describe joins and ordering as plain values.
//!
//! # Invariants
//! - Only validated identifiers and fixed keywords reach statement text;
//!   every value is a bound parameter.

use super::predicate::Predicate;
use crate::model::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid identifier regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClauseError {
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
}

/// `column` or `table.column`.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

pub(crate) fn checked_identifier(name: &str) -> Result<&str, ClauseError> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(ClauseError::InvalidIdentifier(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// `INNER JOIN table ON left = right [AND (filter)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    table: String,
    left: String,
    right: String,
    filter: Predicate,
}

impl Join {
    pub fn inner(
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            left: left.into(),
            right: right.into(),
            filter: Predicate::always(),
        }
    }

    /// Restricts joined rows with `filter`, ANDed onto any earlier filter.
    pub fn filtered(&self, filter: Predicate) -> Self {
        Self {
            filter: self.filter.and(filter),
            ..self.clone()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn render_into(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<(), ClauseError> {
        sql.push_str(" INNER JOIN ");
        sql.push_str(checked_identifier(&self.table)?);
        sql.push_str(" ON ");
        sql.push_str(checked_identifier(&self.left)?);
        sql.push_str(" = ");
        sql.push_str(checked_identifier(&self.right)?);
        if !self.filter.is_always() {
            sql.push_str(" AND ");
            self.filter.render_into(sql, params)?;
        }
        Ok(())
    }
}

/// Renders ` ORDER BY a ASC, b DESC`; empty when `orders` is empty.
pub(crate) fn render_order_by(sql: &mut String, orders: &[Order]) -> Result<(), ClauseError> {
    for (index, order) in orders.iter().enumerate() {
        sql.push_str(if index == 0 { " ORDER BY " } else { ", " });
        sql.push_str(checked_identifier(&order.field)?);
        sql.push(' ');
        sql.push_str(order.direction.as_sql());
    }
    Ok(())
}

/// Renders `LIMIT`/`OFFSET` with bound values; offset without limit uses
/// `LIMIT -1`.
pub(crate) fn render_limit_offset(
    sql: &mut String,
    params: &mut Vec<Value>,
    limit: Option<u32>,
    offset: Option<u32>,
) {
    match (limit, offset) {
        (Some(limit), offset) => {
            sql.push_str(" LIMIT ?");
            params.push(Value::from(limit));
            if let Some(offset) = offset {
                sql.push_str(" OFFSET ?");
                params.push(Value::from(offset));
            }
        }
        (None, Some(offset)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::from(offset));
        }
        (None, None) => {}
    }
}
