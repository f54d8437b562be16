//! Composable, parameter-safe filter expressions.
//!
//! # Responsibility
//! - Build boolean filter trees from equality, set membership, semi-joins
//!   and conjunction.
//! - Render a tree to statement text plus bound parameters.
//!
//! # Invariants
//! - Trees are immutable; composing returns a new tree sharing its operands.
//! - Rendered text never contains a value; parameters follow placeholder order.
//! - An empty membership set matches nothing.

use super::clause::{checked_identifier, ClauseError};
use crate::model::value::Value;
use std::sync::Arc;

#[derive(Debug, PartialEq)]
enum Node {
    Always,
    Equals { field: String, value: Value },
    EqualsAny { field: String, values: Vec<Value> },
    InSelect {
        field: String,
        table: String,
        column: String,
        filter: Predicate,
    },
    And(Vec<Predicate>),
}

/// Immutable filter tree. Cloning is cheap and shares structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate(Arc<Node>);

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

impl Predicate {
    /// Matches every row.
    pub fn always() -> Self {
        Self(Arc::new(Node::Always))
    }

    /// `field = value`, or `field IS NULL` when `value` is null.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(Arc::new(Node::Equals {
            field: field.into(),
            value: value.into(),
        }))
    }

    /// `field IN (values)`; matches nothing when `values` is empty.
    pub fn equals_any<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self(Arc::new(Node::EqualsAny {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }))
    }

    /// `field IN (SELECT column FROM table WHERE filter)`.
    ///
    /// Narrows by a related table without joining it, so a row matching
    /// several related rows still appears once.
    pub fn in_select(
        field: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        filter: Predicate,
    ) -> Self {
        Self(Arc::new(Node::InSelect {
            field: field.into(),
            table: table.into(),
            column: column.into(),
            filter,
        }))
    }

    /// Conjunction of `nodes` in the given order.
    pub fn all(nodes: impl IntoIterator<Item = Predicate>) -> Self {
        Self(Arc::new(Node::And(nodes.into_iter().collect())))
    }

    /// Returns `self AND other` without touching either operand.
    pub fn and(&self, other: Predicate) -> Self {
        if self.is_always() {
            return other;
        }
        if other.is_always() {
            return self.clone();
        }
        match &*self.0 {
            Node::And(nodes) => {
                let mut nodes = nodes.clone();
                nodes.push(other);
                Self::all(nodes)
            }
            _ => Self::all([self.clone(), other]),
        }
    }

    /// Whether this tree matches every row.
    pub fn is_always(&self) -> bool {
        match &*self.0 {
            Node::Always => true,
            Node::And(nodes) => nodes.iter().all(Predicate::is_always),
            _ => false,
        }
    }

    /// Number of parameters [`Predicate::to_sql`] binds.
    pub fn param_count(&self) -> usize {
        match &*self.0 {
            Node::Always => 0,
            Node::Equals { value, .. } => usize::from(!value.is_null()),
            Node::EqualsAny { values, .. } => values.len(),
            Node::InSelect { filter, .. } => filter.param_count(),
            Node::And(nodes) => nodes.iter().map(Predicate::param_count).sum(),
        }
    }

    /// Renders the tree to SQL text with `?` placeholders.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>), ClauseError> {
        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.param_count());
        self.render_into(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    pub(crate) fn render_into(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<(), ClauseError> {
        match &*self.0 {
            Node::Always => sql.push_str("1 = 1"),
            Node::Equals { field, value } => {
                sql.push_str(checked_identifier(field)?);
                if value.is_null() {
                    sql.push_str(" IS NULL");
                } else {
                    sql.push_str(" = ?");
                    params.push(value.clone());
                }
            }
            Node::EqualsAny { field, values } => {
                let field = checked_identifier(field)?;
                if values.is_empty() {
                    sql.push_str("1 = 0");
                } else {
                    sql.push_str(field);
                    sql.push_str(" IN (");
                    for (index, value) in values.iter().enumerate() {
                        if index > 0 {
                            sql.push_str(", ");
                        }
                        sql.push('?');
                        params.push(value.clone());
                    }
                    sql.push(')');
                }
            }
            Node::InSelect {
                field,
                table,
                column,
                filter,
            } => {
                sql.push_str(checked_identifier(field)?);
                sql.push_str(" IN (SELECT ");
                sql.push_str(checked_identifier(column)?);
                sql.push_str(" FROM ");
                sql.push_str(checked_identifier(table)?);
                sql.push_str(" WHERE ");
                filter.render_into(sql, params)?;
                sql.push(')');
            }
            Node::And(nodes) if nodes.is_empty() => sql.push_str("1 = 1"),
            Node::And(nodes) => {
                sql.push('(');
                for (index, node) in nodes.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" AND ");
                    }
                    node.render_into(sql, params)?;
                }
                sql.push(')');
            }
        }
        Ok(())
    }
}
