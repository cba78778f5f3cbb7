//! Fluent SELECT / INSERT / UPDATE / DELETE builder.

use super::{quote_ident, Statement};
use crate::core::{DbsetError, Result};
use crate::value::Value;
use std::fmt;

/// Comparison operators accepted in WHERE clauses.
const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IS", "IS NOT",
];

/// How a WHERE clause joins the clause after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => write!(f, "AND"),
            Conjunction::Or => write!(f, "OR"),
        }
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WhereClause {
    column: String,
    operator: String,
    value: Value,
    conjunction: Conjunction,
}

#[derive(Debug, Clone, PartialEq)]
struct OrderClause {
    column: String,
    direction: Direction,
}

/// Accumulates the parts of one statement and renders it.
///
/// The builder is reusable: call [`clear`](Self::clear) between statements.
/// Rendering picks exactly one form: a non-empty insert payload wins over a
/// non-empty update payload, which wins over a plain SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBuilder {
    table: Option<String>,
    select: Vec<String>,
    wheres: Vec<WhereClause>,
    order: Vec<OrderClause>,
    limit: Option<u64>,
    insert: Vec<(String, Value)>,
    update: Vec<(String, Value)>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    pub fn select<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a WHERE clause joined to the next one with AND.
    pub fn where_(
        &mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.where_with(column, operator, value, Conjunction::And)
    }

    pub fn where_with(
        &mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
        conjunction: Conjunction,
    ) -> &mut Self {
        self.wheres.push(WhereClause {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
            conjunction,
        });
        self
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        self.order.push(OrderClause {
            column: column.into(),
            direction,
        });
        self
    }

    /// A limit of zero is treated as no limit.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn insert<I, S>(&mut self, data: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.insert = data.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn update<I, S>(&mut self, data: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.update = data.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Resets every part so the builder behaves like a fresh one.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// True when the pending statement writes (insert or update payload set).
    ///
    /// Writes produce no rows, so the session can close right after executing.
    pub fn needs_close(&self) -> bool {
        !self.insert.is_empty() || !self.update.is_empty()
    }

    /// Renders INSERT, UPDATE or SELECT from the current state.
    pub fn build(&self) -> Result<Statement> {
        let table = self.table_ident()?;
        let mut params = Vec::new();

        let sql = if !self.insert.is_empty() {
            let columns: Vec<String> = self.insert.iter().map(|(c, _)| quote_ident(c)).collect();
            let placeholders = vec!["?"; self.insert.len()].join(", ");
            params.extend(self.insert.iter().map(|(_, v)| v.clone()));
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders
            )
        } else if !self.update.is_empty() {
            let assignments: Vec<String> = self
                .update
                .iter()
                .map(|(c, _)| format!("{} = ?", quote_ident(c)))
                .collect();
            params.extend(self.update.iter().map(|(_, v)| v.clone()));
            let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
            self.render_where(&mut sql, &mut params)?;
            sql
        } else {
            let columns = if self.select.is_empty() {
                "*".to_string()
            } else {
                self.select
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut sql = format!("SELECT {} FROM {}", columns, table);
            self.render_where(&mut sql, &mut params)?;
            self.render_order(&mut sql);
            if let Some(limit) = self.limit.filter(|l| *l > 0) {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            sql
        };

        Ok(Statement::new(sql, params))
    }

    /// Renders `DELETE FROM table [WHERE ...]`; other parts are ignored.
    pub fn build_delete(&self) -> Result<Statement> {
        let mut sql = format!("DELETE FROM {}", self.table_ident()?);
        let mut params = Vec::new();
        self.render_where(&mut sql, &mut params)?;
        Ok(Statement::new(sql, params))
    }

    fn table_ident(&self) -> Result<String> {
        match self.table.as_deref() {
            Some(table) if !table.is_empty() => Ok(quote_ident(table)),
            _ => Err(DbsetError::prepare("", "no table set on statement builder")),
        }
    }

    fn render_where(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<()> {
        if self.wheres.is_empty() {
            return Ok(());
        }

        sql.push_str(" WHERE ");
        let last = self.wheres.len() - 1;
        for (i, clause) in self.wheres.iter().enumerate() {
            let operator = clause.operator.trim().to_uppercase();
            if !OPERATORS.contains(&operator.as_str()) {
                return Err(DbsetError::prepare(
                    sql.as_str(),
                    format!("unsupported operator '{}'", clause.operator),
                ));
            }
            sql.push_str(&format!("{} {} ?", quote_ident(&clause.column), operator));
            params.push(clause.value.clone());
            if i < last {
                sql.push_str(&format!(" {} ", clause.conjunction));
            }
        }
        Ok(())
    }

    fn render_order(&self, sql: &mut String) {
        if self.order.is_empty() {
            return;
        }
        let clauses: Vec<String> = self
            .order
            .iter()
            .map(|o| format!("{} {}", quote_ident(&o.column), o.direction))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.join(", "));
    }
}
