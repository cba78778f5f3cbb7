//! SQL text construction.
//!
//! Nothing in here touches a connection. Identifiers are always emitted
//! double-quoted and values always travel as bound parameters; the only
//! place values become literal text is [`Value::to_literal`](crate::value::Value::to_literal),
//! which is used for logging.

pub mod binder;
pub mod builder;
pub mod ddl;

pub use binder::{bind, Arg, BoundStatement};
pub use builder::{Conjunction, Direction, StatementBuilder};

use crate::value::Value;
use std::fmt;

/// A statement ready to hand to the driver: SQL text with `?` placeholders
/// and the values for them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            sql: sql.into(),
            params,
        }
    }
}

/// A SQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A SQLite identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Quote an identifier, doubling any embedded quotes.
///
/// Always quotes so reserved words like `order` or `group` work as column names.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}
