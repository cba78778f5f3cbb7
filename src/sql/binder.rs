//! Placeholder expansion and bind-type inference for hand-written templates.
//!
//! Templates use `?` for every placeholder. Each placeholder consumes one
//! [`Arg`] left to right: identifiers are substituted quoted, scalars stay
//! bound parameters, and lists expand into one placeholder per element.

use super::{quote_ident, Statement};
use crate::core::{DbsetError, Result};
use crate::value::Value;

/// One argument for a template placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A table or column name, substituted as a quoted identifier.
    Ident(String),
    /// A single bound value.
    Value(Value),
    /// A sequence of bound values, flattened in order.
    List(Vec<Value>),
}

impl Arg {
    pub fn ident(name: impl Into<String>) -> Self {
        Arg::Ident(name.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Arg::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

macro_rules! arg_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(Value::from(value))
                }
            }
        )*
    };
}

arg_from!(bool, i32, i64, u32, f64, String, &str);

/// A template after placeholder expansion, with its binding descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    /// One bind type tag per value: `s`, `d`, `i` or `b`.
    pub type_tags: String,
    pub values: Vec<Value>,
}

impl BoundStatement {
    /// Substitutes the bound values back into the SQL as typed literals.
    ///
    /// For logs only; the driver always receives `sql` and `values` separately.
    pub fn to_literal_sql(&self) -> String {
        let mut values = self.values.iter();
        let mut out = String::with_capacity(self.sql.len());
        let mut last = 0;
        for pos in placeholder_positions(&self.sql) {
            out.push_str(&self.sql[last..pos]);
            match values.next() {
                Some(value) => out.push_str(&value.to_literal()),
                None => out.push('?'),
            }
            last = pos + 1;
        }
        out.push_str(&self.sql[last..]);
        out
    }

    pub fn into_statement(self) -> Statement {
        Statement::new(self.sql, self.values)
    }
}

impl From<Statement> for BoundStatement {
    fn from(stmt: Statement) -> Self {
        BoundStatement {
            type_tags: stmt.params.iter().map(Value::type_tag).collect(),
            sql: stmt.sql,
            values: stmt.params,
        }
    }
}

/// Byte offsets of `?` placeholders, skipping quoted strings and identifiers.
fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;
    for (i, c) in sql.char_indices() {
        match (quote, c) {
            (None, '\'') | (None, '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '?') => positions.push(i),
            _ => {}
        }
    }
    positions
}

/// Expands `template` against `args`.
///
/// Fails with [`DbsetError::BindingArity`] when the number of placeholders
/// and arguments differ, before anything is sent to the driver.
pub fn bind(template: &str, args: &[Arg]) -> Result<BoundStatement> {
    let positions = placeholder_positions(template);
    if positions.len() != args.len() {
        return Err(DbsetError::BindingArity {
            expected: positions.len(),
            supplied: args.len(),
        });
    }

    let mut sql = String::with_capacity(template.len());
    let mut values = Vec::new();
    let mut last = 0;
    for (pos, arg) in positions.into_iter().zip(args) {
        sql.push_str(&template[last..pos]);
        match arg {
            Arg::Ident(name) => sql.push_str(&quote_ident(name)),
            Arg::Value(value) => {
                sql.push('?');
                values.push(value.clone());
            }
            Arg::List(list) => {
                if list.is_empty() {
                    return Err(DbsetError::prepare(
                        template,
                        "empty list bound to a placeholder",
                    ));
                }
                sql.push_str(&vec!["?"; list.len()].join(", "));
                values.extend(list.iter().cloned());
            }
        }
        last = pos + 1;
    }
    sql.push_str(&template[last..]);

    Ok(BoundStatement {
        type_tags: values.iter().map(Value::type_tag).collect(),
        sql,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_and_values() {
        let bound = bind(
            "SELECT * FROM ? WHERE ? = ?",
            &[Arg::ident("users"), Arg::ident("age"), 30.into()],
        )
        .unwrap();
        assert_eq!(bound.sql, "SELECT * FROM \"users\" WHERE \"age\" = ?");
        assert_eq!(bound.type_tags, "i");
        assert_eq!(bound.values, vec![Value::Integer(30)]);
    }

    #[test]
    fn test_type_tag_inference() {
        let bound = bind(
            "INSERT INTO t VALUES (?, ?, ?, ?, ?)",
            &["a".into(), 1.5.into(), 7.into(), true.into(), Value::Null.into()],
        )
        .unwrap();
        assert_eq!(bound.type_tags, "sdibb");
    }

    #[test]
    fn test_lists_are_flattened_in_order() {
        let bound = bind(
            "SELECT * FROM t WHERE id IN (?) AND name = ?",
            &[Arg::list([3, 1, 2]), "x".into()],
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM t WHERE id IN (?, ?, ?) AND name = ?"
        );
        assert_eq!(bound.type_tags, "iiis");
        assert_eq!(
            bound.values,
            vec![
                Value::Integer(3),
                Value::Integer(1),
                Value::Integer(2),
                Value::from("x")
            ]
        );
    }

    #[test]
    fn test_quoted_question_marks_are_not_placeholders() {
        let bound = bind("SELECT '?', \"a?b\" FROM t WHERE x = ?", &[1.into()]).unwrap();
        assert_eq!(bound.sql, "SELECT '?', \"a?b\" FROM t WHERE x = ?");
        assert_eq!(bound.values.len(), 1);
    }

    #[test]
    fn test_arity_mismatch() {
        match bind("SELECT * FROM t WHERE a = ? AND b = ?", &[1.into()]) {
            Err(DbsetError::BindingArity { expected, supplied }) => {
                assert_eq!(expected, 2);
                assert_eq!(supplied, 1);
            }
            other => panic!("Expected BindingArity error, got {:?}", other),
        }
        assert!(matches!(
            bind("SELECT 1", &[1.into()]),
            Err(DbsetError::BindingArity { expected: 0, supplied: 1 })
        ));
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let result = bind("SELECT * FROM t WHERE id IN (?)", &[Arg::List(vec![])]);
        assert!(matches!(result, Err(DbsetError::Prepare { .. })));
    }

    #[test]
    fn test_literal_rendering_is_type_aware() {
        let bound = bind(
            "UPDATE t SET name = ?, age = ? WHERE id = ?",
            &["O'Brien".into(), 44.into(), Value::Null.into()],
        )
        .unwrap();
        assert_eq!(
            bound.to_literal_sql(),
            "UPDATE t SET name = 'O''Brien', age = 44 WHERE id = NULL"
        );
    }
}
