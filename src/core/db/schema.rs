/// Schema Introspection Module
///
/// Reads the live structure of tables through a [`Session`], so the
/// synchronizer and repository see exactly what the database reports at
/// the time of the call.

use super::session::Session;
use crate::core::Result;
use crate::sql::Arg;
use crate::value::{FromValue, Row, Value};

/// A column as currently defined in the database.
///
/// A point-in-time snapshot; it is not kept in sync with later DDL.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveColumn {
    /// Column name
    pub name: String,
    /// Declared type as SQLite stores it (e.g. "INTEGER", "VARCHAR(255)")
    pub sql_type: String,
    /// Whether the column allows NULL values
    pub nullable: bool,
    /// Whether this column is part of the primary key
    pub is_key: bool,
    /// Default value expression (if any)
    pub default: Option<String>,
    /// Hidden or generated column marker
    pub extra: Option<String>,
}

impl LiveColumn {
    /// Builds a column from a `pragma_table_xinfo` row.
    fn from_pragma_row(row: Row) -> Result<Self> {
        let get = |name: &str| row.get(name).cloned().unwrap_or(Value::Null);
        let extra = match i64::from_value(get("hidden"))? {
            1 => Some("hidden".to_string()),
            2 => Some("virtual generated".to_string()),
            3 => Some("stored generated".to_string()),
            _ => None,
        };
        Ok(LiveColumn {
            name: String::from_value(get("name"))?,
            sql_type: String::from_value(get("type"))?,
            nullable: !bool::from_value(get("notnull"))?,
            is_key: i64::from_value(get("pk"))? > 0,
            default: Option::<String>::from_value(get("dflt_value"))?,
            extra,
        })
    }
}

/// Checks whether a table with exactly this name exists.
pub fn table_exists(session: &mut Session, table_name: &str) -> Result<bool> {
    let row = session
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Arg::from(table_name)],
        )?
        .fetch_one();
    Ok(row.is_some())
}

/// Columns of a table in definition order; empty when the table is missing.
pub fn table_columns(session: &mut Session, table_name: &str) -> Result<Vec<LiveColumn>> {
    session
        .query(
            "SELECT name, type, \"notnull\", dflt_value, pk, hidden FROM pragma_table_xinfo(?)",
            &[Arg::from(table_name)],
        )?
        .fetch_all()
        .into_iter()
        .map(LiveColumn::from_pragma_row)
        .collect()
}

/// Checks whether `column` exists on `table_name` (exact, case-sensitive match).
pub fn column_exists(session: &mut Session, table_name: &str, column: &str) -> Result<bool> {
    Ok(table_columns(session, table_name)?
        .iter()
        .any(|c| c.name == column))
}
