//! DDL rendering for the schema synchronizer and table helpers.

use super::quote_ident;
use crate::core::{DbsetError, Result};
use crate::model::{ColumnDefinition, SchemaModel};

/// Column types are emitted verbatim, so anything that could end the
/// statement or comment out the rest of it is refused.
fn checked_type<'a>(column: &'a ColumnDefinition) -> Result<&'a str> {
    let sql_type = column.sql_type.trim();
    if sql_type.is_empty() {
        return Err(DbsetError::Schema(format!(
            "column '{}' has an empty type",
            column.name
        )));
    }
    if sql_type.contains(';') || sql_type.contains("--") || sql_type.contains("/*") {
        return Err(DbsetError::Schema(format!(
            "column '{}' has an unsafe type declaration '{}'",
            column.name, sql_type
        )));
    }
    Ok(sql_type)
}

fn column_def(column: &ColumnDefinition) -> Result<String> {
    Ok(format!("{} {}", quote_ident(&column.name), checked_type(column)?))
}

/// `CREATE TABLE "t" (...)` with columns in declared order.
pub fn create_table(schema: &SchemaModel) -> Result<String> {
    let columns = schema
        .columns()
        .iter()
        .map(column_def)
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(schema.table_name()),
        columns.join(",\n    ")
    ))
}

pub fn add_column(table: &str, column: &ColumnDefinition) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column_def(column)?
    ))
}

pub fn drop_column(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    )
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE {}", quote_ident(table))
}

/// SQLite has no TRUNCATE; an unqualified DELETE takes the truncate path.
pub fn clear_table(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}
