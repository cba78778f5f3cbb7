//! Declared table schemas and the record descriptor trait.

use crate::core::{DbsetError, Result};
use crate::value::Value;
use serde::Deserialize;
use std::collections::HashSet;

/// A column as declared by the application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type and constraints, emitted verbatim (e.g. `"VARCHAR(255) NOT NULL"`).
    #[serde(rename = "type")]
    pub sql_type: String,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnDefinition {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// The desired column set of one table.
///
/// Read-only after construction; [`SchemaModel::new`] guarantees column
/// names are non-empty and unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    table_name: String,
    columns: Vec<ColumnDefinition>,
}

impl SchemaModel {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Result<Self> {
        let table_name = table_name.into();
        if table_name.trim().is_empty() {
            return Err(DbsetError::Schema("table name must not be empty".to_string()));
        }
        if columns.is_empty() {
            return Err(DbsetError::Schema(format!(
                "table '{}' declares no columns",
                table_name
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.trim().is_empty() {
                return Err(DbsetError::Schema(format!(
                    "table '{}' declares a column with an empty name",
                    table_name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(DbsetError::Schema(format!(
                    "column '{}' declared twice in table '{}'",
                    column.name, table_name
                )));
            }
        }

        Ok(SchemaModel {
            table_name,
            columns,
        })
    }

    /// Builds the schema a [`Record`] type declares.
    pub fn of<R: Record>() -> Result<Self> {
        SchemaModel::new(
            R::TABLE_NAME,
            R::COLUMNS
                .iter()
                .map(|(name, sql_type)| ColumnDefinition::new(*name, *sql_type))
                .collect(),
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Static persistence descriptor for an application record type.
///
/// The mapper never inspects values at runtime to discover shape: field
/// order, column types and constructor arity all come from here. The
/// [`record!`](crate::record) macro implements this trait for plain structs.
pub trait Record: Default {
    /// Table the record is persisted to.
    const TABLE_NAME: &'static str;

    /// Desired columns as `(name, sql_type)` pairs, in creation order.
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// Field names in declaration order. Row values are assigned in this order.
    const FIELDS: &'static [&'static str];

    /// Arity of a positional constructor, if the type has one.
    const CONSTRUCTOR_ARITY: Option<usize> = None;

    /// Positional constructor. Only called when `CONSTRUCTOR_ARITY` matches
    /// the field count; receives exactly that many values.
    fn construct(_values: Vec<Value>) -> Result<Self> {
        Err(DbsetError::Mapping(format!(
            "record for table '{}' has no positional constructor",
            Self::TABLE_NAME
        )))
    }

    /// Assigns one field by name.
    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;

    /// Field values in `FIELDS` order.
    fn field_values(&self) -> Vec<Value>;
}

/// Implements [`Record`] for a struct from a field list.
///
/// Every listed field must implement `Into<Value>`, `Clone` and
/// [`FromValue`](crate::value::FromValue); the struct must implement `Default`.
///
/// ```
/// #[derive(Debug, Default, Clone)]
/// struct User {
///     id: Option<i64>,
///     name: String,
///     age: i64,
/// }
///
/// dbset::record! {
///     User => "users" {
///         id: "INTEGER PRIMARY KEY AUTOINCREMENT",
///         name: "VARCHAR(255)",
///         age: "INT",
///     }
/// }
///
/// use dbset::Record;
/// assert_eq!(User::FIELDS, &["id", "name", "age"]);
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident => $table:literal { $($field:ident : $sql:literal),+ $(,)? }) => {
        impl $crate::model::Record for $ty {
            const TABLE_NAME: &'static str = $table;
            const COLUMNS: &'static [(&'static str, &'static str)] =
                &[$((stringify!($field), $sql)),+];
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn set_field(
                &mut self,
                field: &str,
                value: $crate::value::Value,
            ) -> $crate::core::Result<()> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::value::FromValue::from_value(value).map_err(|e| {
                                let detail = match e {
                                    $crate::core::DbsetError::Mapping(msg) => msg,
                                    other => other.to_string(),
                                };
                                $crate::core::DbsetError::Mapping(format!(
                                    "field '{}' of table '{}': {}",
                                    field, $table, detail
                                ))
                            })?;
                            Ok(())
                        }
                    )+
                    other => Err($crate::core::DbsetError::Mapping(format!(
                        "table '{}' has no field '{}'",
                        $table, other
                    ))),
                }
            }

            fn field_values(&self) -> Vec<$crate::value::Value> {
                vec![$($crate::value::Value::from(self.$field.clone())),+]
            }
        }
    };
}
