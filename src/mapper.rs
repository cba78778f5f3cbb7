//! Row ⇄ record mapping driven by the [`Record`] descriptor.
//!
//! Rows are matched to fields by position, not by name: the row's column
//! order must follow the record's field declaration order. Repositories
//! select `*` from tables created from the record's own schema, which keeps
//! the two in step.

use crate::core::{DbsetError, Result};
use crate::model::Record;
use crate::value::{Row, Value};

/// Builds a record from a row.
///
/// When the record has a positional constructor taking exactly as many
/// values as it has fields, that constructor receives the first N values;
/// fewer than N values is an error. Otherwise the record starts from
/// `Default` and fields are assigned in declaration order until every field
/// is filled or the row runs out. Extra columns are ignored either way.
pub fn hydrate<R: Record>(row: Row) -> Result<R> {
    hydrate_values(row.into_values())
}

/// Same as [`hydrate`] for a bare value sequence.
pub fn hydrate_values<R, I>(values: I) -> Result<R>
where
    R: Record,
    I: IntoIterator<Item = Value>,
{
    let field_count = R::FIELDS.len();

    if R::CONSTRUCTOR_ARITY == Some(field_count) {
        let values: Vec<Value> = values.into_iter().take(field_count).collect();
        if values.len() < field_count {
            return Err(DbsetError::Mapping(format!(
                "record for table '{}' needs {} values, row has {}",
                R::TABLE_NAME,
                field_count,
                values.len()
            )));
        }
        return R::construct(values);
    }

    let mut record = R::default();
    for (field, value) in R::FIELDS.iter().zip(values) {
        record.set_field(field, value)?;
    }
    Ok(record)
}

/// The record's fields paired with their values, in declaration order.
pub fn extract<R: Record>(record: &R) -> Vec<(&'static str, Value)> {
    R::FIELDS
        .iter()
        .copied()
        .zip(record.field_values())
        .collect()
}

/// Value of the conventional `id` field, if the record has one.
pub fn key_value<R: Record>(record: &R) -> Option<Value> {
    extract(record)
        .into_iter()
        .find(|(field, _)| *field == "id")
        .map(|(_, value)| value)
}
