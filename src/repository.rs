//! CRUD access to the table behind one [`Record`] type.

use crate::core::db::{table_columns, table_exists, Session};
use crate::core::{DbsetError, Result, SessionConfig};
use crate::mapper::{extract, hydrate, key_value};
use crate::model::{Record, SchemaModel};
use crate::sql::StatementBuilder;
use crate::sync::{self, SyncReport};
use crate::value::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

/// Name of the key column `get`, `update` and `delete` filter on.
pub const KEY_COLUMN: &str = "id";

/// Typed access to one table.
///
/// Owns its session; each call builds a fresh statement and clears the
/// builder afterwards.
#[derive(Debug)]
pub struct Repository<R: Record> {
    session: Session,
    builder: StatementBuilder,
    schema: SchemaModel,
    _record: PhantomData<R>,
}

impl<R: Record> Repository<R> {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self::with_session(Session::new(config), SchemaModel::of::<R>()?))
    }

    fn with_session(session: Session, schema: SchemaModel) -> Self {
        Repository {
            session,
            builder: StatementBuilder::new(),
            schema,
            _record: PhantomData,
        }
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    /// The underlying session, for metadata such as `last_insert_id`.
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Every record in the table, in the database's scan order.
    pub fn get_all(&mut self) -> Result<Vec<R>> {
        self.builder.table(R::TABLE_NAME);
        self.fetch_records()
    }

    /// The record whose `id` equals `id`, if there is one.
    pub fn get(&mut self, id: impl Into<Value>) -> Result<Option<R>> {
        self.builder
            .table(R::TABLE_NAME)
            .where_(KEY_COLUMN, "=", id)
            .limit(1);
        Ok(self.fetch_records()?.into_iter().next())
    }

    /// All records whose `field` equals `value`, in scan order.
    pub fn get_where(&mut self, field: &str, value: impl Into<Value>) -> Result<Vec<R>> {
        self.check_column(field)?;
        self.builder
            .table(R::TABLE_NAME)
            .where_(field, "=", value);
        self.fetch_records()
    }

    /// Inserts the record and returns the new row's id.
    ///
    /// A NULL `id` lets SQLite assign one.
    pub fn add(&mut self, record: &R) -> Result<i64> {
        self.builder.table(R::TABLE_NAME).insert(extract(record));
        self.execute_write()?;
        let id = self.session.last_insert_id();
        debug!("Inserted row {} into '{}'", id, R::TABLE_NAME);
        Ok(id)
    }

    /// Writes every non-key field of the record to the row with its `id`.
    ///
    /// Fails with [`DbsetError::MissingKey`] before touching the database
    /// when the record's `id` is absent or NULL. Returns the number of rows
    /// changed.
    pub fn update(&mut self, record: &R) -> Result<usize> {
        let id = self.require_key(key_value(record))?;

        let key_columns: HashSet<String> = table_columns(&mut self.session, R::TABLE_NAME)?
            .into_iter()
            .filter(|c| c.is_key)
            .map(|c| c.name)
            .collect();
        let payload: Vec<(&str, Value)> = extract(record)
            .into_iter()
            .filter(|(field, _)| !key_columns.contains(*field) && *field != KEY_COLUMN)
            .collect();
        if payload.is_empty() {
            return Ok(0);
        }

        self.builder
            .table(R::TABLE_NAME)
            .update(payload)
            .where_(KEY_COLUMN, "=", id);
        self.execute_write()
    }

    /// Deletes the row with this `id`. Returns the number of rows removed.
    pub fn delete(&mut self, id: impl Into<Value>) -> Result<usize> {
        let id = self.require_key(Some(id.into()))?;
        self.builder.table(R::TABLE_NAME).where_(KEY_COLUMN, "=", id);
        let statement = self.builder.build_delete();
        self.builder.clear();
        Ok(self
            .session
            .execute_statement(statement?, true)?
            .affected_rows())
    }

    /// Creates the table or converges its columns to the record's schema.
    pub fn synchronize(&mut self) -> Result<SyncReport> {
        sync::synchronize(&mut self.session, &self.schema)
    }

    pub fn table_exists(&mut self) -> Result<bool> {
        table_exists(&mut self.session, R::TABLE_NAME)
    }

    pub fn drop_table(&mut self) -> Result<()> {
        sync::drop_table(&mut self.session, R::TABLE_NAME)
    }

    /// Removes every row; returns how many were deleted.
    pub fn clear_table(&mut self) -> Result<usize> {
        sync::clear_table(&mut self.session, R::TABLE_NAME)
    }

    fn require_key(&self, id: Option<Value>) -> Result<Value> {
        match id {
            Some(id) if !id.is_null() => Ok(id),
            _ => Err(DbsetError::MissingKey {
                table: R::TABLE_NAME.to_string(),
            }),
        }
    }

    /// Field names are identifiers, so only known ones are accepted.
    fn check_column(&self, field: &str) -> Result<()> {
        if field == KEY_COLUMN || R::FIELDS.contains(&field) || self.schema.contains(field) {
            Ok(())
        } else {
            Err(DbsetError::prepare(
                "",
                format!("unknown column '{}' for table '{}'", field, R::TABLE_NAME),
            ))
        }
    }

    /// Columns are named explicitly: the mapper is positional, and columns
    /// added by synchronization sit at the end of the live table.
    fn fetch_records(&mut self) -> Result<Vec<R>> {
        self.builder.select(R::FIELDS.iter().copied());
        let statement = self.builder.build();
        self.builder.clear();
        self.session
            .execute_statement(statement?, false)?
            .fetch_all()
            .into_iter()
            .map(hydrate::<R>)
            .collect()
    }

    fn execute_write(&mut self) -> Result<usize> {
        let close_after = self.builder.needs_close();
        let statement = self.builder.build();
        self.builder.clear();
        Ok(self
            .session
            .execute_statement(statement?, close_after)?
            .affected_rows())
    }
}
