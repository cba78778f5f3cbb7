/// Session Module
///
/// A [`Session`] owns one connection and at most one statement. Every
/// statement goes through the same lifecycle:
///
/// ```text
/// Idle ──prepare──▶ Prepared ──bind+execute──▶ Executing ──fetch/close──▶ Closed
///   ▲                                                                        │
///   └──────────────── (prepare again: implicit close first) ◀────────────────┘
/// ```
///
/// Row-returning statements are read to the end during execute and kept on
/// the session until fetched, the same way a stored result works. Fetching
/// closes the statement and the connection, so the next prepare reconnects.
/// In-memory databases only exist while their connection does; for those the
/// connection is kept until the session is dropped.

use super::connection::{is_memory, open_connection};
use crate::core::{DbsetError, ErrorPolicy, Result, SessionConfig};
use crate::sql::{bind, Arg, BoundStatement, Statement};
use crate::value::{Row, Value};
use rusqlite::{params_from_iter, Connection};
use std::ops::ControlFlow;
use tracing::{debug, trace, warn};

/// Lifecycle state of the session's statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been prepared yet
    Idle,
    /// The driver accepted the SQL; parameters not yet executed
    Prepared,
    /// Executed; results (if any) are waiting to be fetched
    Executing,
    /// Statement finalized and connection released
    Closed,
}

/// One connection plus at most one statement.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    connection: Option<Connection>,
    state: SessionState,
    columns: Vec<String>,
    rows: Vec<Row>,
    num_rows: usize,
    affected_rows: usize,
    last_insert_id: i64,
    query_count: usize,
    errors: Vec<DbsetError>,
}

impl Session {
    /// Creates a session. The connection is opened on the first prepare.
    pub fn new(config: SessionConfig) -> Self {
        Session {
            config,
            connection: None,
            state: SessionState::Idle,
            columns: Vec::new(),
            rows: Vec::new(),
            num_rows: 0,
            affected_rows: 0,
            last_insert_id: 0,
            query_count: 0,
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of statements that reached the driver over the session's life.
    pub fn query_count(&self) -> usize {
        self.query_count
    }

    /// Driver errors kept under [`ErrorPolicy::Collect`].
    pub fn errors(&self) -> &[DbsetError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<DbsetError> {
        std::mem::take(&mut self.errors)
    }

    /// Column names of the current result.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows produced by the last executed statement.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Rows changed by the last executed write.
    pub fn affected_rows(&self) -> usize {
        self.affected_rows
    }

    /// Rowid of the last successful insert on this session's connection.
    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    /// Expands `template` against `args`, then prepares, binds and executes it.
    ///
    /// The connection stays open afterwards so results and metadata can be
    /// read. Any statement still open on the session is closed first.
    pub fn query(&mut self, template: &str, args: &[Arg]) -> Result<&mut Self> {
        let bound = bind(template, args)?;
        self.run(bound, false)?;
        Ok(self)
    }

    /// Like [`query`](Self::query), but closes the statement and connection
    /// right after executing. Metadata remains readable.
    pub fn query_and_close(&mut self, template: &str, args: &[Arg]) -> Result<&mut Self> {
        let bound = bind(template, args)?;
        self.run(bound, true)?;
        Ok(self)
    }

    /// Executes a statement produced by the
    /// [`StatementBuilder`](crate::sql::StatementBuilder).
    pub fn execute_statement(&mut self, statement: Statement, close_after: bool) -> Result<&mut Self> {
        self.run(BoundStatement::from(statement), close_after)?;
        Ok(self)
    }

    fn run(&mut self, bound: BoundStatement, close_after: bool) -> Result<()> {
        if self.state != SessionState::Idle && self.state != SessionState::Closed {
            trace!("Implicitly closing open statement before next prepare");
        }
        self.close_statement();

        debug!(
            sql = %bound.sql,
            types = %bound.type_tags,
            "Executing statement: {}",
            bound.to_literal_sql()
        );

        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => match open_connection(&self.config) {
                Ok(conn) => conn,
                Err(e) => {
                    self.state = SessionState::Closed;
                    return self.fail(e);
                }
            },
        };

        let outcome = self.execute_on(&conn, &bound);
        self.connection = Some(conn);

        match outcome {
            Ok(()) => {
                if close_after {
                    self.close();
                }
                Ok(())
            }
            Err(e) => {
                self.close();
                self.fail(e)
            }
        }
    }

    fn execute_on(&mut self, conn: &Connection, bound: &BoundStatement) -> Result<()> {
        let mut stmt = conn
            .prepare(&bound.sql)
            .map_err(|e| DbsetError::prepare(&bound.sql, e))?;
        self.state = SessionState::Prepared;
        self.query_count += 1;
        trace!("Statement prepared");

        if stmt.parameter_count() != bound.values.len() {
            return Err(DbsetError::BindingArity {
                expected: stmt.parameter_count(),
                supplied: bound.values.len(),
            });
        }
        let params = params_from_iter(bound.values.iter());
        let exec_err = |e: rusqlite::Error| DbsetError::execution(&bound.sql, e);

        if stmt.column_count() > 0 {
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut buffered = Vec::new();
            let mut rows = stmt.query(params).map_err(exec_err)?;
            while let Some(row) = rows.next().map_err(exec_err)? {
                let mut fields = Vec::with_capacity(columns.len());
                for (i, name) in columns.iter().enumerate() {
                    let value = row.get_ref(i).map_err(exec_err)?;
                    fields.push((name.clone(), Value::from(value)));
                }
                buffered.push(Row::new(fields));
            }
            self.num_rows = buffered.len();
            self.columns = columns;
            self.rows = buffered;
        } else {
            self.affected_rows = stmt.execute(params).map_err(exec_err)?;
        }
        self.last_insert_id = conn.last_insert_rowid();
        self.state = SessionState::Executing;
        trace!(rows = self.num_rows, affected = self.affected_rows, "Statement executed");
        Ok(())
    }

    /// Applies the session's error policy to a driver error.
    fn fail(&mut self, err: DbsetError) -> Result<()> {
        if self.config.on_error == ErrorPolicy::Collect && err.is_driver_error() {
            warn!("Collected database error: {}", err);
            self.errors.push(err);
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Visits each result row in order. The callback may stop early with
    /// `ControlFlow::Break`. The session is closed afterwards.
    pub fn fetch_each<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(Row) -> Result<ControlFlow<()>>,
    {
        let rows = std::mem::take(&mut self.rows);
        let mut outcome = Ok(());
        for row in rows {
            match callback(row) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.close();
        outcome
    }

    /// Returns every result row and closes the session.
    ///
    /// A session with no executed statement (e.g. after a collected error)
    /// yields no rows.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        let rows = std::mem::take(&mut self.rows);
        self.close();
        rows
    }

    /// Returns the first result row, if any, and closes the session.
    pub fn fetch_one(&mut self) -> Option<Row> {
        let row = std::mem::take(&mut self.rows).into_iter().next();
        self.close();
        row
    }

    /// Every row of `table`.
    pub fn select_all(&mut self, table: &str) -> Result<Vec<Row>> {
        Ok(self.query("SELECT * FROM ?", &[Arg::ident(table)])?.fetch_all())
    }

    /// The first row of `table` whose `key` column equals `value`.
    pub fn single(&mut self, table: &str, key: &str, value: impl Into<Value>) -> Result<Option<Row>> {
        Ok(self
            .query(
                "SELECT * FROM ? WHERE ? = ? LIMIT 1",
                &[Arg::ident(table), Arg::ident(key), Arg::Value(value.into())],
            )?
            .fetch_one())
    }

    fn close_statement(&mut self) {
        self.columns.clear();
        self.rows.clear();
        self.num_rows = 0;
        self.affected_rows = 0;
    }

    /// Finalizes the statement and releases the connection. Idempotent.
    ///
    /// Metadata of the last execution stays readable until the next prepare.
    pub fn close(&mut self) {
        self.rows.clear();
        // A failed prepare can reopen a connection without leaving Closed
        if !is_memory(&self.config.path) {
            if let Some(conn) = self.connection.take() {
                if let Err((_, e)) = conn.close() {
                    warn!("Error while closing database connection: {}", e);
                }
            }
        }
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            trace!("Session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_session() -> (TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(SessionConfig::new(dir.path().join("test.db")));
        (dir, session)
    }

    fn setup_test_table(session: &mut Session) {
        session
            .query_and_close(
                "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, value REAL)",
                &[],
            )
            .unwrap();
        for (name, value) in [("Alice", 123.45), ("Bob", 678.9)] {
            session
                .query_and_close(
                    "INSERT INTO test (name, value) VALUES (?, ?)",
                    &[name.into(), value.into()],
                )
                .unwrap();
        }
        session
            .query_and_close("INSERT INTO test (name, value) VALUES (NULL, NULL)", &[])
            .unwrap();
    }

    #[test]
    fn test_state_machine() {
        let (_dir, mut session) = file_session();
        assert_eq!(session.state(), SessionState::Idle);

        session.query("SELECT 1 AS one", &[]).unwrap();
        assert_eq!(session.state(), SessionState::Executing);
        assert_eq!(session.num_rows(), 1);

        let rows = session.fetch_all();
        assert_eq!(rows[0].get("one"), Some(&Value::Integer(1)));
        assert_eq!(session.state(), SessionState::Closed);

        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_prepare_implicitly_closes_previous_statement() {
        let (_dir, mut session) = file_session();
        session.query("SELECT 1 AS a UNION ALL SELECT 2", &[]).unwrap();
        assert_eq!(session.num_rows(), 2);

        session.query("SELECT 'x' AS b", &[]).unwrap();
        assert_eq!(session.columns(), &["b".to_string()]);
        let rows = session.fetch_all();
        assert_eq!(rows.len(), 1);
        assert_eq!(session.query_count(), 2);
    }

    #[test]
    fn test_fetch_rows_and_metadata() {
        let (_dir, mut session) = file_session();
        setup_test_table(&mut session);
        assert_eq!(session.last_insert_id(), 3);
        assert_eq!(session.affected_rows(), 1);

        let rows = session
            .query("SELECT * FROM test ORDER BY id", &[])
            .unwrap()
            .fetch_all();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));
        assert_eq!(rows[1].get("value"), Some(&Value::Real(678.9)));
        assert_eq!(rows[2].get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_fetch_each_stops_on_break() {
        let (_dir, mut session) = file_session();
        setup_test_table(&mut session);

        let mut seen = Vec::new();
        session
            .query("SELECT id FROM test ORDER BY id", &[])
            .unwrap()
            .fetch_each(|row| {
                seen.push(row.get("id").cloned());
                Ok(if seen.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })
            .unwrap();
        assert_eq!(seen, vec![Some(Value::Integer(1)), Some(Value::Integer(2))]);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_single_and_select_all() {
        let (_dir, mut session) = file_session();
        setup_test_table(&mut session);

        let bob = session.single("test", "name", "Bob").unwrap().unwrap();
        assert_eq!(bob.get("id"), Some(&Value::Integer(2)));
        assert!(session.single("test", "name", "Nobody").unwrap().is_none());
        assert_eq!(session.select_all("test").unwrap().len(), 3);
    }

    #[test]
    fn test_prepare_error() {
        let (_dir, mut session) = file_session();
        match session.query("SELECT * FROM nonexistent_table", &[]) {
            Err(DbsetError::Prepare { message, .. }) => assert!(message.contains("no such table")),
            other => panic!("Expected Prepare error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_failed_prepare_after_close_releases_connection() {
        let (_dir, mut session) = file_session();
        session.query_and_close("SELECT 1", &[]).unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.connection.is_none());

        assert!(session.query("SELECT * FROM nonexistent_table", &[]).is_err());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.connection.is_none());
    }

    #[test]
    fn test_execution_error() {
        let (_dir, mut session) = file_session();
        session
            .query_and_close("CREATE TABLE u (email TEXT UNIQUE)", &[])
            .unwrap();
        session
            .query_and_close("INSERT INTO u VALUES (?)", &["a@b.c".into()])
            .unwrap();
        match session.query_and_close("INSERT INTO u VALUES (?)", &["a@b.c".into()]) {
            Err(DbsetError::Execution { message, .. }) => assert!(message.contains("UNIQUE")),
            other => panic!("Expected Execution error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_arity_error_reaches_no_driver() {
        let (_dir, mut session) = file_session();
        let result = session.query("SELECT * FROM t WHERE a = ?", &[]);
        assert!(matches!(result, Err(DbsetError::BindingArity { .. })));
        assert_eq!(session.query_count(), 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_connection_error() {
        let mut session = Session::new(SessionConfig::new("/nonexistent/path/database.db"));
        assert!(matches!(
            session.query("SELECT 1", &[]),
            Err(DbsetError::Connection { .. })
        ));
    }

    #[test]
    fn test_collect_policy_keeps_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::new(dir.path().join("c.db")).with_error_policy(ErrorPolicy::Collect);
        let mut session = Session::new(config);

        let rows = session.query("SELECT * FROM missing", &[]).unwrap().fetch_all();
        assert!(rows.is_empty());
        assert_eq!(session.errors().len(), 1);
        assert!(matches!(session.errors()[0], DbsetError::Prepare { .. }));

        // Arity errors are never collected
        assert!(session.query("SELECT ?", &[]).is_err());
        assert_eq!(session.take_errors().len(), 1);
        assert!(session.errors().is_empty());
    }

    #[test]
    fn test_memory_database_survives_close() {
        let mut session = Session::new(SessionConfig::new(":memory:"));
        session.query_and_close("CREATE TABLE m (x INTEGER)", &[]).unwrap();
        session
            .query_and_close("INSERT INTO m VALUES (?)", &[5.into()])
            .unwrap();
        let rows = session.select_all("m").unwrap();
        assert_eq!(rows[0].get("x"), Some(&Value::Integer(5)));
    }
}
