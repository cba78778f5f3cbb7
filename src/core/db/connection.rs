/// Connection Management Module
///
/// Opens SQLite connections for sessions and applies the per-connection
/// settings from [`SessionConfig`].

use crate::core::{DbsetError, Result, SessionConfig};
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// Path SQLite treats as a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Returns true when the config points at an in-memory database.
///
/// Such a database lives exactly as long as its connection.
pub fn is_memory(path: &Path) -> bool {
    path.as_os_str() == MEMORY_PATH
}

/// Opens a connection for the given session configuration.
///
/// # Returns
///
/// The open connection, or `DbsetError::Connection` carrying the driver's
/// message when the file cannot be opened or a setting is rejected.
pub fn open_connection(config: &SessionConfig) -> Result<Connection> {
    debug!("Opening database connection to {:?}", config.path);

    let conn = if is_memory(&config.path) {
        Connection::open_in_memory()
    } else {
        Connection::open(&config.path)
    }
    .map_err(connection_error)?;

    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(connection_error)?;

    if let Some(timeout) = config.busy_timeout {
        conn.busy_timeout(timeout).map_err(connection_error)?;
    }

    Ok(conn)
}

fn connection_error(e: rusqlite::Error) -> DbsetError {
    DbsetError::Connection {
        message: e.to_string(),
    }
}
