/// Error Module
///
/// This module defines the error type shared by every layer of dbset.
/// Driver failures keep the operation that raised them (connect, prepare,
/// execute) in the variant and carry the driver's own message.
use thiserror::Error;

/// Error type for dbset.
///
/// The variants cover:
/// - Driver failures, split by the operation that failed
/// - Argument/placeholder mismatches caught before anything reaches the driver
/// - Row-to-record mapping failures
/// - Writes that need a key but were given none
/// - Schema declaration and configuration problems
#[derive(Error, Debug)]
pub enum DbsetError {
    /// The database could not be opened (bad path, permissions, pragmas rejected)
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The driver rejected the SQL text (syntax, unknown table or column)
    #[error("Prepare error: {message} (sql: {sql})")]
    Prepare { sql: String, message: String },

    /// The statement was accepted but failed while running (constraints, types)
    #[error("Execution error: {message} (sql: {sql})")]
    Execution { sql: String, message: String },

    /// Placeholder count does not match the supplied arguments
    #[error("Binding arity error: statement has {expected} placeholder(s), {supplied} argument(s) supplied")]
    BindingArity { expected: usize, supplied: usize },

    /// A row could not be turned into a record
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// An update or delete was attempted without a usable `id`
    #[error("Missing key error: `id` is not set for a write to table '{table}'")]
    MissingKey { table: String },

    /// Invalid schema declarations (duplicate columns, empty names)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbsetError {
    pub(crate) fn prepare(sql: &str, message: impl ToString) -> Self {
        DbsetError::Prepare {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn execution(sql: &str, message: impl ToString) -> Self {
        DbsetError::Execution {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }

    /// Returns true for errors reported by the driver itself.
    ///
    /// Only these are subject to [`ErrorPolicy::Collect`](crate::core::config::ErrorPolicy).
    pub fn is_driver_error(&self) -> bool {
        matches!(
            self,
            DbsetError::Connection { .. } | DbsetError::Prepare { .. } | DbsetError::Execution { .. }
        )
    }
}

/// Type alias for Result to use DbsetError as the error type.
pub type Result<T> = std::result::Result<T, DbsetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let conn_err = DbsetError::Connection {
            message: "unable to open database file".to_string(),
        };
        assert!(conn_err.to_string().contains("Connection error"));
        assert!(conn_err.to_string().contains("unable to open"));

        let prep_err = DbsetError::prepare("SELEC 1", "syntax error");
        assert!(prep_err.to_string().contains("Prepare error: syntax error"));
        assert!(prep_err.to_string().contains("SELEC 1"));

        let arity = DbsetError::BindingArity {
            expected: 2,
            supplied: 3,
        };
        assert!(arity.to_string().contains("2 placeholder(s), 3 argument(s)"));

        let missing = DbsetError::MissingKey {
            table: "users".to_string(),
        };
        assert!(missing.to_string().contains("'users'"));
    }

    #[test]
    fn test_driver_error_classification() {
        assert!(DbsetError::execution("INSERT", "UNIQUE constraint failed").is_driver_error());
        assert!(!DbsetError::Mapping("too few values".to_string()).is_driver_error());
        assert!(!DbsetError::BindingArity {
            expected: 1,
            supplied: 0
        }
        .is_driver_error());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DbsetError = io_err.into();
        match err {
            DbsetError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }
}
