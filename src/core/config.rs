use crate::core::{DbsetError, Result};
use crate::model::{ColumnDefinition, SchemaModel};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a session does with driver errors (connect, prepare, execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Return the error to the caller.
    #[default]
    Raise,
    /// Log it, keep it on the session and carry on with an empty result.
    /// Callers must check [`Session::errors`](crate::core::db::Session::errors).
    Collect,
}

/// Settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// SQLite database file, or `:memory:`.
    pub path: PathBuf,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
    pub on_error: ErrorPolicy,
}

impl SessionConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionConfig {
            path: path.into(),
            busy_timeout: None,
            foreign_keys: true,
            on_error: ErrorPolicy::Raise,
        }
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }
}

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// Database-related configuration.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
    pub on_error: Option<ErrorPolicy>,
}

/// One declared table.
#[derive(Debug, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            path: self.database.path.clone(),
            busy_timeout: self.database.busy_timeout_ms.map(Duration::from_millis),
            foreign_keys: self.database.foreign_keys.unwrap_or(true),
            on_error: self.database.on_error.unwrap_or_default(),
        }
    }

    /// Validated schemas for every declared table, in file order.
    pub fn schemas(&self) -> Result<Vec<SchemaModel>> {
        self.tables
            .iter()
            .map(|t| SchemaModel::new(t.name.clone(), t.columns.clone()))
            .collect()
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| DbsetError::Config(e.to_string()))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbset::core::config::load_config("dbset.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
