/// Core Module for dbset
///
/// This module contains the shared infrastructure the mapping layer is built
/// on: the error type, configuration, and the database session and schema
/// introspection.

pub mod config;
pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use config::{ErrorPolicy, SessionConfig};
pub use error::{DbsetError, Result};
