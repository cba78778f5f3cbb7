// Core infrastructure modules
pub mod core;

// Mapping and schema modules
pub mod mapper;
pub mod model;
pub mod repository;
pub mod sql;
pub mod sync;
pub mod value;

pub use crate::core::{DbsetError, ErrorPolicy, Result, SessionConfig};
pub use crate::core::db::{Session, SessionState};
pub use model::{ColumnDefinition, Record, SchemaModel};
pub use repository::Repository;
pub use value::{FromValue, Row, Value};
