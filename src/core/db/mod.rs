/// Database Module
///
/// The database layer is split into three concerns:
/// - **Connection Management** (`connection.rs`): opening SQLite connections with session settings
/// - **Sessions** (`session.rs`): the prepare → bind → execute → fetch → close lifecycle
/// - **Schema Introspection** (`schema.rs`): live table and column metadata
///
/// All operations use `DbsetError` for consistent error propagation.
pub mod connection;
pub mod schema;
pub mod session;

pub use connection::open_connection;
pub use schema::{column_exists, table_columns, table_exists, LiveColumn};
pub use session::{Session, SessionState};
