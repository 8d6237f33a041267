// SQLite module - provides SQLite-specific database functionality
//
// This module is split into several sub-modules:
// - config: Opening the connection from a `DbConfig`
// - params: Parameter conversion between crate and SQLite types
// - query: Value extraction from result rows
// - transaction: The `Transaction` implementation

pub mod config;
pub mod params;
pub mod query;
pub mod transaction;

pub use config::SqliteConnector;
pub use params::Params;
pub use query::sqlite_extract_value;
pub use transaction::{SqliteStatement, SqliteTx};
