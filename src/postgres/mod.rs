// PostgreSQL module - provides PostgreSQL-specific database functionality
//
// This module is split into several sub-modules:
// - config: Runtime and pool setup from a `DbConfig`
// - params: Parameter conversion between crate and PostgreSQL types
// - query: Value extraction from result rows
// - transaction: The `Transaction` implementation

pub mod config;
pub mod params;
pub mod query;
pub mod transaction;

pub use config::PostgresConnector;
pub use params::Params;
pub use query::postgres_extract_value;
pub use transaction::PostgresTx;
