//! Thin synchronous layer over Postgres and `SQLite`.
//!
//! Statements are written with neutral `?` placeholders and rewritten for the active
//! backend. Every public operation runs inside its own transaction: it commits when all of
//! its work succeeds and rolls back otherwise.

pub mod backend;
pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod results;
pub mod transaction;
pub mod translation;
pub mod types;
pub mod unmarshal;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use backend::{Connector, IsolationLevel, RowSink, Transaction, TxOptions};
pub use config::{DbConfig, SslMode};
pub use database::{AnyStatement, AnyTx, Database};
pub use error::DbiError;
pub use results::{RowMap, StringRowMap};
pub use translation::{PlaceholderStyle, translate_placeholders};
pub use types::{DatabaseType, RowValues};
pub use unmarshal::{FromRowValue, Record};

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("enable at least one of the `postgres` or `sqlite` features");
