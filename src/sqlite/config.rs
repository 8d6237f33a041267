use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::backend::{Connector, TxOptions};
use crate::config::DbConfig;
use crate::error::DbiError;
use crate::translation::PlaceholderStyle;

use super::transaction::SqliteTx;

/// A single `SQLite` connection shared by all calls; transactions take turns on it.
pub struct SqliteConnector {
    conn: Mutex<Connection>,
}

impl SqliteConnector {
    /// Open the database at `path` (`:memory:` for a private in-memory database).
    ///
    /// # Errors
    /// Returns `DbiError` if the database cannot be opened or initialized.
    pub fn open(path: &str) -> Result<Self, DbiError> {
        let conn = Connection::open(path)?;
        if path != ":memory:" {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        tracing::debug!(path, "sqlite database opened");
        Ok(Self::from_connection(conn))
    }

    /// # Errors
    /// Returns `DbiError::ConfigError` if the database path is missing, or the open error.
    pub fn from_config(config: &DbConfig) -> Result<Self, DbiError> {
        config.validate()?;
        Self::open(&config.name)
    }

    /// Wrap an already opened connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// A panic inside a previous transaction poisons the mutex; the guard's rollback
    /// already restored the connection, so the poison is cleared.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.conn.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    /// # Errors
    /// Returns `DbiError` if the connection does not answer.
    pub fn ping(&self) -> Result<(), DbiError> {
        self.lock().execute_batch("SELECT 1")?;
        Ok(())
    }
}

impl Connector for SqliteConnector {
    type Tx<'c> = SqliteTx<'c>;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    fn begin(&self, options: &TxOptions) -> Result<SqliteTx<'_>, DbiError> {
        SqliteTx::begin(self.lock(), options)
    }
}
