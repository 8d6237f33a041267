use crate::backend::{Connector, RowSink, Transaction, TxOptions};
use crate::config::DbConfig;
use crate::error::DbiError;
use crate::results::{RowMap, StringRowMap};
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, RowValues};
use crate::unmarshal::Record;
use crate::{batch, executor, transaction, unmarshal};

#[cfg(feature = "postgres")]
use crate::postgres::{PostgresConnector, PostgresTx};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteConnector, SqliteStatement, SqliteTx};

/// Connection to the backend selected in the configuration.
///
/// Every operation runs in its own transaction and is safe to call from several threads
/// at once.
/// ```rust
/// use sql_dbi::prelude::*;
///
/// # fn demo() -> Result<(), DbiError> {
/// let db = Database::open_sqlite(":memory:")?;
/// db.upsert("CREATE TABLE t (id INTEGER, name TEXT)", &[vec![]])?;
/// db.upsert(
///     "INSERT INTO t (id, name) VALUES (?, ?)",
///     &[vec![1.into(), "a".into()], vec![2.into(), "b".into()]],
/// )?;
/// let rows = db.query_string("SELECT name FROM t WHERE id = ?", &[2.into()])?;
/// assert_eq!(rows[0]["name"], "b");
/// # Ok(()) }
/// # demo().unwrap();
/// ```
pub enum Database {
    #[cfg(feature = "postgres")]
    Postgres(PostgresConnector),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnector),
}

/// Transaction of whichever backend a [`Database`] wraps.
pub enum AnyTx<'c> {
    #[cfg(feature = "postgres")]
    Postgres(PostgresTx<'c>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteTx<'c>),
}

/// Prepared statement matching an [`AnyTx`] variant.
pub enum AnyStatement {
    #[cfg(feature = "postgres")]
    Postgres(tokio_postgres::Statement),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStatement),
}

fn mismatched() -> DbiError {
    DbiError::ExecutionError("statement prepared by a different backend".to_string())
}

impl Transaction for AnyTx<'_> {
    type Statement = AnyStatement;

    fn prepare(&mut self, sql: &str) -> Result<AnyStatement, DbiError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyTx::Postgres(tx) => tx.prepare(sql).map(AnyStatement::Postgres),
            #[cfg(feature = "sqlite")]
            AnyTx::Sqlite(tx) => tx.prepare(sql).map(AnyStatement::Sqlite),
        }
    }

    fn execute(&mut self, stmt: &AnyStatement, params: &[RowValues]) -> Result<u64, DbiError> {
        match (self, stmt) {
            #[cfg(feature = "postgres")]
            (AnyTx::Postgres(tx), AnyStatement::Postgres(stmt)) => tx.execute(stmt, params),
            #[cfg(feature = "sqlite")]
            (AnyTx::Sqlite(tx), AnyStatement::Sqlite(stmt)) => tx.execute(stmt, params),
            #[allow(unreachable_patterns)]
            _ => Err(mismatched()),
        }
    }

    fn query(
        &mut self,
        stmt: &AnyStatement,
        params: &[RowValues],
        sink: &mut dyn RowSink,
    ) -> Result<(), DbiError> {
        match (self, stmt) {
            #[cfg(feature = "postgres")]
            (AnyTx::Postgres(tx), AnyStatement::Postgres(stmt)) => tx.query(stmt, params, sink),
            #[cfg(feature = "sqlite")]
            (AnyTx::Sqlite(tx), AnyStatement::Sqlite(stmt)) => tx.query(stmt, params, sink),
            #[allow(unreachable_patterns)]
            _ => Err(mismatched()),
        }
    }

    fn commit(&mut self) -> Result<(), DbiError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyTx::Postgres(tx) => tx.commit(),
            #[cfg(feature = "sqlite")]
            AnyTx::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(&mut self) -> Result<(), DbiError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyTx::Postgres(tx) => tx.rollback(),
            #[cfg(feature = "sqlite")]
            AnyTx::Sqlite(tx) => tx.rollback(),
        }
    }
}

impl Connector for Database {
    type Tx<'c> = AnyTx<'c>;

    fn placeholder_style(&self) -> PlaceholderStyle {
        match self {
            #[cfg(feature = "postgres")]
            Database::Postgres(conn) => conn.placeholder_style(),
            #[cfg(feature = "sqlite")]
            Database::Sqlite(conn) => conn.placeholder_style(),
        }
    }

    fn begin(&self, options: &TxOptions) -> Result<AnyTx<'_>, DbiError> {
        match self {
            #[cfg(feature = "postgres")]
            Database::Postgres(conn) => conn.begin(options).map(AnyTx::Postgres),
            #[cfg(feature = "sqlite")]
            Database::Sqlite(conn) => conn.begin(options).map(AnyTx::Sqlite),
        }
    }
}

impl Database {
    /// Validate `config`, resolve its password, connect and ping.
    ///
    /// # Errors
    /// Returns `DbiError::ConfigError` for an incomplete configuration or a backend that is
    /// not compiled in, otherwise the connection error.
    pub fn open(config: &DbConfig) -> Result<Self, DbiError> {
        config.validate()?;
        let db = match config.driver() {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Database::Postgres(PostgresConnector::connect(config)?),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Database::Sqlite(SqliteConnector::from_config(config)?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(DbiError::ConfigError(format!(
                    "{other:?} support is not enabled in this build"
                )));
            }
        };
        db.ping()?;
        Ok(db)
    }

    /// Open a `SQLite` database file, or `:memory:`.
    ///
    /// # Errors
    /// Returns `DbiError` if the database cannot be opened.
    #[cfg(feature = "sqlite")]
    pub fn open_sqlite(path: &str) -> Result<Self, DbiError> {
        SqliteConnector::open(path).map(Database::Sqlite)
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            Database::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// # Errors
    /// Returns `DbiError` if the database does not answer.
    pub fn ping(&self) -> Result<(), DbiError> {
        match self {
            #[cfg(feature = "postgres")]
            Database::Postgres(conn) => conn.ping(),
            #[cfg(feature = "sqlite")]
            Database::Sqlite(conn) => conn.ping(),
        }
    }

    /// Prepare `sql` without running it, inside a transaction that is rolled back.
    ///
    /// Placeholders are translated first, so neutral `?` markers are accepted.
    ///
    /// # Errors
    /// Returns `DbiError` if the backend rejects the statement.
    pub fn prepare_test(&self, sql: &str) -> Result<(), DbiError> {
        let sql = crate::translation::translate_placeholders(sql, self.placeholder_style());
        let mut tx = self.begin(&TxOptions::read_only())?;
        let prepared = tx.prepare(&sql).map(drop);
        tx.rollback()?;
        prepared
    }

    /// Release the backend. Postgres closes its pool; `SQLite` closes on drop.
    pub fn close(self) {
        match self {
            #[cfg(feature = "postgres")]
            Database::Postgres(conn) => conn.close(),
            #[cfg(feature = "sqlite")]
            Database::Sqlite(conn) => drop(conn),
        }
    }

    /// Rows of one statement keyed by column name.
    ///
    /// # Errors
    /// Returns `DbiError` if the statement or its transaction fails.
    pub fn query(&self, sql: &str, args: &[RowValues]) -> Result<Vec<RowMap>, DbiError> {
        executor::query(self, sql, args)
    }

    /// Rows of one statement with every value rendered as text.
    ///
    /// # Errors
    /// Returns `DbiError` if the statement or its transaction fails.
    pub fn query_string(
        &self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<Vec<StringRowMap>, DbiError> {
        executor::query_string(self, sql, args)
    }

    /// Several statements in one transaction, one result set each.
    ///
    /// # Errors
    /// Returns `DbiError` from the first failing statement; nothing is committed.
    pub fn multi_query<S: AsRef<str>>(
        &self,
        sqls: &[S],
        args: &[Vec<RowValues>],
    ) -> Result<Vec<Vec<RowMap>>, DbiError> {
        executor::multi_query(self, sqls, args)
    }

    /// One statement executed for many argument rows in one transaction.
    ///
    /// # Errors
    /// Returns `DbiError::UpsertRow` naming the failing row; nothing is committed.
    pub fn upsert(&self, sql: &str, rows: &[Vec<RowValues>]) -> Result<(), DbiError> {
        batch::upsert(self, sql, rows)
    }

    /// Statement `n` executed for every row of `row_sets[n]`, all in one transaction.
    ///
    /// # Errors
    /// Returns `DbiError::CountMismatch` for uneven input or `DbiError::TransactionRow`
    /// naming the failing set and row; nothing is committed.
    pub fn transaction<S: AsRef<str>>(
        &self,
        sqls: &[S],
        row_sets: &[Vec<Vec<RowValues>>],
    ) -> Result<(), DbiError> {
        batch::transaction(self, sqls, row_sets)
    }

    /// Append one `T` per result row to `target`.
    ///
    /// # Errors
    /// See [`unmarshal::unmarshal`].
    pub fn unmarshal<T: Record>(
        &self,
        target: &mut Vec<Box<T>>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<(), DbiError> {
        unmarshal::unmarshal(self, &TxOptions::default(), target, sql, args)
    }

    /// Like [`Database::unmarshal`], in a read-only transaction.
    ///
    /// # Errors
    /// See [`unmarshal::unmarshal`].
    pub fn unmarshal_read_only<T: Record>(
        &self,
        target: &mut Vec<Box<T>>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<(), DbiError> {
        unmarshal::unmarshal(self, &TxOptions::read_only(), target, sql, args)
    }

    /// Like [`Database::unmarshal`], with explicit transaction options.
    ///
    /// # Errors
    /// See [`unmarshal::unmarshal`].
    pub fn unmarshal_with_options<T: Record>(
        &self,
        options: &TxOptions,
        target: &mut Vec<Box<T>>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<(), DbiError> {
        unmarshal::unmarshal(self, options, target, sql, args)
    }

    /// Run custom work inside one transaction of this database.
    ///
    /// # Errors
    /// Returns `DbiError` from begin, from `work`, or from commit.
    pub fn with_transaction<T, F>(&self, options: &TxOptions, work: F) -> Result<T, DbiError>
    where
        F: FnOnce(&mut AnyTx<'_>) -> Result<T, DbiError>,
    {
        transaction::run_in_transaction(self, options, work)
    }
}
