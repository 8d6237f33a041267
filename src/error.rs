use thiserror::Error;

#[cfg(feature = "postgres")]
use deadpool_postgres::PoolError;

#[derive(Debug, Error)]
pub enum DbiError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// Two fields of one record type claim the same result column.
    #[error("column {0} used on multiple fields")]
    DuplicateColumn(String),

    /// A bound column is absent from the query's result columns.
    #[error("query didn't return any columns with name {0}")]
    MissingColumn(String),

    #[error("uneven set of sql and data: {statements} statements, {arg_sets} argument sets")]
    CountMismatch { statements: usize, arg_sets: usize },

    #[error("cannot store column {column} into field {field}: {reason}")]
    FieldConversion {
        column: String,
        field: &'static str,
        reason: String,
    },

    /// Row positions are 1-based.
    #[error("upsert on row {row} failed: {source}")]
    UpsertRow {
        row: usize,
        #[source]
        source: Box<DbiError>,
    },

    /// Set and row positions are 1-based.
    #[error("sql set {set}, row {row}: {source}")]
    TransactionRow {
        set: usize,
        row: usize,
        #[source]
        source: Box<DbiError>,
    },
}

impl DbiError {
    /// True for errors raised before any transaction was opened.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DbiError::ConfigError(_)
                | DbiError::DuplicateColumn(_)
                | DbiError::CountMismatch { .. }
        )
    }
}
