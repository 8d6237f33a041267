//! The seam between the generic operations and a concrete driver.
//!
//! A [`Connector`] hands out [`Transaction`]s; everything the crate does happens inside
//! one. Result rows are pushed into a [`RowSink`] so that a backend can stream rows straight
//! off its cursor without handing out borrows of driver state.

use crate::error::DbiError;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Isolation level requested for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Options used when opening a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub read_only: bool,
    pub isolation: Option<IsolationLevel>,
}

impl TxOptions {
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            isolation: None,
        }
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }
}

/// Receives the output of one query.
///
/// `columns` is called exactly once, before any row. Returning an error from either
/// method stops the iteration and the error is surfaced by [`Transaction::query`].
pub trait RowSink {
    fn columns(&mut self, columns: &[String]) -> Result<(), DbiError>;

    /// One row, values in column order, freshly allocated per row.
    fn row(&mut self, values: Vec<RowValues>) -> Result<(), DbiError>;
}

/// An open transaction on a backend connection.
///
/// Implementations are not required to roll back on drop; [`crate::transaction::run_in_transaction`]
/// guarantees that.
pub trait Transaction {
    /// A statement prepared inside this transaction; released when dropped.
    type Statement;

    /// Prepare `sql` exactly as given; placeholder translation happens before this call.
    ///
    /// # Errors
    /// Returns `DbiError` if the backend rejects the statement.
    fn prepare(&mut self, sql: &str) -> Result<Self::Statement, DbiError>;

    /// Execute a prepared statement and return the affected row count.
    ///
    /// # Errors
    /// Returns `DbiError` if parameter conversion or execution fails.
    fn execute(&mut self, stmt: &Self::Statement, params: &[RowValues]) -> Result<u64, DbiError>;

    /// Run a prepared statement and stream its result into `sink`.
    ///
    /// # Errors
    /// Returns `DbiError` on execution or read faults, or whatever `sink` returned.
    fn query(
        &mut self,
        stmt: &Self::Statement,
        params: &[RowValues],
        sink: &mut dyn RowSink,
    ) -> Result<(), DbiError>;

    /// # Errors
    /// Returns `DbiError` if the backend refuses to commit.
    fn commit(&mut self) -> Result<(), DbiError>;

    /// # Errors
    /// Returns `DbiError` if the backend refuses to roll back.
    fn rollback(&mut self) -> Result<(), DbiError>;
}

/// Supplies transactions on a live connection.
pub trait Connector {
    type Tx<'c>: Transaction
    where
        Self: 'c;

    /// Placeholder syntax the backend speaks.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// # Errors
    /// Returns `DbiError` if no connection is available or `BEGIN` fails.
    fn begin(&self, options: &TxOptions) -> Result<Self::Tx<'_>, DbiError>;
}
