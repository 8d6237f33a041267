use std::sync::MutexGuard;

use rusqlite::{Connection, params_from_iter};

use crate::backend::{RowSink, Transaction, TxOptions};
use crate::error::DbiError;
use crate::types::RowValues;

use super::params::Params;
use super::query::sqlite_extract_value;

/// Transaction handle holding the `SQLite` connection until completion.
///
/// Isolation levels are ignored: `SQLite` transactions are always serializable. A
/// read-only transaction sets `PRAGMA query_only` for its lifetime.
pub struct SqliteTx<'c> {
    conn: MutexGuard<'c, Connection>,
    read_only: bool,
    finished: bool,
}

/// Prepared statement tied to a `SQLite` transaction.
///
/// The compiled statement lives in the connection's statement cache; this handle only
/// names it.
#[derive(Debug, Clone)]
pub struct SqliteStatement {
    sql: String,
}

impl<'c> SqliteTx<'c> {
    pub(crate) fn begin(
        conn: MutexGuard<'c, Connection>,
        options: &TxOptions,
    ) -> Result<Self, DbiError> {
        if options.read_only {
            conn.pragma_update(None, "query_only", true)?;
        }
        if let Err(err) = conn.execute_batch("BEGIN DEFERRED") {
            if options.read_only {
                let _ = conn.pragma_update(None, "query_only", false);
            }
            return Err(err.into());
        }
        Ok(Self {
            conn,
            read_only: options.read_only,
            finished: false,
        })
    }

    fn finish(&mut self, sql: &str) -> Result<(), DbiError> {
        let result = self.conn.execute_batch(sql);
        // A failed COMMIT can leave the transaction open.
        if !self.conn.is_autocommit() {
            return result.map_err(DbiError::from);
        }
        self.finished = true;
        let reset = if self.read_only {
            self.conn.pragma_update(None, "query_only", false)
        } else {
            Ok(())
        };
        result?;
        reset.map_err(DbiError::from)
    }
}

impl Transaction for SqliteTx<'_> {
    type Statement = SqliteStatement;

    fn prepare(&mut self, sql: &str) -> Result<SqliteStatement, DbiError> {
        self.conn.prepare_cached(sql)?;
        tracing::debug!(sql, "sqlite statement prepared");
        Ok(SqliteStatement {
            sql: sql.to_owned(),
        })
    }

    fn execute(&mut self, stmt: &SqliteStatement, params: &[RowValues]) -> Result<u64, DbiError> {
        let converted = Params::convert(params);
        let mut prepared = self.conn.prepare_cached(&stmt.sql)?;
        let read_only = prepared.readonly();

        // Stepped to completion so statements that return rows are accepted too.
        let mut rows = prepared.query(params_from_iter(converted.as_values()))?;
        while rows.next()?.is_some() {}
        drop(rows);

        if read_only {
            return Ok(0);
        }
        Ok(self.conn.changes())
    }

    fn query(
        &mut self,
        stmt: &SqliteStatement,
        params: &[RowValues],
        sink: &mut dyn RowSink,
    ) -> Result<(), DbiError> {
        let converted = Params::convert(params);
        let mut prepared = self.conn.prepare_cached(&stmt.sql)?;
        let column_names: Vec<String> = prepared
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();

        let mut rows = prepared.query(params_from_iter(converted.as_values()))?;
        sink.columns(&column_names)?;

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_names.len());
            for idx in 0..column_names.len() {
                values.push(sqlite_extract_value(row, idx)?);
            }
            sink.row(values)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DbiError> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DbiError> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.rollback();
        }
    }
}
