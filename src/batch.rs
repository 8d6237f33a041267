use crate::backend::{Connector, Transaction, TxOptions};
use crate::error::DbiError;
use crate::transaction::run_in_transaction;
use crate::translation::translate_placeholders;
use crate::types::RowValues;

/// Prepare `sql` once and execute it for every row of `rows`, in order, in one transaction.
///
/// The first failing row aborts the rest and rolls back all rows, including the ones that
/// already ran.
///
/// # Errors
/// Returns `DbiError::UpsertRow` (1-based row) when a row fails, or the prepare/begin/commit
/// error.
pub fn upsert<C>(connector: &C, sql: &str, rows: &[Vec<RowValues>]) -> Result<(), DbiError>
where
    C: Connector + ?Sized,
{
    let sql = translate_placeholders(sql, connector.placeholder_style());

    run_in_transaction(connector, &TxOptions::default(), |tx| {
        let stmt = tx.prepare(&sql)?;
        for (idx, row) in rows.iter().enumerate() {
            tx.execute(&stmt, row).map_err(|source| DbiError::UpsertRow {
                row: idx + 1,
                source: Box::new(source),
            })?;
        }
        tracing::debug!(rows = rows.len(), "upsert applied");
        Ok(())
    })
}

/// Prepare every statement of `sqls` up front, then run statement `n` for each row of
/// `row_sets[n]`, all inside one transaction.
///
/// `sqls` and `row_sets` must have the same length; that is checked before any
/// transaction is opened.
///
/// # Errors
/// Returns `DbiError::CountMismatch` for uneven input, `DbiError::TransactionRow` (1-based
/// set and row) when a row fails, or the prepare/begin/commit error.
pub fn transaction<C, S>(
    connector: &C,
    sqls: &[S],
    row_sets: &[Vec<Vec<RowValues>>],
) -> Result<(), DbiError>
where
    C: Connector + ?Sized,
    S: AsRef<str>,
{
    if sqls.len() != row_sets.len() {
        return Err(DbiError::CountMismatch {
            statements: sqls.len(),
            arg_sets: row_sets.len(),
        });
    }
    let style = connector.placeholder_style();

    run_in_transaction(connector, &TxOptions::default(), |tx| {
        let mut statements = Vec::with_capacity(sqls.len());
        for sql in sqls {
            statements.push(tx.prepare(&translate_placeholders(sql.as_ref(), style))?);
        }

        for (set_idx, (stmt, rows)) in statements.iter().zip(row_sets).enumerate() {
            for (row_idx, row) in rows.iter().enumerate() {
                tx.execute(stmt, row)
                    .map_err(|source| DbiError::TransactionRow {
                        set: set_idx + 1,
                        row: row_idx + 1,
                        source: Box::new(source),
                    })?;
            }
        }
        Ok(())
    })
}
