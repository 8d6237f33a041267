use crate::backend::{Connector, Transaction, TxOptions};
use crate::error::DbiError;
use crate::results::{RowMap, RowMapCollector, StringRowMap, stringify_rows};
use crate::transaction::run_in_transaction;
use crate::translation::translate_placeholders;
use crate::types::RowValues;

/// Run each statement with its argument list inside one transaction.
///
/// `args` may be shorter than `sqls`; missing entries run without arguments. One result
/// set per statement comes back, in input order. Any failure rolls back every statement
/// and no partial results are returned.
///
/// # Errors
/// Returns `DbiError` from begin/commit or from the first statement that fails.
pub fn multi_query<C, S>(
    connector: &C,
    sqls: &[S],
    args: &[Vec<RowValues>],
) -> Result<Vec<Vec<RowMap>>, DbiError>
where
    C: Connector + ?Sized,
    S: AsRef<str>,
{
    let style = connector.placeholder_style();
    let no_args: Vec<RowValues> = Vec::new();

    run_in_transaction(connector, &TxOptions::default(), |tx| {
        let mut results = Vec::with_capacity(sqls.len());
        for (idx, sql) in sqls.iter().enumerate() {
            let sql = translate_placeholders(sql.as_ref(), style);
            let params = args.get(idx).unwrap_or(&no_args);

            let stmt = tx.prepare(&sql)?;
            let mut collector = RowMapCollector::new();
            tx.query(&stmt, params, &mut collector)?;
            results.push(collector.into_rows());
        }
        Ok(results)
    })
}

/// Run a single statement and return its rows.
///
/// # Errors
/// Returns `DbiError` if the statement or the surrounding transaction fails.
pub fn query<C>(connector: &C, sql: &str, args: &[RowValues]) -> Result<Vec<RowMap>, DbiError>
where
    C: Connector + ?Sized,
{
    let mut sets = multi_query(connector, &[sql], &[args.to_vec()])?;
    Ok(sets.pop().unwrap_or_default())
}

/// Run a single statement and return its rows with every value rendered as text.
///
/// # Errors
/// Returns `DbiError` if the statement or the surrounding transaction fails.
pub fn query_string<C>(
    connector: &C,
    sql: &str,
    args: &[RowValues],
) -> Result<Vec<StringRowMap>, DbiError>
where
    C: Connector + ?Sized,
{
    query(connector, sql, args).map(stringify_rows)
}
