use deadpool_postgres::Object;
use futures_util::{TryStreamExt, pin_mut};
use tokio::runtime::Runtime;
use tokio_postgres::Statement;

use crate::backend::{RowSink, Transaction, TxOptions};
use crate::error::DbiError;
use crate::types::RowValues;

use super::params::Params;
use super::query::postgres_extract_value;

/// Transaction on a pooled Postgres connection.
///
/// The connection goes back to the pool when the handle drops; an unfinished
/// transaction is rolled back first.
pub struct PostgresTx<'c> {
    runtime: &'c Runtime,
    client: Object,
    finished: bool,
}

fn begin_sql(options: &TxOptions) -> String {
    let mut sql = String::from("BEGIN");
    if let Some(level) = options.isolation {
        sql.push_str(" ISOLATION LEVEL ");
        sql.push_str(level.as_sql());
    }
    if options.read_only {
        sql.push_str(" READ ONLY");
    }
    sql
}

impl<'c> PostgresTx<'c> {
    pub(crate) fn begin(
        runtime: &'c Runtime,
        client: Object,
        options: &TxOptions,
    ) -> Result<Self, DbiError> {
        runtime.block_on(client.batch_execute(&begin_sql(options)))?;
        Ok(Self {
            runtime,
            client,
            finished: false,
        })
    }

    fn finish(&mut self, sql: &str) -> Result<(), DbiError> {
        self.finished = true;
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }
}

impl Transaction for PostgresTx<'_> {
    type Statement = Statement;

    fn prepare(&mut self, sql: &str) -> Result<Statement, DbiError> {
        let stmt = self.runtime.block_on(self.client.prepare(sql))?;
        tracing::debug!(sql, "postgres statement prepared");
        Ok(stmt)
    }

    fn execute(&mut self, stmt: &Statement, params: &[RowValues]) -> Result<u64, DbiError> {
        let converted = Params::convert(params);
        let rows = self
            .runtime
            .block_on(self.client.execute(stmt, converted.as_refs()))?;
        Ok(rows)
    }

    fn query(
        &mut self,
        stmt: &Statement,
        params: &[RowValues],
        sink: &mut dyn RowSink,
    ) -> Result<(), DbiError> {
        let converted = Params::convert(params);
        let client = &self.client;

        self.runtime.block_on(async move {
            let stream = client
                .query_raw(stmt, converted.as_refs().iter().copied())
                .await?;
            pin_mut!(stream);

            let column_names: Vec<String> = stmt
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect();
            sink.columns(&column_names)?;

            while let Some(row) = stream.try_next().await? {
                let mut values = Vec::with_capacity(column_names.len());
                for idx in 0..column_names.len() {
                    values.push(postgres_extract_value(&row, idx)?);
                }
                sink.row(values)?;
            }
            Ok::<(), DbiError>(())
        })
    }

    fn commit(&mut self) -> Result<(), DbiError> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DbiError> {
        self.finish("ROLLBACK")
    }
}

impl Drop for PostgresTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.rollback();
        }
    }
}
