//! Tag-driven unmarshaling of result rows into caller record types.
//!
//! Each record type carries `column[,option]...` metadata per field (see
//! [`crate::dbi_record!`]). When getting dates from the database, Postgres hands back a
//! full timestamp; the `date` option on a text field keeps only the `YYYY-MM-DD` part.

mod binding;
mod field;
pub(crate) mod macros;

pub use binding::{
    BindingTable, DATE_LEN, FieldBinding, FieldOptions, FieldSpec, Record, parse_tag,
    truncate_chars,
};
pub use field::FromRowValue;

use crate::backend::{Connector, RowSink, Transaction, TxOptions};
use crate::error::DbiError;
use crate::transaction::run_in_transaction;
use crate::translation::translate_placeholders;
use crate::types::RowValues;

/// Run `sql` and append one boxed `T` per result row to `target`.
///
/// Every bound column must appear in the query's result; that is checked once, before
/// the first row is read. Columns nobody binds are read and discarded. Rows already
/// appended stay in `target` if a later row fails, although the transaction is rolled
/// back.
///
/// # Errors
/// Returns `DbiError::DuplicateColumn` before touching the database if `T` claims a
/// column twice, `DbiError::MissingColumn` if the result lacks a bound column,
/// `DbiError::FieldConversion` if a value does not fit its field, or the driver error.
pub fn unmarshal<C, T>(
    connector: &C,
    options: &TxOptions,
    target: &mut Vec<Box<T>>,
    sql: &str,
    args: &[RowValues],
) -> Result<(), DbiError>
where
    C: Connector + ?Sized,
    T: Record,
{
    let table = T::binding_table()?;
    let sql = translate_placeholders(sql, connector.placeholder_style());

    run_in_transaction(connector, options, |tx| {
        let stmt = tx.prepare(&sql)?;
        let mut sink = RecordSink {
            table,
            slots: Vec::new(),
            target,
        };
        tx.query(&stmt, args, &mut sink)
    })
}

/// Where a result column goes.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Discard,
    Field(usize),
    Scratch(usize),
}

struct RecordSink<'a, T: Record> {
    table: &'static BindingTable<T>,
    slots: Vec<Slot>,
    target: &'a mut Vec<Box<T>>,
}

impl<T: Record> RowSink for RecordSink<'_, T> {
    fn columns(&mut self, columns: &[String]) -> Result<(), DbiError> {
        for binding in self.table.bindings() {
            if !columns.iter().any(|c| *c == binding.column) {
                return Err(DbiError::MissingColumn(binding.column.clone()));
            }
        }

        self.slots = columns
            .iter()
            .map(|column| match self.table.get(column) {
                Some((idx, binding)) if binding.options.agg => Slot::Scratch(idx),
                Some((idx, _)) => Slot::Field(idx),
                None => Slot::Discard,
            })
            .collect();
        Ok(())
    }

    fn row(&mut self, values: Vec<RowValues>) -> Result<(), DbiError> {
        let bindings = self.table.bindings();
        let mut record = T::default();
        let mut scratch = Vec::new();

        for (value, slot) in values.into_iter().zip(&self.slots) {
            match *slot {
                Slot::Field(idx) => bindings[idx].store(&mut record, value)?,
                Slot::Scratch(idx) => scratch.push((idx, value)),
                Slot::Discard => {}
            }
        }

        for binding in bindings.iter().filter(|b| b.options.date) {
            binding.truncate(&mut record);
        }
        for (idx, value) in scratch {
            let binding = &bindings[idx];
            binding.store(&mut record, value)?;
            binding.truncate(&mut record);
        }

        self.target.push(Box::new(record));
        Ok(())
    }
}
