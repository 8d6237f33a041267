use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::RowSink;
use crate::error::DbiError;
use crate::types::RowValues;

/// One result row keyed by column name.
pub type RowMap = HashMap<String, RowValues>;

/// One result row with every value rendered through [`RowValues::to_db_string`].
pub type StringRowMap = HashMap<String, String>;

/// Decodes a query's rows into [`RowMap`]s.
///
/// Each row gets its own map; nothing is shared between rows except the column names.
#[derive(Debug, Default)]
pub struct RowMapCollector {
    column_names: Arc<Vec<String>>,
    rows: Vec<RowMap>,
}

impl RowMapCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<RowMap> {
        self.rows
    }
}

impl RowSink for RowMapCollector {
    fn columns(&mut self, columns: &[String]) -> Result<(), DbiError> {
        self.column_names = Arc::new(columns.to_vec());
        Ok(())
    }

    fn row(&mut self, values: Vec<RowValues>) -> Result<(), DbiError> {
        if values.len() != self.column_names.len() {
            return Err(DbiError::ExecutionError(format!(
                "row has {} values for {} columns",
                values.len(),
                self.column_names.len()
            )));
        }
        let row: RowMap = self
            .column_names
            .iter()
            .cloned()
            .zip(values)
            .collect();
        self.rows.push(row);
        Ok(())
    }
}

/// Render every value of every row as text.
#[must_use]
pub fn stringify_rows(rows: Vec<RowMap>) -> Vec<StringRowMap> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(column, value)| (column, value.to_db_string()))
                .collect()
        })
        .collect()
}
