use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::DbiError;
use crate::types::RowValues;

/// Number of characters kept by the `date` and `agg` options.
pub const DATE_LEN: usize = 10;

/// Options parsed from the tokens after the column name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// Truncate a text field to its first [`DATE_LEN`] characters.
    pub date: bool,
    /// Capture the column into a scratch value first; text fields are truncated like `date`.
    pub agg: bool,
}

/// Field description emitted by [`crate::dbi_record!`], one per struct field.
pub struct FieldSpec<T> {
    pub field: &'static str,
    /// Raw `column[,option]...` metadata, `None` when the field carries none.
    pub tag: Option<&'static str>,
    pub store: fn(&mut T, RowValues) -> Result<(), String>,
    pub text: fn(&mut T) -> Option<&mut String>,
}

/// A bound field: which column feeds it and how.
pub struct FieldBinding<T> {
    pub field: &'static str,
    pub column: String,
    pub options: FieldOptions,
    store: fn(&mut T, RowValues) -> Result<(), String>,
    text: fn(&mut T) -> Option<&mut String>,
}

impl<T> FieldBinding<T> {
    /// Convert `value` into the field of `record`.
    ///
    /// # Errors
    /// Returns `DbiError::FieldConversion` if the value does not fit the field type.
    pub fn store(&self, record: &mut T, value: RowValues) -> Result<(), DbiError> {
        (self.store)(record, value).map_err(|reason| DbiError::FieldConversion {
            column: self.column.clone(),
            field: self.field,
            reason,
        })
    }

    /// Apply the `date`/`agg` truncation; non-text fields are left alone.
    pub fn truncate(&self, record: &mut T) {
        if let Some(text) = (self.text)(record) {
            truncate_chars(text, DATE_LEN);
        }
    }
}

/// Keep at most `max` characters of `text`.
pub fn truncate_chars(text: &mut String, max: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
}

/// Split `column[,option]...` into a column name and its options.
///
/// Returns `None` when the column token is empty (the field is not bound). Unknown
/// options are ignored.
#[must_use]
pub fn parse_tag(tag: &str) -> Option<(&str, FieldOptions)> {
    let mut tokens = tag.split(',');
    let column = tokens.next().unwrap_or_default();
    if column.is_empty() {
        return None;
    }
    let mut options = FieldOptions::default();
    for token in tokens {
        match token {
            "date" => options.date = true,
            "agg" => options.agg = true,
            _ => {}
        }
    }
    Some((column, options))
}

/// The column-to-field bindings of one record type.
pub struct BindingTable<T> {
    bindings: Vec<FieldBinding<T>>,
}

impl<T> BindingTable<T> {
    /// Build a table from field specs, in field declaration order.
    ///
    /// # Errors
    /// Returns `DbiError::DuplicateColumn` if two fields claim the same column.
    pub fn build(specs: Vec<FieldSpec<T>>) -> Result<Self, DbiError> {
        let mut seen = HashSet::new();
        let mut bindings = Vec::new();
        for spec in specs {
            let Some((column, options)) = spec.tag.and_then(parse_tag) else {
                continue;
            };
            if !seen.insert(column.to_string()) {
                return Err(DbiError::DuplicateColumn(column.to_string()));
            }
            bindings.push(FieldBinding {
                field: spec.field,
                column: column.to_string(),
                options,
                store: spec.store,
                text: spec.text,
            });
        }
        Ok(Self { bindings })
    }

    /// Build once per record type and keep the outcome, failure included, in `cell`.
    ///
    /// # Errors
    /// Returns `DbiError::DuplicateColumn` if two fields claim the same column.
    pub fn cached(
        cell: &'static OnceLock<Result<Self, String>>,
        specs: fn() -> Vec<FieldSpec<T>>,
    ) -> Result<&'static Self, DbiError> {
        let built = cell.get_or_init(|| {
            Self::build(specs()).map_err(|err| match err {
                DbiError::DuplicateColumn(column) => column,
                other => other.to_string(),
            })
        });
        built
            .as_ref()
            .map_err(|column| DbiError::DuplicateColumn(column.clone()))
    }

    #[must_use]
    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<(usize, &FieldBinding<T>)> {
        self.bindings
            .iter()
            .enumerate()
            .find(|(_, binding)| binding.column == column)
    }
}

/// A record type that rows can be unmarshaled into.
///
/// Implemented by [`crate::dbi_record!`]; a hand-written impl only has to return a
/// cached [`BindingTable`].
pub trait Record: Default + Sized + 'static {
    /// # Errors
    /// Returns `DbiError::DuplicateColumn` if the type's metadata claims a column twice.
    fn binding_table() -> Result<&'static BindingTable<Self>, DbiError>;
}
