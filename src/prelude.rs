//! Convenient imports for common functionality.

pub use crate::backend::{Connector, IsolationLevel, Transaction, TxOptions};
pub use crate::config::{DbConfig, SslMode};
pub use crate::database::Database;
pub use crate::dbi_record;
pub use crate::error::DbiError;
pub use crate::results::{RowMap, StringRowMap};
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::types::{DatabaseType, RowValues};
pub use crate::unmarshal::{FromRowValue, Record};
