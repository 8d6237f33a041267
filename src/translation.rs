use std::borrow::Cow;
use std::fmt::Write;

/// Placeholder syntax a backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style ordinal placeholders like `$1`.
    Postgres,
    /// SQLite-style positional `?`, which is also the dialect-neutral marker.
    Sqlite,
}

impl PlaceholderStyle {
    /// Whether neutral `?` markers must be rewritten for this style.
    #[must_use]
    pub fn needs_translation(self) -> bool {
        matches!(self, PlaceholderStyle::Postgres)
    }
}

/// Rewrite every `?` marker into the ordinal syntax of `target`, left to right.
///
/// Returns a borrowed `Cow` when no changes are needed. Markers are replaced wherever
/// they appear, including inside quoted literals.
/// ```rust
/// use sql_dbi::prelude::*;
///
/// let sql = translate_placeholders("select * from t where a = ? and b = ?", PlaceholderStyle::Postgres);
/// assert_eq!(sql, "select * from t where a = $1 and b = $2");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    if !target.needs_translation() {
        return Cow::Borrowed(sql);
    }

    let mut out: Option<String> = None;
    let mut argno = 0usize;
    let mut last = 0;

    for (idx, _) in sql.match_indices('?') {
        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
        argno += 1;
        buf.push_str(&sql[last..idx]);
        // Writing into a String cannot fail.
        let _ = write!(buf, "${argno}");
        last = idx + 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[last..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}
