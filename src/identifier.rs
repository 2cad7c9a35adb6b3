//! Pure string-escaping utilities used by [`crate::constructors::identifier`]
//! and [`crate::constructors::literal`].
//!
//! Trimmed from the teacher's `postrust-sql::identifier` module: the
//! qualified-identifier and reserved-word helpers there served the teacher's
//! unquoted/quoted split, which this crate doesn't have (every string part
//! of an `Identifier` fragment is always quoted, per the Identifier
//! invariant).

/// Double-quotes `name`, doubling any embedded double quotes.
pub fn escape_sql_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quotes `value`, doubling any embedded single quotes. Used by
/// `literal()`'s inline string fast path.
pub fn quote_sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
