//! SQL identifier quoting utilities
//!
//! The bookkeeping schema name comes from user configuration, so every
//! statement that embeds it goes through these helpers.

/// Quote a SQL identifier to prevent injection.
///
/// Wraps the identifier in double quotes and escapes any embedded double quotes
/// by doubling them, following the SQL standard.
///
/// # Examples
/// ```
/// use rollcall_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("rollcall"), r#""rollcall""#);
/// assert_eq!(quote_ident(r#"my"schema"#), r#""my""schema""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Build a quoted `schema.table` reference.
///
/// # Examples
/// ```
/// use rollcall_core::sql_utils::qualified_table;
/// assert_eq!(qualified_table("rollcall", "run_lock"), r#""rollcall"."run_lock""#);
/// ```
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
