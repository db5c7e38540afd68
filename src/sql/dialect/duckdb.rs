//! DuckDB SQL dialect.
//!
//! Close to PostgreSQL: ANSI identifier quoting, `ILIKE`, and
//! `ARRAY[...]` literals with list operators. DuckDB's `~` is a full-string
//! match and has no `~*`, so regex filters go through `regexp_matches`
//! with the `'i'` option for case-insensitive matches.

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn regex_as_function(&self) -> bool {
        true
    }
}
