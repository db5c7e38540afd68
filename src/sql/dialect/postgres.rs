//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features used by rendered plans:
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - `ILIKE` and the POSIX regex operators
//! - Array literals (`ARRAY[...]`) with `&&`, `@>`, `<@`, `ANY`, `ALL`

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...), ILIKE,
    // POSIX regex and array operators
}
