//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB), `` ` `` (MySQL)
//! - Boolean literals: true/false vs 1/0
//! - Case-insensitive pattern matching: native `ILIKE` vs `LOWER() LIKE LOWER()`
//! - Regex operators: `~` family vs `REGEXP`
//! - Array operators: `&&`, `@>`, `<@`, `ANY`, `ALL` (not on MySQL)
//!
//! # Usage
//!
//! ```
//! use quarry::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.quote_identifier("film"), "\"film\"");
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow PostgreSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Pattern Matching
    // =========================================================================

    /// Whether `ILIKE` is a native operator.
    ///
    /// Without it, case-insensitive matches lower both sides.
    fn supports_ilike(&self) -> bool {
        true
    }

    /// Operator text for a regular-expression match.
    fn regex_operator(&self, negated: bool, case_insensitive: bool) -> &'static str {
        helpers::regex_operator_posix(negated, case_insensitive)
    }

    /// Whether the regex operator has a case-insensitive spelling.
    ///
    /// Without it, case-insensitive matches lower both sides.
    fn supports_case_insensitive_regex(&self) -> bool {
        true
    }

    /// Whether regex matches render as `regexp_matches(value, pattern)`.
    ///
    /// Used where the `~` operator anchors the whole string.
    fn regex_as_function(&self) -> bool {
        false
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    /// Whether array literals and the `&&`/`@>`/`<@`/`ANY`/`ALL`
    /// operators are available.
    fn supports_array_operators(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn supports_ilike(&self) -> bool {
        self.dialect().supports_ilike()
    }

    fn regex_operator(&self, negated: bool, case_insensitive: bool) -> &'static str {
        self.dialect().regex_operator(negated, case_insensitive)
    }

    fn supports_case_insensitive_regex(&self) -> bool {
        self.dialect().supports_case_insensitive_regex()
    }

    fn regex_as_function(&self) -> bool {
        self.dialect().regex_as_function()
    }

    fn supports_array_operators(&self) -> bool {
        self.dialect().supports_array_operators()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "duckdb" => Ok(Dialect::DuckDb),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}
