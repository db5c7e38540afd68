//! MySQL SQL dialect.
//!
//! MySQL differences from PostgreSQL:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), returns 1/0
//! - Backslash escapes in string literals
//! - No ILIKE; `REGEXP` / `NOT REGEXP` instead of `~`
//! - No array type, so no array operators
//! - OFFSET requires a LIMIT

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_mysql(limit, offset)
    }

    fn supports_ilike(&self) -> bool {
        false
    }

    fn regex_operator(&self, negated: bool, case_insensitive: bool) -> &'static str {
        helpers::regex_operator_keyword(negated, case_insensitive)
    }

    fn supports_case_insensitive_regex(&self) -> bool {
        false
    }

    fn supports_array_operators(&self) -> bool {
        false
    }
}
