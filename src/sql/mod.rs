//! SQL generation module.
//!
//! A type-safe SQL builder that generates multi-dialect SQL:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`render`] - Query plan to statement text

pub mod dialect;
pub mod expr;
pub mod query;
pub mod render;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    count_star, func, lit_int, lit_str, star, table_col, BinaryOperator, Expr, ExprExt, Literal,
    Quantifier, UnaryOperator,
};
pub use query::{Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use render::{count_statement, PlanRenderer};
pub use token::{Token, TokenStream};
